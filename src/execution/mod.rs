//! Execution support for aggregate evaluation
//!
//! The evaluation context handed to every protocol call, and the
//! morsel-parallel driver for regular aggregates.

pub mod context;
pub mod parallel;

pub use context::*;
pub use parallel::*;
