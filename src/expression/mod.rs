//! Aggregate and window function evaluation
//!
//! [`AggregateSpec`] drives the accumulation protocol. Each function family
//! lives in its own module and works on its own [`Accumulator`] variant.

pub mod accumulator;
pub mod aggregate;
pub mod distinct;
pub mod expression;
pub mod function;
pub mod numeric;
pub mod offset_functions;
pub mod statistics;
pub mod window;
pub mod window_functions;

pub use accumulator::*;
pub use aggregate::*;
pub use expression::*;
pub use function::*;
pub use window::*;
