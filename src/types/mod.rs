//! Type system for the aggregate engine
//!
//! Document values with their collation order, the rows fed to aggregates,
//! and the containers accumulators keep their state in.

pub mod item;
pub mod list;
pub mod set;
pub mod value;

pub use item::{Item, WindowRowFact};
pub use list::{BoundedOrderedList, ScanDirection};
pub use set::DistinctSet;
pub use value::{Value, ValueType};
