//! prism-agg - aggregate and window function evaluation
//!
//! The accumulation protocol behind GROUP BY aggregates and window functions
//! of a document query engine. Rows are JSON-like [`Value`]s; an
//! [`AggregateSpec`] describes one call and threads an [`Accumulator`]
//! through `default`, `cumulate_initial`, `cumulate_intermediate` and
//! `compute_final`, with `cumulate_remove` and `is_cumulate_done` for
//! sliding frames and early termination.
//!
pub mod common;
pub mod execution;
pub mod expression;
pub mod types;

// Re-export common types for convenience
pub use common::{AggregateConfig, ErrorKind, PrismAggError, PrismAggResult};

// Re-export type system for convenience
pub use types::{BoundedOrderedList, DistinctSet, Item, ScanDirection, Value, ValueType, WindowRowFact};

// Re-export expression system for convenience
pub use expression::{
    aggregate_has_property, Accumulator, AggregateKind, AggregateModifiers, AggregateProperties,
    AggregateSpec, ComparisonExpression, ComparisonType, ConstantExpression, Expression,
    ExpressionRef, FieldExpression, FrameExclusion, NullsPosition, OrderTerm, SourcePosition,
    WindowFrame, WindowFrameBound, WindowFrameUnits, WindowSpec,
};

// Re-export execution for convenience
pub use execution::{Context, EvaluationContext, Morsel, MorselGenerator, ParallelAggregator};
