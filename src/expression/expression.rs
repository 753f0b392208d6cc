//! Operand expressions consumed by aggregates
//!
//! Aggregates only need to evaluate their operands against a row, render them
//! for plan text and compare them structurally. The stock expressions here
//! cover constants, document paths and comparisons (FILTER predicates).

use crate::common::error::{PrismAggError, PrismAggResult};
use crate::execution::context::Context;
use crate::types::{Item, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Expression reference type
pub type ExpressionRef = Arc<dyn Expression>;

/// Expression trait that all operand expressions must implement
pub trait Expression: fmt::Debug + Send + Sync {
    /// Evaluate this expression on a single row
    fn evaluate(&self, item: &Item, context: &dyn Context) -> PrismAggResult<Value>;

    /// Canonical text of this expression
    fn render(&self) -> String;

    /// Structural equivalence
    fn equivalent_to(&self, other: &dyn Expression) -> bool {
        self.render() == other.render()
    }

    /// The value of this expression when it does not depend on the row
    fn static_value(&self) -> Option<Value> {
        None
    }

    /// Source position text appended to error messages, e.g. " (near line 1, column 8)"
    fn error_context(&self) -> String {
        String::new()
    }
}

/// Position of an expression in statement text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    fn error_context(position: Option<SourcePosition>) -> String {
        match position {
            Some(p) => format!(" (near line {}, column {})", p.line, p.column),
            None => String::new(),
        }
    }
}

/// Constant value expression
#[derive(Debug, Clone)]
pub struct ConstantExpression {
    value: Value,
    position: Option<SourcePosition>,
}

impl ConstantExpression {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Expression for ConstantExpression {
    fn evaluate(&self, _item: &Item, _context: &dyn Context) -> PrismAggResult<Value> {
        Ok(self.value.clone())
    }

    fn render(&self) -> String {
        self.value.to_string()
    }

    fn static_value(&self) -> Option<Value> {
        Some(self.value.clone())
    }

    fn error_context(&self) -> String {
        SourcePosition::error_context(self.position)
    }
}

/// Dotted field path into the row document, e.g. `order.total`
#[derive(Debug, Clone)]
pub struct FieldExpression {
    path: Vec<String>,
    position: Option<SourcePosition>,
}

impl FieldExpression {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }
}

impl Expression for FieldExpression {
    fn evaluate(&self, item: &Item, _context: &dyn Context) -> PrismAggResult<Value> {
        let mut current = item.value().clone();
        for name in &self.path {
            if name.is_empty() {
                return Err(PrismAggError::Evaluation(format!(
                    "empty path segment in `{}`{}",
                    self.render(),
                    self.error_context()
                )));
            }
            current = current.field(name);
            if current.is_missing() {
                break;
            }
        }
        Ok(current)
    }

    fn render(&self) -> String {
        self.path.join(".")
    }

    fn error_context(&self) -> String {
        SourcePosition::error_context(self.position)
    }
}

/// Comparison type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonType {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonType {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonType::Equal => ordering == Ordering::Equal,
            ComparisonType::NotEqual => ordering != Ordering::Equal,
            ComparisonType::LessThan => ordering == Ordering::Less,
            ComparisonType::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonType::GreaterThan => ordering == Ordering::Greater,
            ComparisonType::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonType::Equal => write!(f, "="),
            ComparisonType::NotEqual => write!(f, "!="),
            ComparisonType::LessThan => write!(f, "<"),
            ComparisonType::LessThanOrEqual => write!(f, "<="),
            ComparisonType::GreaterThan => write!(f, ">"),
            ComparisonType::GreaterThanOrEqual => write!(f, ">="),
        }
    }
}

/// Comparison expression; NULL when either side is NULL or MISSING
#[derive(Debug, Clone)]
pub struct ComparisonExpression {
    left: ExpressionRef,
    right: ExpressionRef,
    comparison_type: ComparisonType,
}

impl ComparisonExpression {
    pub fn new(comparison_type: ComparisonType, left: ExpressionRef, right: ExpressionRef) -> Self {
        Self {
            left,
            right,
            comparison_type,
        }
    }

    pub fn comparison_type(&self) -> ComparisonType {
        self.comparison_type
    }

    pub fn left(&self) -> &dyn Expression {
        self.left.as_ref()
    }

    pub fn right(&self) -> &dyn Expression {
        self.right.as_ref()
    }
}

impl Expression for ComparisonExpression {
    fn evaluate(&self, item: &Item, context: &dyn Context) -> PrismAggResult<Value> {
        let left = self.left.evaluate(item, context)?;
        let right = self.right.evaluate(item, context)?;
        if left.is_unknown() || right.is_unknown() {
            return Ok(Value::Null);
        }
        Ok(Value::Boolean(
            self.comparison_type.accepts(context.collate(&left, &right)),
        ))
    }

    fn render(&self) -> String {
        format!(
            "({} {} {})",
            self.left.render(),
            self.comparison_type,
            self.right.render()
        )
    }

    fn static_value(&self) -> Option<Value> {
        let left = self.left.static_value()?;
        let right = self.right.static_value()?;
        if left.is_unknown() || right.is_unknown() {
            return Some(Value::Null);
        }
        Some(Value::Boolean(
            self.comparison_type.accepts(left.collate(&right)),
        ))
    }
}
