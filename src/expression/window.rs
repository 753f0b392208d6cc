//! Window specifications
//!
//! The OVER clause attached to an aggregate: partition keys, order keys and
//! an optional frame. Partitioning and ordering rows is the window driver's
//! job; this module only describes, validates and renders the clause.

use crate::common::error::{PrismAggError, PrismAggResult};
use crate::expression::expression::ExpressionRef;
use std::fmt;

/// Placement of NULL and MISSING keys in an ORDER BY term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsPosition {
    First,
    Last,
}

/// ORDER BY term
#[derive(Debug, Clone)]
pub struct OrderTerm {
    pub expression: ExpressionRef,
    pub descending: bool,
    pub nulls: Option<NullsPosition>,
}

impl OrderTerm {
    pub fn ascending(expression: ExpressionRef) -> Self {
        Self {
            expression,
            descending: false,
            nulls: None,
        }
    }

    pub fn descending(expression: ExpressionRef) -> Self {
        Self {
            expression,
            descending: true,
            nulls: None,
        }
    }

    pub fn with_nulls(mut self, nulls: NullsPosition) -> Self {
        self.nulls = Some(nulls);
        self
    }
}

impl fmt::Display for OrderTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression.render())?;
        if self.descending {
            write!(f, " DESC")?;
        }
        match self.nulls {
            Some(NullsPosition::First) => write!(f, " NULLS FIRST"),
            Some(NullsPosition::Last) => write!(f, " NULLS LAST"),
            None => Ok(()),
        }
    }
}

/// Window frame units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFrameUnits {
    Rows,
    Range,
    Groups,
}

/// Window frame bound
#[derive(Debug, Clone)]
pub enum WindowFrameBound {
    UnboundedPreceding,
    Preceding(ExpressionRef),
    CurrentRow,
    Following(ExpressionRef),
    UnboundedFollowing,
}

impl WindowFrameBound {
    fn value_expression(&self) -> Option<&ExpressionRef> {
        match self {
            WindowFrameBound::Preceding(expr) | WindowFrameBound::Following(expr) => Some(expr),
            _ => None,
        }
    }

    fn is_preceding(&self) -> bool {
        matches!(
            self,
            WindowFrameBound::UnboundedPreceding | WindowFrameBound::Preceding(_)
        )
    }

    fn is_following(&self) -> bool {
        matches!(
            self,
            WindowFrameBound::UnboundedFollowing | WindowFrameBound::Following(_)
        )
    }
}

impl fmt::Display for WindowFrameBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowFrameBound::UnboundedPreceding => write!(f, "UNBOUNDED PRECEDING"),
            WindowFrameBound::Preceding(expr) => write!(f, "{} PRECEDING", expr.render()),
            WindowFrameBound::CurrentRow => write!(f, "CURRENT ROW"),
            WindowFrameBound::Following(expr) => write!(f, "{} FOLLOWING", expr.render()),
            WindowFrameBound::UnboundedFollowing => write!(f, "UNBOUNDED FOLLOWING"),
        }
    }
}

/// EXCLUDE clause of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameExclusion {
    #[default]
    NoOthers,
    CurrentRow,
    Group,
    Ties,
}

/// Window frame specification
#[derive(Debug, Clone)]
pub struct WindowFrame {
    pub units: WindowFrameUnits,
    pub start: WindowFrameBound,
    /// Present for `BETWEEN start AND end`
    pub end: Option<WindowFrameBound>,
    pub exclude: FrameExclusion,
}

impl WindowFrame {
    pub fn new(units: WindowFrameUnits, start: WindowFrameBound) -> Self {
        Self {
            units,
            start,
            end: None,
            exclude: FrameExclusion::NoOthers,
        }
    }

    pub fn between(units: WindowFrameUnits, start: WindowFrameBound, end: WindowFrameBound) -> Self {
        Self {
            units,
            start,
            end: Some(end),
            exclude: FrameExclusion::NoOthers,
        }
    }

    pub fn with_exclude(mut self, exclude: FrameExclusion) -> Self {
        self.exclude = exclude;
        self
    }

    /// Check the frame extents for `function`, given the number of ORDER BY terms
    pub fn validate(&self, function: &str, order_terms: usize) -> PrismAggResult<()> {
        let invalid = || PrismAggError::semantic(function, "invalid window frame.");

        match &self.end {
            Some(end) => {
                if matches!(self.start, WindowFrameBound::UnboundedFollowing)
                    || matches!(end, WindowFrameBound::UnboundedPreceding)
                {
                    return Err(invalid());
                }
                // value PRECEDING ends need a preceding start, value FOLLOWING starts a following end
                if (matches!(end, WindowFrameBound::Preceding(_)) && !self.start.is_preceding())
                    || (matches!(self.start, WindowFrameBound::Following(_)) && !end.is_following())
                {
                    return Err(invalid());
                }
            }
            None => {
                if self.start.is_following() {
                    return Err(invalid());
                }
            }
        }

        let bounds = std::iter::once(&self.start).chain(self.end.iter());
        for bound in bounds {
            if let Some(expr) = bound.value_expression() {
                let valid = match expr.static_value() {
                    Some(value) => match value.as_f64() {
                        Some(v) => {
                            v >= 0.0 && (self.units == WindowFrameUnits::Range || v.fract() == 0.0)
                        }
                        None => false,
                    },
                    None => false,
                };
                if !valid {
                    return Err(PrismAggError::semantic(
                        function,
                        "window frame value expression is invalid.",
                    ));
                }
            }
        }

        if order_terms > 1 && self.units == WindowFrameUnits::Range {
            let start_ok = matches!(
                self.start,
                WindowFrameBound::UnboundedPreceding | WindowFrameBound::CurrentRow
            );
            let end_ok = match &self.end {
                Some(end) => matches!(
                    end,
                    WindowFrameBound::CurrentRow | WindowFrameBound::UnboundedFollowing
                ),
                None => true,
            };
            if !(start_ok && end_ok) {
                return Err(PrismAggError::semantic(
                    function,
                    "multiple ORDER BY terms are not allowed.",
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for WindowFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = match self.units {
            WindowFrameUnits::Rows => "ROWS",
            WindowFrameUnits::Range => "RANGE",
            WindowFrameUnits::Groups => "GROUPS",
        };
        match &self.end {
            Some(end) => write!(f, " {} BETWEEN {} AND {}", units, self.start, end)?,
            None => write!(f, " {} {}", units, self.start)?,
        }
        match self.exclude {
            FrameExclusion::CurrentRow => write!(f, " EXCLUDE CURRENT ROW"),
            FrameExclusion::Group => write!(f, " EXCLUDE GROUP"),
            FrameExclusion::Ties => write!(f, " EXCLUDE TIES"),
            FrameExclusion::NoOthers => Ok(()),
        }
    }
}

/// OVER clause
#[derive(Debug, Clone, Default)]
pub struct WindowSpec {
    partition_by: Vec<ExpressionRef>,
    order_by: Vec<OrderTerm>,
    frame: Option<WindowFrame>,
}

impl WindowSpec {
    /// Static and repeated PARTITION BY expressions are dropped; they cannot split a partition
    pub fn new(
        partition_by: Vec<ExpressionRef>,
        order_by: Vec<OrderTerm>,
        frame: Option<WindowFrame>,
    ) -> Self {
        let mut kept: Vec<ExpressionRef> = Vec::with_capacity(partition_by.len());
        for expr in partition_by {
            if expr.static_value().is_some() {
                continue;
            }
            if kept.iter().any(|k| k.equivalent_to(expr.as_ref())) {
                continue;
            }
            kept.push(expr);
        }
        Self {
            partition_by: kept,
            order_by,
            frame,
        }
    }

    pub fn partition_by(&self) -> &[ExpressionRef] {
        &self.partition_by
    }

    pub fn order_by(&self) -> &[OrderTerm] {
        &self.order_by
    }

    pub fn frame(&self) -> Option<&WindowFrame> {
        self.frame.as_ref()
    }

    pub fn has_order(&self) -> bool {
        !self.order_by.is_empty()
    }
}

impl fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " OVER (")?;
        if !self.partition_by.is_empty() {
            // PARTITION BY order has no effect; sort so equal windows render alike
            let mut names: Vec<String> = self.partition_by.iter().map(|e| e.render()).collect();
            names.sort();
            write!(f, "PARTITION BY {}", names.join(", "))?;
        }
        if !self.order_by.is_empty() {
            if !self.partition_by.is_empty() {
                write!(f, " ")?;
            }
            let terms: Vec<String> = self.order_by.iter().map(|t| t.to_string()).collect();
            write!(f, "ORDER BY {}", terms.join(", "))?;
        }
        if let Some(frame) = &self.frame {
            write!(f, "{}", frame)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::expression::{ConstantExpression, FieldExpression};
    use std::sync::Arc;

    fn field(path: &str) -> ExpressionRef {
        Arc::new(FieldExpression::new(path))
    }

    fn constant(v: f64) -> ExpressionRef {
        Arc::new(ConstantExpression::new(v))
    }

    #[test]
    fn test_partition_by_cleanup_and_rendering() {
        let spec = WindowSpec::new(
            vec![field("region"), constant(1.0), field("city"), field("region")],
            vec![OrderTerm::descending(field("sales")).with_nulls(NullsPosition::Last)],
            Some(WindowFrame::between(
                WindowFrameUnits::Rows,
                WindowFrameBound::UnboundedPreceding,
                WindowFrameBound::CurrentRow,
            )),
        );
        assert_eq!(spec.partition_by().len(), 2);
        assert_eq!(
            spec.to_string(),
            " OVER (PARTITION BY city, region ORDER BY sales DESC NULLS LAST \
             ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
        );
    }

    #[test]
    fn test_frame_rendering_with_exclusion() {
        let frame = WindowFrame::new(WindowFrameUnits::Groups, WindowFrameBound::Preceding(constant(2.0)))
            .with_exclude(FrameExclusion::Ties);
        assert_eq!(frame.to_string(), " GROUPS 2 PRECEDING EXCLUDE TIES");
        assert_eq!(WindowSpec::default().to_string(), " OVER ()");
    }

    #[test]
    fn test_frame_validation() {
        let bad_start = WindowFrame::between(
            WindowFrameUnits::Rows,
            WindowFrameBound::UnboundedFollowing,
            WindowFrameBound::CurrentRow,
        );
        assert!(bad_start.validate("sum", 1).is_err());

        let current_row_only = WindowFrame::new(WindowFrameUnits::Rows, WindowFrameBound::CurrentRow);
        assert!(current_row_only.validate("sum", 1).is_ok());

        let crossed = WindowFrame::between(
            WindowFrameUnits::Rows,
            WindowFrameBound::CurrentRow,
            WindowFrameBound::Preceding(constant(1.0)),
        );
        assert!(crossed.validate("sum", 1).is_err());

        let fractional_rows = WindowFrame::new(
            WindowFrameUnits::Rows,
            WindowFrameBound::Preceding(constant(1.5)),
        );
        assert!(fractional_rows.validate("sum", 1).is_err());
        let fractional_range = WindowFrame::new(
            WindowFrameUnits::Range,
            WindowFrameBound::Preceding(constant(1.5)),
        );
        assert!(fractional_range.validate("sum", 1).is_ok());
        assert!(fractional_range.validate("sum", 2).is_err());

        let dynamic = WindowFrame::new(WindowFrameUnits::Rows, WindowFrameBound::Preceding(field("n")));
        assert!(dynamic.validate("sum", 1).is_err());
    }
}
