//! Aggregate specifications and the accumulation protocol
//!
//! An [`AggregateSpec`] is the immutable description of one call such as
//! `SUM(DISTINCT price) FILTER (WHERE qty > 0)`. A row-source driver threads
//! an [`Accumulator`] through its phases:
//!
//! - `default` creates the state of an empty group or partition
//! - `cumulate_initial` folds one row in
//! - `cumulate_intermediate` merges two partials, in any order or tree shape
//! - `compute_final` turns the converged state into the result
//! - `cumulate_remove` retracts a row (incremental functions only)
//! - `is_cumulate_done` reports early completion (offset-access functions only)

use crate::common::error::{PrismAggError, PrismAggResult};
use crate::execution::context::Context;
use crate::expression::accumulator::{Accumulator, NtileState, RankState};
use crate::expression::statistics::Dispersion;
use crate::expression::expression::{Expression, ExpressionRef};
use crate::expression::function::{AggregateKind, AggregateProperties};
use crate::expression::window::WindowSpec;
use crate::expression::{distinct, numeric, offset_functions, statistics, window_functions};
use crate::internal_err;
use crate::types::{Item, Value};
use bitflags::bitflags;
use std::cmp::Ordering;
use std::fmt;

bitflags! {
    /// Modifiers written with an aggregate call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AggregateModifiers: u32 {
        const DISTINCT = 1 << 0;
        /// Frames may retract rows through `cumulate_remove`
        const INCREMENTAL = 1 << 1;
        const RESPECT_NULLS = 1 << 2;
        const IGNORE_NULLS = 1 << 3;
        const FROM_FIRST = 1 << 4;
        const FROM_LAST = 1 << 5;
    }
}

/// One aggregate or window function call
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    name: String,
    kind: AggregateKind,
    operands: Vec<ExpressionRef>,
    modifiers: AggregateModifiers,
    filter: Option<ExpressionRef>,
    window: Option<WindowSpec>,
}

impl AggregateSpec {
    /// Resolve `name` and check the operand count
    pub fn new(name: &str, operands: Vec<ExpressionRef>) -> PrismAggResult<Self> {
        let kind = AggregateKind::from_name(name)?;
        kind.check_arguments(name, operands.len())?;
        Ok(Self {
            name: name.to_uppercase(),
            kind,
            operands,
            modifiers: AggregateModifiers::empty(),
            filter: None,
            window: None,
        })
    }

    pub fn with_modifiers(mut self, modifiers: AggregateModifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn with_filter(mut self, filter: ExpressionRef) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_window(mut self, window: WindowSpec) -> Self {
        self.window = Some(window);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    pub fn operands(&self) -> &[ExpressionRef] {
        &self.operands
    }

    pub fn modifiers(&self) -> AggregateModifiers {
        self.modifiers
    }

    /// True when any of `modifiers` is set
    pub fn has_modifiers(&self, modifiers: AggregateModifiers) -> bool {
        self.modifiers.intersects(modifiers)
    }

    pub fn filter(&self) -> Option<&ExpressionRef> {
        self.filter.as_ref()
    }

    pub fn window(&self) -> Option<&WindowSpec> {
        self.window.as_ref()
    }

    pub fn is_window(&self) -> bool {
        self.window.is_some()
    }

    pub fn has_property(&self, properties: AggregateProperties) -> bool {
        self.kind.has_property(properties)
    }

    /// DISTINCT as evaluated. MIN and MAX keep the modifier for rendering but
    /// duplicates cannot move an extremum, so they ignore it.
    fn is_distinct(&self) -> bool {
        self.has_modifiers(AggregateModifiers::DISTINCT)
            && !matches!(self.kind, AggregateKind::Min | AggregateKind::Max)
    }

    /// Reject clause combinations the function does not support
    pub fn validate(&self) -> PrismAggResult<()> {
        use AggregateModifiers as M;
        use AggregateProperties as P;
        let semantic = |message: &str| Err(PrismAggError::semantic(&self.name, message));

        if self.has_modifiers(M::DISTINCT) {
            if !self.has_property(P::ALLOWS_DISTINCT) {
                return semantic("DISTINCT is not allowed.");
            }
            if self.operands.is_empty() {
                return semantic("DISTINCT requires an argument.");
            }
        }
        if self.has_modifiers(M::RESPECT_NULLS | M::IGNORE_NULLS) {
            if !self.has_property(P::NULLS_CLAUSE) {
                return semantic("NULLS clause is not allowed.");
            }
            if self.modifiers.contains(M::RESPECT_NULLS | M::IGNORE_NULLS) {
                return semantic("RESPECT NULLS and IGNORE NULLS cannot be combined.");
            }
        }
        if self.has_modifiers(M::FROM_FIRST | M::FROM_LAST) {
            if !self.has_property(P::FROM_CLAUSE) {
                return semantic("FROM clause is not allowed.");
            }
            if self.modifiers.contains(M::FROM_FIRST | M::FROM_LAST) {
                return semantic("FROM FIRST and FROM LAST cannot be combined.");
            }
        }
        if self.filter.is_some() && !self.has_property(P::ALLOWS_FILTER) {
            return semantic("FILTER clause is not allowed.");
        }
        if self.has_modifiers(M::INCREMENTAL) && !self.has_property(P::ALLOWS_INCREMENTAL) {
            return semantic("incremental evaluation is not supported.");
        }

        let window = match &self.window {
            Some(window) => window,
            None if self.has_property(P::ALLOWS_REGULAR) => return Ok(()),
            None => return semantic("requires an OVER clause."),
        };
        if !self.has_property(P::ALLOWS_WINDOW) {
            return semantic("OVER clause is not allowed.");
        }

        if self.has_property(P::WINDOW_2ND_POSINT) && self.operands.len() > 1 {
            let second = &self.operands[1];
            let valid = match second.static_value() {
                Some(value) => value.as_positive_integer().is_some(),
                None => self.has_property(P::WINDOW_2ND_DYNAMIC),
            };
            if !valid {
                return semantic("second value must be positive non zero integer.");
            }
        }

        if window.has_order() && self.has_property(P::WINDOW_NOORDER) {
            return semantic("ORDER BY clause is not allowed.");
        }
        let frame = match window.frame() {
            Some(frame) if window.has_order() => frame,
            Some(_) => return semantic("window frame is not allowed without ORDER BY."),
            None if !window.has_order() && self.has_property(P::WINDOW_ORDER) => {
                return semantic("ORDER BY clause is required.")
            }
            None => return Ok(()),
        };
        if !self.has_property(P::ALLOWS_WINDOW_FRAME) {
            return semantic("window frame is not allowed.");
        }
        frame.validate(&self.name, window.order_by().len())
    }

    /// Same function, modifiers, filter, operands (in order) and window
    pub fn equivalent_to(&self, other: &AggregateSpec) -> bool {
        if self.name != other.name || self.modifiers != other.modifiers {
            return false;
        }
        let filters_match = match (&self.filter, &other.filter) {
            (None, None) => true,
            (Some(left), Some(right)) => left.equivalent_to(right.as_ref()),
            _ => false,
        };
        let windows_match = match (&self.window, &other.window) {
            (None, None) => true,
            (Some(left), Some(right)) => left.to_string() == right.to_string(),
            _ => false,
        };
        filters_match
            && windows_match
            && self.operands.len() == other.operands.len()
            && self
                .operands
                .iter()
                .zip(other.operands.iter())
                .all(|(left, right)| left.equivalent_to(right.as_ref()))
    }

    fn operand(&self, item: &Item, context: &dyn Context) -> PrismAggResult<Value> {
        match self.operands.first() {
            Some(expr) => expr.evaluate(item, context),
            None => Err(internal_err!("{}() has no operand", self.name)),
        }
    }

    /// Operand values the fold ignores: NULL and MISSING, plus non-numbers
    /// for numeric functions
    fn skips(&self, value: &Value) -> bool {
        value.is_unknown() || (self.kind.is_numeric() && !value.is_number())
    }

    /// A FILTER predicate that is false, unknown or fails to evaluate skips the row
    fn passes_filter(&self, item: &Item, context: &dyn Context) -> bool {
        match &self.filter {
            None => true,
            Some(filter) => matches!(filter.evaluate(item, context), Ok(v) if v.truth()),
        }
    }

    /// State of a group or partition that has seen no rows
    pub fn default(&self, item: &Item, context: &dyn Context) -> PrismAggResult<Accumulator> {
        use AggregateKind as K;
        let config = context.config();
        let distinct = self.is_distinct();
        let acc = match self.kind {
            K::Count | K::CountN if distinct => {
                distinct::empty_set(config.distinct_set_capacity, self.kind == K::CountN)
            }
            K::Count | K::CountN => Accumulator::Scalar(Value::Integer(0)),
            K::Sum | K::Avg if distinct => distinct::empty_set(config.distinct_set_capacity, true),
            K::Sum | K::Avg => numeric::empty_running(),
            K::Min | K::Max | K::RatioToReport => Accumulator::Scalar(Value::Null),
            K::ArrayAgg if distinct => distinct::empty_set(config.distinct_set_capacity, false),
            K::ArrayAgg => Accumulator::Collected(Vec::with_capacity(config.list_capacity)),
            K::StddevPop | K::StddevSamp | K::VarPop | K::VarSamp if distinct => {
                statistics::empty_distinct_samples(config.distinct_set_capacity)
            }
            K::StddevPop | K::StddevSamp | K::VarPop | K::VarSamp => {
                statistics::empty_samples(config.list_capacity)
            }
            K::Median if distinct => distinct::empty_set(config.distinct_set_capacity, true),
            K::Median => statistics::empty_samples(config.list_capacity),
            K::RowNumber | K::Rank | K::DenseRank | K::PercentRank | K::CumeDist => {
                Accumulator::Rank(RankState::new())
            }
            K::Ntile => Accumulator::Ntile(NtileState::new()),
            K::Lag | K::Lead | K::FirstValue | K::LastValue | K::NthValue => {
                offset_functions::offset_default(self, item, context)?
            }
        };
        Ok(acc)
    }

    /// Fold one row into `acc`
    pub fn cumulate_initial(
        &self,
        item: &Item,
        acc: Accumulator,
        context: &dyn Context,
    ) -> PrismAggResult<Accumulator> {
        use AggregateKind as K;
        if !self.passes_filter(item, context) {
            return Ok(acc);
        }
        let name = self.name.as_str();
        let distinct = self.is_distinct();

        match self.kind {
            K::Count if self.operands.is_empty() => numeric::count_add(name, acc, 1),
            K::Count | K::CountN => {
                let value = self.operand(item, context)?;
                let counted = !self.skips(&value);
                match (counted, distinct) {
                    (false, _) => Ok(acc),
                    (true, true) => distinct::set_add(acc, value),
                    (true, false) => numeric::count_add(name, acc, 1),
                }
            }
            K::Sum | K::Avg => {
                let value = self.operand(item, context)?;
                if self.skips(&value) {
                    return Ok(acc);
                }
                if distinct {
                    distinct::set_add(acc, value)
                } else {
                    numeric::running_add(name, acc, &value)
                }
            }
            K::Min => {
                let value = self.operand(item, context)?;
                numeric::extremum_add(name, acc, value, Ordering::Less, context)
            }
            K::Max => {
                let value = self.operand(item, context)?;
                numeric::extremum_add(name, acc, value, Ordering::Greater, context)
            }
            K::ArrayAgg => {
                let value = self.operand(item, context)?;
                if value.is_missing() {
                    return Ok(acc);
                }
                if distinct {
                    distinct::set_add(acc, value)
                } else {
                    numeric::collect_add(name, acc, value)
                }
            }
            K::StddevPop | K::StddevSamp | K::VarPop | K::VarSamp => {
                let value = self.operand(item, context)?;
                if self.skips(&value) {
                    return Ok(acc);
                }
                statistics::sample_add(name, acc, value)
            }
            K::Median => {
                let value = self.operand(item, context)?;
                if self.skips(&value) {
                    return Ok(acc);
                }
                if distinct {
                    distinct::set_add(acc, value)
                } else {
                    statistics::sample_add(name, acc, value)
                }
            }
            K::RowNumber | K::Rank | K::DenseRank | K::PercentRank | K::CumeDist => {
                window_functions::rank_cumulate(name, self.kind, item, acc)
            }
            K::Ntile => window_functions::ntile_cumulate(self, item, acc, context),
            K::RatioToReport => window_functions::ratio_cumulate(self, item, context),
            K::Lag | K::Lead | K::FirstValue | K::LastValue | K::NthValue => {
                offset_functions::offset_cumulate(self, item, acc, context)
            }
        }
    }

    /// Merge partial `part` into `acc`
    pub fn cumulate_intermediate(
        &self,
        part: Accumulator,
        acc: Accumulator,
        context: &dyn Context,
    ) -> PrismAggResult<Accumulator> {
        use AggregateKind as K;
        let name = self.name.as_str();
        let distinct = self.is_distinct();

        match self.kind {
            K::Count | K::CountN | K::Sum | K::Avg | K::ArrayAgg | K::Median if distinct => {
                distinct::cumulate_sets(part, acc)
            }
            K::Count | K::CountN => numeric::count_merge(name, part, acc),
            K::Sum | K::Avg => numeric::running_merge(name, part, acc),
            K::Min => numeric::extremum_merge(name, part, acc, Ordering::Less, context),
            K::Max => numeric::extremum_merge(name, part, acc, Ordering::Greater, context),
            K::ArrayAgg => numeric::collect_merge(name, part, acc),
            K::StddevPop | K::StddevSamp | K::VarPop | K::VarSamp | K::Median => {
                statistics::samples_merge(name, part, acc)
            }
            // window partitions are scanned sequentially; there is nothing to merge
            K::RowNumber
            | K::Rank
            | K::DenseRank
            | K::PercentRank
            | K::CumeDist
            | K::Ntile
            | K::RatioToReport
            | K::Lag
            | K::Lead
            | K::FirstValue
            | K::LastValue
            | K::NthValue => Ok(acc),
        }
    }

    /// Result of the converged accumulator
    pub fn compute_final(&self, acc: Accumulator, _context: &dyn Context) -> PrismAggResult<Value> {
        use AggregateKind as K;
        let name = self.name.as_str();
        let distinct = self.is_distinct();

        match self.kind {
            K::Count | K::CountN if distinct => {
                let set = distinct::get_set(acc)?;
                Ok(Value::Integer(set.len() as i64))
            }
            K::Sum if distinct => numeric::distinct_sum(name, &distinct::get_set(acc)?),
            K::Avg if distinct => numeric::distinct_avg(name, &distinct::get_set(acc)?),
            K::Sum => numeric::sum_final(name, acc),
            K::Avg => numeric::avg_final(name, acc),
            K::Count | K::CountN | K::Min | K::Max | K::RatioToReport => {
                numeric::scalar_final(name, acc)
            }
            K::ArrayAgg => numeric::collect_final(name, acc),
            K::StddevPop => statistics::variance_final(name, acc, Dispersion::Population, true),
            K::StddevSamp => statistics::variance_final(name, acc, Dispersion::Sample, true),
            K::VarPop => statistics::variance_final(name, acc, Dispersion::Population, false),
            K::VarSamp => statistics::variance_final(name, acc, Dispersion::Sample, false),
            K::Median => statistics::median_final(name, acc),
            K::RowNumber | K::Rank | K::DenseRank | K::PercentRank | K::CumeDist => {
                window_functions::rank_final(name, acc)
            }
            K::Ntile => window_functions::ntile_final(name, acc),
            K::Lag | K::Lead | K::FirstValue | K::LastValue | K::NthValue => {
                offset_functions::offset_final(name, acc)
            }
        }
    }

    /// Retract a row previously folded in by `cumulate_initial`.
    /// Only incremental, non-DISTINCT calls support this.
    pub fn cumulate_remove(
        &self,
        item: &Item,
        acc: Accumulator,
        context: &dyn Context,
    ) -> PrismAggResult<Accumulator> {
        use AggregateKind as K;
        if !self.has_property(AggregateProperties::ALLOWS_INCREMENTAL)
            || !self.has_modifiers(AggregateModifiers::INCREMENTAL)
            || self.has_modifiers(AggregateModifiers::DISTINCT)
        {
            return Err(PrismAggError::unsupported(&self.name, "cumulate_remove"));
        }
        if !self.passes_filter(item, context) {
            return Ok(acc);
        }
        let name = self.name.as_str();

        match self.kind {
            K::Count if self.operands.is_empty() => numeric::count_add(name, acc, -1),
            K::Count | K::CountN => {
                let value = self.operand(item, context)?;
                let counted = !self.skips(&value);
                if counted {
                    numeric::count_add(name, acc, -1)
                } else {
                    Ok(acc)
                }
            }
            K::Sum | K::Avg => {
                let value = self.operand(item, context)?;
                if !self.skips(&value) {
                    numeric::running_remove(name, acc, &value)
                } else {
                    Ok(acc)
                }
            }
            // ranks are monotonic within a partition and never retracted
            K::RowNumber | K::Rank | K::DenseRank | K::PercentRank | K::CumeDist | K::Ntile => {
                Ok(acc)
            }
            _ => Err(PrismAggError::unsupported(&self.name, "cumulate_remove")),
        }
    }

    /// Whether the result is settled before the frame is exhausted.
    /// Call only at tie-group boundaries.
    pub fn is_cumulate_done(&self, acc: &mut Accumulator, _context: &dyn Context) -> PrismAggResult<bool> {
        if !self.has_property(AggregateProperties::CUMULATE_DONE) {
            return Err(PrismAggError::unsupported(&self.name, "is_cumulate_done"));
        }
        offset_functions::offset_done(self, acc)
    }
}

impl fmt::Display for AggregateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AggregateModifiers as M;
        write!(f, "{}(", self.name)?;
        if self.has_modifiers(M::DISTINCT) {
            write!(f, "DISTINCT ")?;
        }
        if self.operands.is_empty() && self.kind == AggregateKind::Count {
            write!(f, "*")?;
        }
        let operands: Vec<String> = self.operands.iter().map(|op| op.render()).collect();
        write!(f, "{})", operands.join(", "))?;

        if self.has_modifiers(M::FROM_FIRST) {
            write!(f, " FROM FIRST")?;
        } else if self.has_modifiers(M::FROM_LAST) {
            write!(f, " FROM LAST")?;
        }
        if self.has_modifiers(M::RESPECT_NULLS) {
            write!(f, " RESPECT NULLS")?;
        } else if self.has_modifiers(M::IGNORE_NULLS) {
            write!(f, " IGNORE NULLS")?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " FILTER (WHERE {})", filter.render())?;
        }
        if let Some(window) = &self.window {
            write!(f, "{}", window)?;
        }
        Ok(())
    }
}
