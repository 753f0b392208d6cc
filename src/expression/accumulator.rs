//! Accumulator state threaded through the aggregate protocol
//!
//! Each function family owns one variant. The variant is chosen by
//! `AggregateSpec::default` and every later phase expects that same variant;
//! receiving another one means the driver mixed up partials.

use crate::types::{BoundedOrderedList, DistinctSet, ScanDirection, Value};

/// State of one aggregate over one group or partition
#[derive(Debug, Clone)]
pub enum Accumulator {
    /// COUNT, COUNTN, MIN, MAX and RATIO_TO_REPORT
    Scalar(Value),
    /// SUM and AVG running totals
    Running { sum: Value, count: i64 },
    /// Values seen by a DISTINCT aggregate
    Distinct(DistinctSet),
    /// Every numeric value with their running sum (variance family, MEDIAN)
    Samples { values: Vec<f64>, sum: f64 },
    /// Distinct numeric values with their running sum (DISTINCT variance family)
    DistinctSamples { set: DistinctSet, sum: f64 },
    /// ARRAY_AGG values in arrival order
    Collected(Vec<Value>),
    /// ROW_NUMBER, RANK, DENSE_RANK, PERCENT_RANK and CUME_DIST
    Rank(RankState),
    /// LAG, LEAD, FIRST_VALUE, LAST_VALUE and NTH_VALUE
    Offset(OffsetState),
    Ntile(NtileState),
}

impl Accumulator {
    /// Short variant name for error messages
    pub fn shape(&self) -> &'static str {
        match self {
            Accumulator::Scalar(_) => "scalar",
            Accumulator::Running { .. } => "running",
            Accumulator::Distinct(_) => "distinct",
            Accumulator::Samples { .. } => "samples",
            Accumulator::DistinctSamples { .. } => "distinct samples",
            Accumulator::Collected(_) => "collected",
            Accumulator::Rank(_) => "rank",
            Accumulator::Offset(_) => "offset",
            Accumulator::Ntile(_) => "ntile",
        }
    }
}

/// Running counter of the rank family
#[derive(Debug, Clone, PartialEq)]
pub struct RankState {
    /// Sum of the `part` facts seen so far
    pub running: Value,
    /// Value handed out by `compute_final`
    pub result: Value,
}

impl RankState {
    pub fn new() -> Self {
        Self {
            running: Value::Integer(0),
            result: Value::Integer(0),
        }
    }
}

impl Default for RankState {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded scan state of the offset-access family.
///
/// `nth_item` and `direction` are resolved per row by `default`, so a
/// partition never sees the offset of another.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetState {
    pub list: BoundedOrderedList,
    pub nth_item: usize,
    pub direction: ScanDirection,
    /// Result when the list never reaches `nth_item` entries
    pub fallback: Value,
}

impl OffsetState {
    pub fn new(nth_item: usize, direction: ScanDirection, fallback: Value) -> Self {
        Self {
            list: BoundedOrderedList::new(nth_item),
            nth_item,
            direction,
            fallback,
        }
    }
}

/// NTILE bucket counters for one partition
#[derive(Debug, Clone, PartialEq)]
pub struct NtileState {
    /// Bucket count, unset until the first row is seen or when it was not a number
    pub buckets: Option<i64>,
    pub nrows: i64,
    pub current_bucket: i64,
    /// Row index at which the next bucket starts
    pub current_max_row: i64,
}

impl NtileState {
    pub fn new() -> Self {
        Self {
            buckets: None,
            nrows: 0,
            current_bucket: 0,
            current_max_row: 0,
        }
    }

    pub fn result(&self) -> Value {
        match self.buckets {
            Some(_) if self.current_bucket > 0 => Value::Integer(self.current_bucket),
            _ => Value::Null,
        }
    }
}

impl Default for NtileState {
    fn default() -> Self {
        Self::new()
    }
}
