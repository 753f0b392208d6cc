//! STDDEV/VARIANCE families and MEDIAN
//!
//! Both buffer the raw numeric values. Variance is computed in two passes
//! over the buffer once the mean is known; the median is selected with
//! median-of-medians in linear time over a single slice.

use crate::common::constants::MEDIAN_GROUP_LENGTH;
use crate::common::error::{PrismAggError, PrismAggResult};
use crate::expression::accumulator::Accumulator;
use crate::types::value::compare_f64;
use crate::types::{DistinctSet, Value};
use std::cmp::Ordering;
use tracing::debug;

/// Ranges at most this long are sorted instead of partitioned
const SORT_THRESHOLD: usize = 2 * MEDIAN_GROUP_LENGTH;

/// Population or sample statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispersion {
    Population,
    Sample,
}

impl Dispersion {
    fn delta(&self) -> f64 {
        match self {
            Dispersion::Population => 0.0,
            Dispersion::Sample => 1.0,
        }
    }
}

pub fn empty_samples(capacity: usize) -> Accumulator {
    Accumulator::Samples {
        values: Vec::with_capacity(capacity),
        sum: 0.0,
    }
}

pub fn empty_distinct_samples(capacity: usize) -> Accumulator {
    Accumulator::DistinctSamples {
        set: DistinctSet::new(capacity, true),
        sum: 0.0,
    }
}

fn invalid_list(function: &str, acc: &Accumulator) -> PrismAggError {
    PrismAggError::InvalidList(format!(
        "{}() expected buffered values, found a {} accumulator",
        function,
        acc.shape()
    ))
}

fn invalid_set(function: &str, acc: &Accumulator) -> PrismAggError {
    PrismAggError::InvalidDistinctSet(format!(
        "{}() expected distinct values, found a {} accumulator",
        function,
        acc.shape()
    ))
}

/// Buffer one numeric value
pub fn sample_add(function: &str, acc: Accumulator, value: Value) -> PrismAggResult<Accumulator> {
    let x = match value.as_f64() {
        Some(x) => x,
        None => return Ok(acc),
    };
    match acc {
        Accumulator::Samples { mut values, sum } => {
            values.push(x);
            Ok(Accumulator::Samples { values, sum: sum + x })
        }
        Accumulator::DistinctSamples { mut set, mut sum } => {
            if set.add(value) {
                sum += x;
            }
            Ok(Accumulator::DistinctSamples { set, sum })
        }
        other => Err(invalid_list(function, &other)),
    }
}

pub fn samples_merge(function: &str, part: Accumulator, acc: Accumulator) -> PrismAggResult<Accumulator> {
    match (part, acc) {
        (
            Accumulator::Samples { values: part, sum: part_sum },
            Accumulator::Samples { mut values, sum },
        ) => {
            values.extend(part);
            Ok(Accumulator::Samples {
                values,
                sum: sum + part_sum,
            })
        }
        (
            Accumulator::DistinctSamples { set: left, sum: left_sum },
            Accumulator::DistinctSamples { set: right, sum: right_sum },
        ) => {
            let (mut bigger, bigger_sum, smaller) = if left.len() >= right.len() {
                (left, left_sum, right)
            } else {
                (right, right_sum, left)
            };
            let added = bigger.extend_from(smaller);
            let sum = bigger_sum + added.iter().filter_map(Value::as_f64).sum::<f64>();
            Ok(Accumulator::DistinctSamples { set: bigger, sum })
        }
        (Accumulator::DistinctSamples { .. }, other) => Err(invalid_set(function, &other)),
        (other, _) => Err(invalid_list(function, &other)),
    }
}

/// Σ(x − mean)² / (n − δ); NULL for an empty input and for a single sample value
pub fn variance<I>(values: I, count: usize, sum: f64, dispersion: Dispersion) -> Option<f64>
where
    I: Iterator<Item = f64>,
{
    match count {
        0 => None,
        1 if dispersion == Dispersion::Sample => None,
        1 => Some(0.0),
        _ => {
            let mean = sum / count as f64;
            let squares: f64 = values.map(|x| (x - mean) * (x - mean)).sum();
            Some(squares / (count as f64 - dispersion.delta()))
        }
    }
}

pub fn variance_final(
    function: &str,
    acc: Accumulator,
    dispersion: Dispersion,
    deviation: bool,
) -> PrismAggResult<Value> {
    let result = match acc {
        Accumulator::Samples { values, sum } => {
            debug!(function, count = values.len(), "computing variance");
            variance(values.iter().copied(), values.len(), sum, dispersion)
        }
        Accumulator::DistinctSamples { set, sum } => {
            debug!(function, count = set.len(), "computing distinct variance");
            variance(set.values().filter_map(Value::as_f64), set.len(), sum, dispersion)
        }
        other => return Err(invalid_list(function, &other)),
    };
    Ok(match result {
        Some(v) if deviation => Value::Double(v.sqrt()),
        Some(v) => Value::Double(v),
        None => Value::Null,
    })
}

pub fn median_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    let mut values = match acc {
        Accumulator::Samples { values, .. } => values,
        Accumulator::Distinct(set) => set.values().filter_map(Value::as_f64).collect(),
        other => return Err(invalid_list(function, &other)),
    };
    debug!(function, count = values.len(), "selecting median");
    Ok(median_of_medians(&mut values)
        .map(Value::Double)
        .unwrap_or(Value::Null))
}

/// Median of `data`, reordering it in place. For an even count the two
/// central order statistics are averaged.
pub fn median_of_medians(data: &mut [f64]) -> Option<f64> {
    let n = data.len();
    if n == 0 {
        return None;
    }
    let k = (n + 1) / 2;
    let kth = select(data, 0, n, k - 1);
    if n % 2 == 1 {
        return Some(kth);
    }
    // selection leaves every value after index k-1 no smaller than the k-th
    let next = data[k..]
        .iter()
        .copied()
        .fold(f64::INFINITY, |min, x| if compare_f64(x, min) == Ordering::Less { x } else { min });
    Some((kth + next) / 2.0)
}

/// Value of rank `k` (0-based, absolute index) within `data[lo..hi]`.
/// On return `data[lo..k]` holds no larger value and `data[k+1..hi]` no smaller one.
fn select(data: &mut [f64], mut lo: usize, mut hi: usize, k: usize) -> f64 {
    loop {
        if hi - lo <= SORT_THRESHOLD {
            data[lo..hi].sort_by(|a, b| compare_f64(*a, *b));
            return data[k];
        }
        let pivot = pivot(data, lo, hi);
        let (lt, gt) = partition(data, lo, hi, pivot);
        if k < lt {
            hi = lt;
        } else if k < gt {
            return pivot;
        } else {
            lo = gt;
        }
    }
}

/// Median of the group medians of `data[lo..hi]`
fn pivot(data: &mut [f64], lo: usize, hi: usize) -> f64 {
    let mut medians = 0;
    let mut start = lo;
    while start < hi {
        let end = (start + MEDIAN_GROUP_LENGTH).min(hi);
        data[start..end].sort_by(|a, b| compare_f64(*a, *b));
        let middle = start + (end - start - 1) / 2;
        data.swap(lo + medians, middle);
        medians += 1;
        start = end;
    }
    select(data, lo, lo + medians, lo + (medians - 1) / 2)
}

/// Three-way partition of `data[lo..hi]` around `pivot`: returns `(lt, gt)` with
/// `[lo, lt)` below, `[lt, gt)` equal to and `[gt, hi)` above the pivot
fn partition(data: &mut [f64], lo: usize, hi: usize, pivot: f64) -> (usize, usize) {
    let (mut lt, mut i, mut gt) = (lo, lo, hi);
    while i < gt {
        match compare_f64(data[i], pivot) {
            Ordering::Less => {
                data.swap(lt, i);
                lt += 1;
                i += 1;
            }
            Ordering::Greater => {
                gt -= 1;
                data.swap(i, gt);
            }
            Ordering::Equal => i += 1,
        }
    }
    (lt, gt)
}
