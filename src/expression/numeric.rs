//! SUM, AVG, COUNT, COUNTN, MIN, MAX and ARRAY_AGG
//!
//! Non-distinct variants keep running state and merge it arithmetically.
//! DISTINCT variants buffer a set and reduce it only in `compute_final`,
//! so a value seen by several partials still counts once.

use crate::common::error::{PrismAggError, PrismAggResult};
use crate::execution::context::Context;
use crate::expression::accumulator::Accumulator;
use crate::internal_err;
use crate::types::{DistinctSet, Value};
use std::cmp::Ordering;

fn mismatch(function: &str, acc: &Accumulator) -> PrismAggError {
    internal_err!(
        "{}() partial of unexpected type: {} accumulator",
        function,
        acc.shape()
    )
}

fn add(function: &str, left: &Value, right: &Value) -> PrismAggResult<Value> {
    left.add_number(right)
        .ok_or_else(|| internal_err!("{}() cannot add {} and {}", function, left, right))
}

pub fn empty_running() -> Accumulator {
    Accumulator::Running {
        sum: Value::Integer(0),
        count: 0,
    }
}

pub fn running_add(function: &str, acc: Accumulator, value: &Value) -> PrismAggResult<Accumulator> {
    match acc {
        Accumulator::Running { sum, count } => Ok(Accumulator::Running {
            sum: add(function, &sum, value)?,
            count: count + 1,
        }),
        other => Err(mismatch(function, &other)),
    }
}

pub fn running_remove(function: &str, acc: Accumulator, value: &Value) -> PrismAggResult<Accumulator> {
    match acc {
        Accumulator::Running { sum, count } => {
            let sum = sum
                .sub_number(value)
                .ok_or_else(|| internal_err!("{}() cannot subtract {} from {}", function, value, sum))?;
            Ok(Accumulator::Running {
                sum,
                count: count - 1,
            })
        }
        other => Err(mismatch(function, &other)),
    }
}

pub fn running_merge(function: &str, part: Accumulator, acc: Accumulator) -> PrismAggResult<Accumulator> {
    match (part, acc) {
        (
            Accumulator::Running { sum: psum, count: pcount },
            Accumulator::Running { sum, count },
        ) => Ok(Accumulator::Running {
            sum: add(function, &sum, &psum)?,
            count: count + pcount,
        }),
        (Accumulator::Running { .. }, other) | (other, _) => Err(mismatch(function, &other)),
    }
}

pub fn sum_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    match acc {
        Accumulator::Running { count, .. } if count <= 0 => Ok(Value::Null),
        Accumulator::Running { sum, .. } => Ok(sum),
        other => Err(mismatch(function, &other)),
    }
}

pub fn avg_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    match acc {
        Accumulator::Running { count, .. } if count <= 0 => Ok(Value::Null),
        Accumulator::Running { sum, count } => {
            let total = sum
                .as_f64()
                .ok_or_else(|| internal_err!("{}() running sum is not a number: {}", function, sum))?;
            Ok(Value::Double(total / count as f64))
        }
        other => Err(mismatch(function, &other)),
    }
}

/// Sum of the values of a numeric set; NULL when empty
pub fn distinct_sum(function: &str, set: &DistinctSet) -> PrismAggResult<Value> {
    if set.is_empty() {
        return Ok(Value::Null);
    }
    let mut sum = Value::Integer(0);
    for value in set.values() {
        sum = add(function, &sum, value)?;
    }
    Ok(sum)
}

pub fn distinct_avg(function: &str, set: &DistinctSet) -> PrismAggResult<Value> {
    match distinct_sum(function, set)? {
        Value::Null => Ok(Value::Null),
        sum => {
            let total = sum
                .as_f64()
                .ok_or_else(|| internal_err!("{}() distinct sum is not a number: {}", function, sum))?;
            Ok(Value::Double(total / set.len() as f64))
        }
    }
}

pub fn count_add(function: &str, acc: Accumulator, delta: i64) -> PrismAggResult<Accumulator> {
    match acc {
        Accumulator::Scalar(Value::Integer(count)) => Ok(Accumulator::Scalar(Value::Integer(count + delta))),
        other => Err(mismatch(function, &other)),
    }
}

pub fn count_merge(function: &str, part: Accumulator, acc: Accumulator) -> PrismAggResult<Accumulator> {
    match part {
        Accumulator::Scalar(Value::Integer(count)) => count_add(function, acc, count),
        other => Err(mismatch(function, &other)),
    }
}

/// Fold `value` into a MIN (`keep` = Less) or MAX (`keep` = Greater).
/// NULL and MISSING never replace a concrete extremum.
pub fn extremum_add(
    function: &str,
    acc: Accumulator,
    value: Value,
    keep: Ordering,
    context: &dyn Context,
) -> PrismAggResult<Accumulator> {
    let current = match acc {
        Accumulator::Scalar(current) => current,
        other => return Err(mismatch(function, &other)),
    };
    if value.is_unknown() {
        return Ok(Accumulator::Scalar(current));
    }
    if current.is_unknown() || context.collate(&value, &current) == keep {
        return Ok(Accumulator::Scalar(value));
    }
    Ok(Accumulator::Scalar(current))
}

pub fn extremum_merge(
    function: &str,
    part: Accumulator,
    acc: Accumulator,
    keep: Ordering,
    context: &dyn Context,
) -> PrismAggResult<Accumulator> {
    match part {
        Accumulator::Scalar(value) => extremum_add(function, acc, value, keep, context),
        other => Err(mismatch(function, &other)),
    }
}

pub fn scalar_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    match acc {
        Accumulator::Scalar(value) => Ok(value),
        other => Err(mismatch(function, &other)),
    }
}

pub fn collect_add(function: &str, acc: Accumulator, value: Value) -> PrismAggResult<Accumulator> {
    match acc {
        Accumulator::Collected(mut values) => {
            values.push(value);
            Ok(Accumulator::Collected(values))
        }
        other => Err(PrismAggError::InvalidList(format!(
            "{}() expected a value list, found a {} accumulator",
            function,
            other.shape()
        ))),
    }
}

pub fn collect_merge(function: &str, part: Accumulator, acc: Accumulator) -> PrismAggResult<Accumulator> {
    match (part, acc) {
        (Accumulator::Collected(part), Accumulator::Collected(mut values)) => {
            values.extend(part);
            Ok(Accumulator::Collected(values))
        }
        (Accumulator::Collected(_), other) | (other, _) => Err(PrismAggError::InvalidList(format!(
            "{}() expected a value list, found a {} accumulator",
            function,
            other.shape()
        ))),
    }
}

pub fn collect_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    match acc {
        Accumulator::Collected(values) if values.is_empty() => Ok(Value::Null),
        Accumulator::Collected(values) => Ok(Value::Array(values)),
        Accumulator::Distinct(set) if set.is_empty() => Ok(Value::Null),
        Accumulator::Distinct(set) => Ok(Value::Array(set.sorted_values())),
        other => Err(PrismAggError::InvalidList(format!(
            "{}() expected a value list, found a {} accumulator",
            function,
            other.shape()
        ))),
    }
}
