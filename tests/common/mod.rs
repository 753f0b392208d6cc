//! Window driver used by the integration tests
//!
//! Plays the part of the row source: groups an ordered partition into peer
//! groups, computes the per-row window facts and drives offset-access scans
//! with early termination at peer group boundaries.

#![allow(dead_code)]

use prism_agg::{
    AggregateKind, AggregateModifiers, AggregateSpec, ConstantExpression, Context, EvaluationContext,
    ExpressionRef, FieldExpression, Item, PrismAggResult, Value, WindowRowFact,
};
use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

pub fn field(path: &str) -> ExpressionRef {
    Arc::new(FieldExpression::new(path))
}

pub fn constant(value: impl Into<Value>) -> ExpressionRef {
    Arc::new(ConstantExpression::new(value))
}

pub fn items(documents: &[serde_json::Value]) -> Vec<Item> {
    documents.iter().cloned().map(Item::from).collect()
}

pub fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Integer(*v)).collect()
}

/// Fold every row through one accumulator and finalise it
pub fn fold(spec: &AggregateSpec, rows: &[Item]) -> PrismAggResult<Value> {
    let ctx = EvaluationContext::default();
    let mut acc = spec.default(&Item::empty(), &ctx)?;
    for item in rows {
        acc = spec.cumulate_initial(item, acc, &ctx)?;
    }
    spec.compute_final(acc, &ctx)
}

/// Runs of consecutive rows whose `key` field collates equal
pub fn peer_groups(rows: &[Item], key: &str) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        let boundary = i == rows.len()
            || rows[i].value().field(key).collate(&rows[start].value().field(key)) != Ordering::Equal;
        if boundary {
            groups.push(start..i);
            start = i;
        }
    }
    groups
}

/// Rank increments of every row of an ordered partition
pub fn rank_parts(kind: AggregateKind, groups: &[Range<usize>]) -> Vec<i64> {
    let rows = groups.last().map(|g| g.end).unwrap_or(0);
    let mut parts = vec![0; rows];
    let mut previous = 1;
    for group in groups {
        for i in group.clone() {
            let first = i == group.start;
            parts[i] = match kind {
                AggregateKind::RowNumber => 1,
                AggregateKind::DenseRank if first => 1,
                AggregateKind::Rank | AggregateKind::PercentRank if first => previous,
                AggregateKind::CumeDist if first => group.len() as i64,
                _ => 0,
            };
        }
        previous = group.len() as i64;
    }
    parts
}

/// Result of every row of one partition, already ordered by `key`
pub fn window_values(spec: &AggregateSpec, rows: &[Item], key: &str) -> PrismAggResult<Vec<Value>> {
    let n = rows.len() as i64;
    let facts: Vec<WindowRowFact> = match spec.kind() {
        kind if kind.is_rank_family() => {
            rank_parts(kind, &peer_groups(rows, key))
                .into_iter()
                .map(|part| WindowRowFact::new(part, n))
                .collect()
        }
        AggregateKind::Ntile => (0..n).map(|i| WindowRowFact::new(i, n)).collect(),
        AggregateKind::RatioToReport => {
            let sum = AggregateSpec::new("sum", spec.operands().to_vec())?;
            let total = fold(&sum, rows)?;
            (0..n).map(|_| WindowRowFact::new(total.clone(), n)).collect()
        }
        _ => return Ok(offset_scan(spec, rows, key)?.values),
    };

    let ctx = EvaluationContext::default();
    let mut acc = spec.default(&Item::empty(), &ctx)?;
    let mut values = Vec::with_capacity(rows.len());
    for (item, fact) in rows.iter().zip(facts) {
        let mut item = item.clone();
        item.set_window_fact(fact);
        acc = spec.cumulate_initial(&item, acc, &ctx)?;
        values.push(spec.compute_final(acc.clone(), &ctx)?);
    }
    Ok(values)
}

/// Offset-access results together with the number of frame rows fed per row
pub struct ScanOutcome {
    pub values: Vec<Value>,
    pub scanned: Vec<usize>,
}

/// LAG and LEAD scan away from the current row one row at a time. The other
/// offset functions scan the default frame (partition start through the
/// current peer group) one peer group at a time.
pub fn offset_scan(spec: &AggregateSpec, rows: &[Item], key: &str) -> PrismAggResult<ScanOutcome> {
    let ctx = EvaluationContext::default();
    let groups = peer_groups(rows, key);
    let from_last = spec.has_modifiers(AggregateModifiers::FROM_LAST);
    let mut outcome = ScanOutcome {
        values: Vec::with_capacity(rows.len()),
        scanned: Vec::with_capacity(rows.len()),
    };

    for (g, group) in groups.iter().enumerate() {
        for current in group.clone() {
            let frame: Vec<Range<usize>> = match spec.kind() {
                AggregateKind::Lag => (0..current).rev().map(|i| i..i + 1).collect(),
                AggregateKind::Lead => (current + 1..rows.len()).map(|i| i..i + 1).collect(),
                AggregateKind::LastValue => groups[..=g].iter().rev().cloned().collect(),
                AggregateKind::NthValue if from_last => groups[..=g].iter().rev().cloned().collect(),
                _ => groups[..=g].to_vec(),
            };

            let mut acc = spec.default(&rows[current], &ctx)?;
            let mut scanned = 0;
            for peers in frame {
                for i in peers {
                    acc = spec.cumulate_initial(&rows[i], acc, &ctx)?;
                    scanned += 1;
                }
                if spec.is_cumulate_done(&mut acc, &ctx)? {
                    break;
                }
            }
            outcome.values.push(spec.compute_final(acc, &ctx)?);
            outcome.scanned.push(scanned);
        }
    }
    Ok(outcome)
}

/// Sorts rows by collation of `key`, keeping arrival order among peers
pub fn order_by(mut rows: Vec<Item>, key: &str) -> Vec<Item> {
    let ctx = EvaluationContext::default();
    rows.sort_by(|a, b| ctx.collate(&a.value().field(key), &b.value().field(key)));
    rows
}
