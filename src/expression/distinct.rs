//! DISTINCT accumulation shared by every aggregate that buffers a set

use crate::common::error::{PrismAggError, PrismAggResult};
use crate::expression::accumulator::Accumulator;
use crate::types::{DistinctSet, Value};
use tracing::trace;

/// Fresh accumulator for a DISTINCT aggregate
pub fn empty_set(capacity: usize, numeric: bool) -> Accumulator {
    Accumulator::Distinct(DistinctSet::new(capacity, numeric))
}

/// Add `item` to the set carried by `acc`
pub fn set_add(acc: Accumulator, item: Value) -> PrismAggResult<Accumulator> {
    let mut set = get_set(acc)?;
    set.add(item);
    Ok(Accumulator::Distinct(set))
}

/// Merge two partial sets, moving the smaller into the larger
pub fn cumulate_sets(part: Accumulator, acc: Accumulator) -> PrismAggResult<Accumulator> {
    let part = get_set(part)?;
    let acc = get_set(acc)?;
    trace!(part = part.len(), cumulative = acc.len(), "merging distinct sets");
    Ok(Accumulator::Distinct(DistinctSet::union(part, acc)))
}

pub fn get_set(acc: Accumulator) -> PrismAggResult<DistinctSet> {
    match acc {
        Accumulator::Distinct(set) => Ok(set),
        other => Err(PrismAggError::InvalidDistinctSet(format!(
            "expected a distinct set, found a {} accumulator",
            other.shape()
        ))),
    }
}
