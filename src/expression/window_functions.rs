//! Rank family, NTILE and RATIO_TO_REPORT
//!
//! These functions never look at other rows. The window driver precomputes a
//! [`WindowRowFact`] per row and the functions fold it in partition order.

use crate::common::error::{PrismAggError, PrismAggResult};
use crate::execution::context::Context;
use crate::expression::accumulator::{Accumulator, NtileState, RankState};
use crate::expression::aggregate::AggregateSpec;
use crate::expression::function::AggregateKind;
use crate::internal_err;
use crate::types::{Item, Value, WindowRowFact};
use tracing::debug;

fn window_fact<'a>(function: &str, item: &'a Item) -> PrismAggResult<&'a WindowRowFact> {
    item.window_fact()
        .ok_or_else(|| PrismAggError::window_attachment(function, "row carries no window fact"))
}

fn numeric_fact(function: &str, label: &str, value: &Value) -> PrismAggResult<f64> {
    value.as_f64().ok_or_else(|| {
        PrismAggError::window_attachment(function, format!("{} is not a number: {}", label, value))
    })
}

/// Add the row's rank increment to the running counter
pub fn rank_cumulate(
    function: &str,
    kind: AggregateKind,
    item: &Item,
    acc: Accumulator,
) -> PrismAggResult<Accumulator> {
    let mut state = match acc {
        Accumulator::Rank(state) => state,
        other => return Err(internal_err!("{}() expected rank state, found {}", function, other.shape())),
    };
    let fact = window_fact(function, item)?;
    if !fact.part.is_number() {
        return Err(PrismAggError::window_attachment(
            function,
            format!("part is not a number: {}", fact.part),
        ));
    }
    state.running = state
        .running
        .add_number(&fact.part)
        .ok_or_else(|| internal_err!("{}() cannot add rank part {}", function, fact.part))?;

    state.result = match kind {
        AggregateKind::PercentRank => {
            let nrows = numeric_fact(function, "nrows", &fact.nrows)?;
            let rank = numeric_fact(function, "rank", &state.running)?;
            if nrows <= 1.0 {
                Value::Double(0.0)
            } else {
                Value::Double((rank - 1.0) / (nrows - 1.0))
            }
        }
        AggregateKind::CumeDist => {
            let nrows = numeric_fact(function, "nrows", &fact.nrows)?;
            let rows = numeric_fact(function, "rank", &state.running)?;
            if nrows <= 0.0 {
                return Err(PrismAggError::window_attachment(function, "nrows must be positive"));
            }
            Value::Double(rows / nrows)
        }
        _ => state.running.clone(),
    };
    Ok(Accumulator::Rank(state))
}

pub fn rank_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    match acc {
        Accumulator::Rank(RankState { result, .. }) => Ok(result),
        other => Err(internal_err!("{}() expected rank state, found {}", function, other.shape())),
    }
}

/// Advance the bucket counters; `part` is the row index within the partition
pub fn ntile_cumulate(
    spec: &AggregateSpec,
    item: &Item,
    acc: Accumulator,
    context: &dyn Context,
) -> PrismAggResult<Accumulator> {
    let function = spec.name();
    let mut state = match acc {
        Accumulator::Ntile(state) => state,
        other => return Err(internal_err!("{}() expected ntile state, found {}", function, other.shape())),
    };
    let fact = window_fact(function, item)?;
    let row = numeric_fact(function, "row index", &fact.part)? as i64;

    if row == 0 {
        state = NtileState::new();
        let operand = spec
            .operands()
            .first()
            .ok_or_else(|| internal_err!("{}() has no bucket count", function))?;
        let buckets = operand.evaluate(item, context)?;
        if let Some(k) = buckets.as_f64() {
            let k = k.trunc() as i64;
            if k <= 0 {
                return Err(PrismAggError::InvalidArgument(format!(
                    "{}() argument{} must be greater than 0.",
                    function,
                    operand.error_context()
                )));
            }
            state.nrows = numeric_fact(function, "nrows", &fact.nrows)? as i64;
            state.buckets = Some(k);
            debug!(function, buckets = k, nrows = state.nrows, "partition buckets");
        }
    }

    if let Some(k) = state.buckets {
        if row == state.current_max_row {
            state.current_max_row += state.nrows / k;
            if state.current_bucket < state.nrows % k {
                state.current_max_row += 1;
            }
            state.current_bucket += 1;
        }
    }
    Ok(Accumulator::Ntile(state))
}

pub fn ntile_final(function: &str, acc: Accumulator) -> PrismAggResult<Value> {
    match acc {
        Accumulator::Ntile(state) => Ok(state.result()),
        other => Err(internal_err!("{}() expected ntile state, found {}", function, other.shape())),
    }
}

/// Row value over the partition total carried in `part`
pub fn ratio_cumulate(spec: &AggregateSpec, item: &Item, context: &dyn Context) -> PrismAggResult<Accumulator> {
    let function = spec.name();
    let fact = window_fact(function, item)?;
    let value = match spec.operands().first() {
        Some(operand) => operand.evaluate(item, context)?,
        None => return Err(internal_err!("{}() has no operand", function)),
    };
    let ratio = match (value.as_f64(), fact.part.as_f64()) {
        (Some(v), Some(total)) if total != 0.0 => Value::Double(v / total),
        _ => Value::Null,
    };
    Ok(Accumulator::Scalar(ratio))
}
