//! FIRST_VALUE, LAST_VALUE, NTH_VALUE, LAG and LEAD
//!
//! All five keep the first `nth` qualifying values of their frame in a
//! [`BoundedOrderedList`](crate::types::BoundedOrderedList). The driver feeds the frame in
//! scan order and may stop as soon as `is_cumulate_done` reports true at a
//! tie-group boundary.

use crate::common::constants::DEFAULT_NTH_ITEM;
use crate::common::error::{PrismAggError, PrismAggResult};
use crate::execution::context::Context;
use crate::expression::accumulator::{Accumulator, OffsetState};
use crate::expression::aggregate::{AggregateModifiers, AggregateSpec};
use crate::expression::function::AggregateKind;
use crate::internal_err;
use crate::types::{Item, ScanDirection, Value};
use tracing::trace;

fn offset_state<'a>(function: &str, acc: &'a mut Accumulator) -> PrismAggResult<&'a mut OffsetState> {
    match acc {
        Accumulator::Offset(state) => Ok(state),
        other => Err(PrismAggError::InvalidList(format!(
            "{}() expected an offset list, found a {} accumulator",
            function,
            other.shape()
        ))),
    }
}

fn is_sequential(kind: AggregateKind) -> bool {
    matches!(kind, AggregateKind::Lag | AggregateKind::Lead)
}

/// Resolve offset, direction and fallback for the current row
pub fn offset_default(spec: &AggregateSpec, item: &Item, context: &dyn Context) -> PrismAggResult<Accumulator> {
    let function = spec.name();
    let operands = spec.operands();

    let nth_item = match operands.get(1) {
        Some(operand) => {
            let value = operand.evaluate(item, context)?;
            let nth = value.as_positive_integer().ok_or_else(|| {
                PrismAggError::InvalidArgument(format!(
                    "{}() second argument{} must evaluate to a positive integer.",
                    function,
                    operand.error_context()
                ))
            })?;
            usize::try_from(nth)
                .map_err(|_| PrismAggError::InvalidArgument(format!("{}() offset {} is too large.", function, nth)))?
        }
        None => DEFAULT_NTH_ITEM,
    };

    let fallback = match operands.get(2) {
        Some(operand) if is_sequential(spec.kind()) => operand.evaluate(item, context)?,
        _ => Value::Null,
    };

    let direction = match spec.kind() {
        AggregateKind::Lag | AggregateKind::LastValue => ScanDirection::Reverse,
        AggregateKind::NthValue if spec.has_modifiers(AggregateModifiers::FROM_LAST) => ScanDirection::Reverse,
        _ => ScanDirection::Forward,
    };

    Ok(Accumulator::Offset(OffsetState::new(nth_item, direction, fallback)))
}

/// Record one frame row
pub fn offset_cumulate(
    spec: &AggregateSpec,
    item: &Item,
    mut acc: Accumulator,
    context: &dyn Context,
) -> PrismAggResult<Accumulator> {
    let function = spec.name();
    let operand = spec
        .operands()
        .first()
        .ok_or_else(|| internal_err!("{}() has no operand", function))?;
    let mut value = operand.evaluate(item, context)?;
    if value.is_unknown() {
        if spec.has_modifiers(AggregateModifiers::IGNORE_NULLS) {
            return Ok(acc);
        }
        value = Value::Null;
    }

    let state = offset_state(function, &mut acc)?;
    if is_sequential(spec.kind()) {
        state.list.push(value);
    } else {
        let direction = state.direction;
        state
            .list
            .insert_ordered(value, direction, |left, right| context.collate(left, right));
    }
    Ok(acc)
}

/// Settle the closed tie group and report whether the nth value is known
pub fn offset_done(spec: &AggregateSpec, acc: &mut Accumulator) -> PrismAggResult<bool> {
    let function = spec.name();
    let state = offset_state(function, acc)?;
    if !is_sequential(spec.kind()) {
        state.list.settle();
    }
    let done = state.list.len() == state.nth_item;
    if done {
        trace!(function, nth = state.nth_item, "offset value settled");
    }
    Ok(done)
}

pub fn offset_final(function: &str, mut acc: Accumulator) -> PrismAggResult<Value> {
    let state = offset_state(function, &mut acc)?;
    if state.list.len() == state.nth_item {
        if let Some(value) = state.list.get(state.nth_item - 1) {
            return Ok(value.clone());
        }
    }
    Ok(std::mem::replace(&mut state.fallback, Value::Null))
}
