mod common;

use common::{constant, field, fold, items};
use pretty_assertions::assert_eq;
use prism_agg::{
    aggregate_has_property, AggregateModifiers, AggregateProperties, AggregateSpec, ComparisonExpression,
    ComparisonType, ErrorKind, EvaluationContext, ExpressionRef, FieldExpression, Item, PrismAggResult, Value,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::Arc;

fn numbers(values: &[i64]) -> Vec<Item> {
    values.iter().map(|v| Item::from(json!({ "x": v }))).collect()
}

/// Split `rows` into random partials and merge them along a random tree
fn fold_partitioned(spec: &AggregateSpec, rows: &[Item], rng: &mut StdRng) -> PrismAggResult<Value> {
    let ctx = EvaluationContext::default();
    let k = rng.random_range(1..=8);
    let mut partials = Vec::with_capacity(k);
    for _ in 0..k {
        partials.push(spec.default(&Item::empty(), &ctx)?);
    }
    for item in rows {
        let slot = rng.random_range(0..k);
        let acc = std::mem::replace(&mut partials[slot], spec.default(&Item::empty(), &ctx)?);
        partials[slot] = spec.cumulate_initial(item, acc, &ctx)?;
    }
    while partials.len() > 1 {
        let left = partials.swap_remove(rng.random_range(0..partials.len()));
        let right = partials.swap_remove(rng.random_range(0..partials.len()));
        let merged = if rng.random_bool(0.5) {
            spec.cumulate_intermediate(left, right, &ctx)?
        } else {
            spec.cumulate_intermediate(right, left, &ctx)?
        };
        partials.push(merged);
    }
    match partials.pop() {
        Some(acc) => spec.compute_final(acc, &ctx),
        None => Ok(Value::Missing),
    }
}

#[test]
fn test_merge_order_does_not_matter() -> PrismAggResult<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let values: Vec<i64> = (0..300).map(|_| rng.random_range(-50..50)).collect();
    let mut rows = numbers(&values);
    rows.push(Item::from(json!({ "x": null })));
    rows.push(Item::from(json!({ "y": 1 })));

    let distinct = AggregateModifiers::DISTINCT;
    let specs = vec![
        AggregateSpec::new("sum", vec![field("x")])?,
        AggregateSpec::new("count", vec![field("x")])?,
        AggregateSpec::new("count", vec![])?,
        AggregateSpec::new("avg", vec![field("x")])?,
        AggregateSpec::new("min", vec![field("x")])?,
        AggregateSpec::new("max", vec![field("x")])?,
        AggregateSpec::new("countn", vec![field("x")])?,
        AggregateSpec::new("count", vec![field("x")])?.with_modifiers(distinct),
        AggregateSpec::new("sum", vec![field("x")])?.with_modifiers(distinct),
        AggregateSpec::new("avg", vec![field("x")])?.with_modifiers(distinct),
        AggregateSpec::new("median", vec![field("x")])?.with_modifiers(distinct),
        AggregateSpec::new("array_agg", vec![field("x")])?.with_modifiers(distinct),
    ];

    for spec in &specs {
        let expected = fold(spec, &rows)?;
        for _ in 0..20 {
            assert_eq!(fold_partitioned(spec, &rows, &mut rng)?, expected, "{}", spec);
        }
    }
    Ok(())
}

#[test]
fn test_distinct_is_idempotent() -> PrismAggResult<()> {
    let once = numbers(&[5, 1, 3]);
    let repeated = numbers(&[5, 1, 5, 3, 5, 1, 3, 3, 5]);
    for name in ["count", "countn", "sum", "avg", "median", "array_agg", "var_pop", "stddev_samp"] {
        let spec = AggregateSpec::new(name, vec![field("x")])?.with_modifiers(AggregateModifiers::DISTINCT);
        assert_eq!(fold(&spec, &repeated)?, fold(&spec, &once)?, "{}", name);
    }
    Ok(())
}

#[test]
fn test_distinct_numbers_compare_by_value() -> PrismAggResult<()> {
    let rows = items(&[json!({"x": 1}), json!({"x": 1.0}), json!({"x": 2.5})]);
    let count = AggregateSpec::new("count", vec![field("x")])?.with_modifiers(AggregateModifiers::DISTINCT);
    assert_eq!(fold(&count, &rows)?, Value::Integer(2));
    Ok(())
}

#[test]
fn test_distinct_integers_beyond_double_precision() -> PrismAggResult<()> {
    let big = 1i64 << 53;
    let rows = numbers(&[big, big + 1, big]);
    let distinct = |name: &str| -> PrismAggResult<AggregateSpec> {
        Ok(AggregateSpec::new(name, vec![field("x")])?.with_modifiers(AggregateModifiers::DISTINCT))
    };

    assert_eq!(fold(&distinct("count")?, &rows)?, Value::Integer(2));
    assert_eq!(fold(&distinct("countn")?, &rows)?, Value::Integer(2));
    assert_eq!(fold(&distinct("sum")?, &rows)?, Value::Integer(2 * big + 1));
    assert_eq!(
        fold(&distinct("array_agg")?, &rows)?,
        Value::Array(vec![Value::Integer(big), Value::Integer(big + 1)])
    );
    Ok(())
}

#[test]
fn test_null_and_missing_propagation() -> PrismAggResult<()> {
    let rows = items(&[json!({"x": null}), json!({}), json!({"x": null})]);
    for name in ["sum", "avg", "min", "max", "median", "stddev", "variance", "array_agg"] {
        let spec = AggregateSpec::new(name, vec![field("x")])?;
        let expected = if name == "array_agg" {
            Value::Array(vec![Value::Null, Value::Null])
        } else {
            Value::Null
        };
        assert_eq!(fold(&spec, &rows)?, expected, "{}", name);
    }
    assert_eq!(fold(&AggregateSpec::new("count", vec![])?, &rows)?, Value::Integer(3));
    assert_eq!(fold(&AggregateSpec::new("count", vec![field("x")])?, &rows)?, Value::Integer(0));
    Ok(())
}

#[test]
fn test_round_trip_scenario() -> PrismAggResult<()> {
    let rows = numbers(&[1, 2, 2, 3]);
    let distinct = AggregateModifiers::DISTINCT;
    let spec = |name: &str| AggregateSpec::new(name, vec![field("x")]);

    assert_eq!(fold(&spec("count")?.with_modifiers(distinct), &rows)?, Value::Integer(3));
    assert_eq!(fold(&spec("sum")?, &rows)?, Value::Integer(8));
    assert_eq!(fold(&spec("sum")?.with_modifiers(distinct), &rows)?, Value::Integer(6));
    assert_eq!(fold(&spec("median")?.with_modifiers(distinct), &rows)?, Value::Double(2.0));
    assert_eq!(fold(&spec("median")?, &rows)?, Value::Double(2.0));
    assert_eq!(fold(&spec("mean")?, &rows)?, Value::Double(2.0));
    Ok(())
}

#[test]
fn test_variance_boundaries() -> PrismAggResult<()> {
    let one = numbers(&[5]);
    let spec = |name: &str| AggregateSpec::new(name, vec![field("x")]);
    assert_eq!(fold(&spec("var_samp")?, &one)?, Value::Null);
    assert_eq!(fold(&spec("stddev_samp")?, &one)?, Value::Null);
    assert_eq!(fold(&spec("var_samp")?, &[])?, Value::Null);
    assert_eq!(fold(&spec("var_pop")?, &one)?, Value::Double(0.0));
    assert_eq!(fold(&spec("stddev_pop")?, &[])?, Value::Null);

    let rows = numbers(&[2, 4, 4, 4, 5, 5, 7, 9]);
    assert_eq!(fold(&spec("variance_pop")?, &rows)?, Value::Double(4.0));
    assert_eq!(fold(&spec("stddev_pop")?, &rows)?, Value::Double(2.0));
    Ok(())
}

#[test]
fn test_sliding_sum_with_retraction() -> PrismAggResult<()> {
    let ctx = EvaluationContext::default();
    let values = [3, 1, 4, 1, 5, 9, 2, 6];
    let rows = numbers(&values);
    let sum = AggregateSpec::new("sum", vec![field("x")])?.with_modifiers(AggregateModifiers::INCREMENTAL);
    let count = AggregateSpec::new("count", vec![])?.with_modifiers(AggregateModifiers::INCREMENTAL);

    // ROWS BETWEEN 2 PRECEDING AND CURRENT ROW
    let mut sum_acc = sum.default(&Item::empty(), &ctx)?;
    let mut count_acc = count.default(&Item::empty(), &ctx)?;
    for (i, item) in rows.iter().enumerate() {
        sum_acc = sum.cumulate_initial(item, sum_acc, &ctx)?;
        count_acc = count.cumulate_initial(item, count_acc, &ctx)?;
        if i >= 3 {
            sum_acc = sum.cumulate_remove(&rows[i - 3], sum_acc, &ctx)?;
            count_acc = count.cumulate_remove(&rows[i - 3], count_acc, &ctx)?;
        }
        let start = i.saturating_sub(2);
        let expected: i64 = values[start..=i].iter().sum();
        assert_eq!(sum.compute_final(sum_acc.clone(), &ctx)?, Value::Integer(expected));
        assert_eq!(
            count.compute_final(count_acc.clone(), &ctx)?,
            Value::Integer((i - start + 1) as i64)
        );
    }
    Ok(())
}

#[test]
fn test_remove_rejected_for_distinct_and_non_incremental() -> PrismAggResult<()> {
    let ctx = EvaluationContext::default();
    let row = Item::from(json!({"x": 1}));
    let cases = vec![
        AggregateSpec::new("sum", vec![field("x")])?,
        AggregateSpec::new("sum", vec![field("x")])?
            .with_modifiers(AggregateModifiers::INCREMENTAL | AggregateModifiers::DISTINCT),
        AggregateSpec::new("max", vec![field("x")])?.with_modifiers(AggregateModifiers::INCREMENTAL),
    ];
    for spec in &cases {
        let acc = spec.default(&row, &ctx)?;
        let acc = spec.cumulate_initial(&row, acc, &ctx)?;
        let err = spec.cumulate_remove(&row, acc, &ctx).map_err(|e| e.kind());
        assert!(matches!(err, Err(ErrorKind::ContractViolation)), "{}", spec);
    }
    Ok(())
}

#[test]
fn test_filter_errors_skip_rows() -> PrismAggResult<()> {
    let rows = items(&[json!({"x": 1, "ok": true}), json!({"x": 2, "ok": false}), json!({"x": 4})]);
    let sum = AggregateSpec::new("sum", vec![field("x")])?;

    assert_eq!(fold(&sum.clone().with_filter(field("ok")), &rows)?, Value::Integer(1));

    let broken = Arc::new(FieldExpression::new("a..b"));
    assert_eq!(fold(&sum.clone().with_filter(broken), &rows)?, Value::Null);

    let at_least_two = Arc::new(ComparisonExpression::new(
        ComparisonType::GreaterThanOrEqual,
        field("x"),
        constant(2),
    ));
    assert_eq!(fold(&sum.with_filter(at_least_two), &rows)?, Value::Integer(6));
    Ok(())
}

#[test]
fn test_operand_errors_propagate() -> PrismAggResult<()> {
    let broken: ExpressionRef = Arc::new(FieldExpression::new("a..b"));
    let sum = AggregateSpec::new("sum", vec![broken])?;
    let err = fold(&sum, &numbers(&[1])).map_err(|e| e.kind());
    assert!(matches!(err, Err(ErrorKind::Evaluation)));
    Ok(())
}

#[test]
fn test_capability_queries() {
    use AggregateProperties as P;
    assert!(aggregate_has_property("sum", P::ALLOWS_DISTINCT | P::ALLOWS_FILTER));
    assert!(aggregate_has_property("Lag", P::WINDOW_2ND_DYNAMIC));
    assert!(!aggregate_has_property("nth_value", P::WINDOW_2ND_DYNAMIC));
    assert!(aggregate_has_property("ratio_to_report", P::WINDOW_NOORDER));
    assert!(!aggregate_has_property("rank", P::ALLOWS_REGULAR));
    assert!(!aggregate_has_property("no_such_function", P::ALLOWS_REGULAR));
}

#[test]
fn test_unknown_function_and_arity() {
    let unknown = AggregateSpec::new("percentile", vec![field("x")]).map_err(|e| e.kind());
    assert!(matches!(unknown, Err(ErrorKind::Semantic)));

    let arity = AggregateSpec::new("nth_value", vec![field("x")]).map_err(|e| e.to_string());
    assert!(matches!(arity, Err(message) if message.contains("NTH_VALUE() takes 2 argument(s), 1 given")));
}
