mod common;

use common::{field, fold};
use pretty_assertions::assert_eq;
use prism_agg::expression::statistics::median_of_medians;
use prism_agg::{AggregateModifiers, AggregateSpec, Item, PrismAggResult, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

fn sorted_median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[test]
fn test_median_matches_full_sort() {
    let mut rng = StdRng::seed_from_u64(42);
    for n in 1..=1000 {
        // a narrow range forces many duplicates around the pivot
        let spread = if n % 3 == 0 { 10 } else { 1_000_000 };
        let values: Vec<f64> = (0..n).map(|_| rng.random_range(0..spread) as f64).collect();
        let expected = sorted_median(&values);
        let mut data = values.clone();
        assert_eq!(median_of_medians(&mut data), Some(expected), "n = {}", n);
    }
}

#[test]
fn test_median_of_sorted_and_reversed_input() {
    for n in [11, 25, 100, 101, 999] {
        let ascending: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let expected = sorted_median(&ascending);
        let mut data = ascending.clone();
        assert_eq!(median_of_medians(&mut data), Some(expected));
        let mut reversed: Vec<f64> = ascending.into_iter().rev().collect();
        assert_eq!(median_of_medians(&mut reversed), Some(expected));
    }
}

#[test]
fn test_median_distinct_matches_sorted_unique_values() -> PrismAggResult<()> {
    let mut rng = StdRng::seed_from_u64(9);
    let spec = AggregateSpec::new("median", vec![field("x")])?.with_modifiers(AggregateModifiers::DISTINCT);
    for n in [1, 2, 17, 200, 1000] {
        let values: Vec<i64> = (0..n).map(|_| rng.random_range(0..300)).collect();
        let rows: Vec<Item> = values.iter().map(|v| Item::from(json!({ "x": v }))).collect();

        let mut unique: Vec<f64> = values.iter().map(|v| *v as f64).collect();
        unique.sort_by(|a, b| a.total_cmp(b));
        unique.dedup();

        assert_eq!(fold(&spec, &rows)?, Value::Double(sorted_median(&unique)), "n = {}", n);
    }
    Ok(())
}
