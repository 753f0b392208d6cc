//! Morsel-driven parallel partial aggregation
//!
//! The input rows are split into morsels that are folded independently on a
//! rayon pool. The partial accumulators are then merged with
//! `cumulate_intermediate` in rayon's reduction order and finalised once.

use crate::common::config::AggregateConfig;
use crate::common::error::{PrismAggError, PrismAggResult};
use crate::execution::context::EvaluationContext;
use crate::expression::accumulator::Accumulator;
use crate::expression::aggregate::AggregateSpec;
use crate::types::{Item, Value};
use rayon::prelude::*;
use tracing::debug;

/// Morsel - a chunk of work that can be processed independently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morsel {
    /// Starting offset in the input rows
    pub offset: usize,
    /// Number of rows in this morsel
    pub count: usize,
    pub id: usize,
}

impl Morsel {
    pub fn new(offset: usize, count: usize, id: usize) -> Self {
        Self { offset, count, id }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// Splits a row count into morsels
#[derive(Debug, Clone)]
pub struct MorselGenerator {
    total_rows: usize,
    morsel_size: usize,
}

impl MorselGenerator {
    pub fn new(total_rows: usize, morsel_size: usize) -> Self {
        Self {
            total_rows,
            morsel_size: morsel_size.max(1),
        }
    }

    pub fn get_all_morsels(&self) -> Vec<Morsel> {
        (0..self.num_morsels())
            .map(|i| {
                let offset = i * self.morsel_size;
                let count = std::cmp::min(self.morsel_size, self.total_rows - offset);
                Morsel::new(offset, count, i)
            })
            .collect()
    }

    pub fn num_morsels(&self) -> usize {
        (self.total_rows + self.morsel_size - 1) / self.morsel_size
    }
}

/// Evaluates regular aggregates over a row slice on a dedicated thread pool
pub struct ParallelAggregator {
    config: AggregateConfig,
    pool: rayon::ThreadPool,
}

impl ParallelAggregator {
    pub fn new(config: AggregateConfig) -> PrismAggResult<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| PrismAggError::Config(format!("cannot build thread pool: {}", e)))?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Fold `items` through `spec` and return the final value
    pub fn aggregate(&self, spec: &AggregateSpec, items: &[Item]) -> PrismAggResult<Value> {
        spec.validate()?;
        if spec.is_window() {
            return Err(PrismAggError::semantic(
                spec.name(),
                "window aggregates are evaluated by a window driver.",
            ));
        }
        let context = EvaluationContext::new(self.config.clone());

        if !self.config.parallel_enabled() || items.len() <= self.config.morsel_size {
            let acc = fold_morsel(spec, items, &context)?;
            return spec.compute_final(acc, &context);
        }

        let morsels = MorselGenerator::new(items.len(), self.config.morsel_size).get_all_morsels();
        debug!(
            function = spec.name(),
            rows = items.len(),
            morsels = morsels.len(),
            threads = self.config.threads,
            "planned parallel aggregation"
        );

        let merged = self.pool.install(|| {
            morsels
                .par_iter()
                .map(|morsel| fold_morsel(spec, &items[morsel.range()], &context))
                .try_reduce_with(|acc, part| spec.cumulate_intermediate(part, acc, &context))
        });
        let acc = match merged {
            Some(acc) => acc?,
            None => spec.default(&Item::empty(), &context)?,
        };
        debug!(function = spec.name(), "merged partial aggregates");
        spec.compute_final(acc, &context)
    }
}

fn fold_morsel(spec: &AggregateSpec, rows: &[Item], context: &EvaluationContext) -> PrismAggResult<Accumulator> {
    let mut acc = spec.default(&Item::empty(), context)?;
    for item in rows {
        acc = spec.cumulate_initial(item, acc, context)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::MORSEL_SIZE;
    use crate::common::error::ErrorKind;
    use crate::expression::aggregate::AggregateModifiers;
    use crate::expression::expression::{ExpressionRef, FieldExpression};
    use crate::expression::window::WindowSpec;
    use serde_json::json;
    use std::sync::Arc;

    fn field(path: &str) -> ExpressionRef {
        Arc::new(FieldExpression::new(path))
    }

    fn rows(n: i64) -> Vec<Item> {
        (0..n).map(|i| Item::from(json!({ "x": i % 17, "s": format!("k{}", i % 5) }))).collect()
    }

    #[test]
    fn test_morsel_generator() {
        let generator = MorselGenerator::new(250000, MORSEL_SIZE);
        let morsels = generator.get_all_morsels();

        // 102400 + 102400 + 45200 = 250000
        assert_eq!(morsels.len(), 3);
        assert_eq!(morsels[0].count, 102400);
        assert_eq!(morsels[1].count, 102400);
        assert_eq!(morsels[2].count, 45200);
        assert_eq!(morsels[2].range(), 204800..250000);
        assert!(MorselGenerator::new(0, 10).get_all_morsels().is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() -> PrismAggResult<()> {
        let items = rows(1000);
        let sequential = ParallelAggregator::new(AggregateConfig::default().with_threads(1))?;
        let parallel = ParallelAggregator::new(
            AggregateConfig::default().with_threads(4).with_morsel_size(37),
        )?;

        let specs = vec![
            AggregateSpec::new("sum", vec![field("x")])?,
            AggregateSpec::new("count", vec![field("x")])?.with_modifiers(AggregateModifiers::DISTINCT),
            AggregateSpec::new("median", vec![field("x")])?,
            AggregateSpec::new("var_samp", vec![field("x")])?,
            AggregateSpec::new("max", vec![field("s")])?,
            AggregateSpec::new("array_agg", vec![field("s")])?.with_modifiers(AggregateModifiers::DISTINCT),
        ];
        for spec in &specs {
            let expected = sequential.aggregate(spec, &items)?;
            let actual = parallel.aggregate(spec, &items)?;
            match (&expected, &actual) {
                (Value::Double(e), Value::Double(a)) => assert!((e - a).abs() < 1e-9, "{}", spec),
                _ => assert_eq!(expected, actual, "{}", spec),
            }
        }
        Ok(())
    }

    #[test]
    fn test_array_agg_keeps_row_order() -> PrismAggResult<()> {
        let items = rows(100);
        let parallel = ParallelAggregator::new(
            AggregateConfig::default().with_threads(3).with_morsel_size(7),
        )?;
        let spec = AggregateSpec::new("array_agg", vec![field("x")])?;
        let expected: Vec<Value> = (0..100).map(|i| Value::Integer(i % 17)).collect();
        assert_eq!(parallel.aggregate(&spec, &items)?, Value::Array(expected));
        Ok(())
    }

    #[test]
    fn test_window_aggregate_rejected() -> PrismAggResult<()> {
        let aggregator = ParallelAggregator::new(AggregateConfig::default())?;
        let spec = AggregateSpec::new("sum", vec![field("x")])?
            .with_window(WindowSpec::new(vec![field("s")], vec![], None));
        let err = aggregator.aggregate(&spec, &rows(3)).map_err(|e| e.kind());
        assert!(matches!(err, Err(ErrorKind::Semantic)));

        let rank = AggregateSpec::new("rank", vec![])?;
        assert!(aggregator.aggregate(&rank, &rows(3)).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_input_uses_default() -> PrismAggResult<()> {
        let aggregator = ParallelAggregator::new(
            AggregateConfig::default().with_threads(2).with_morsel_size(1),
        )?;
        assert_eq!(
            aggregator.aggregate(&AggregateSpec::new("count", vec![])?, &[])?,
            Value::Integer(0)
        );
        assert_eq!(
            aggregator.aggregate(&AggregateSpec::new("avg", vec![field("x")])?, &[])?,
            Value::Null
        );
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = ParallelAggregator::new(AggregateConfig::default().with_threads(0));
        assert!(matches!(err.map_err(|e| e.kind()), Err(ErrorKind::Environment)));
    }
}
