//! Evaluation Context
//!
//! Provides collation and configuration to aggregate evaluation.

use crate::common::config::AggregateConfig;
use crate::types::Value;
use std::cmp::Ordering;

/// Services the aggregate engine consumes from its caller
pub trait Context: Send + Sync {
    /// Total order used by MIN, MAX and the ordered offset lists
    fn collate(&self, left: &Value, right: &Value) -> Ordering {
        left.collate(right)
    }

    fn config(&self) -> &AggregateConfig;
}

/// Stock context carrying an [`AggregateConfig`]
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    config: AggregateConfig,
}

impl EvaluationContext {
    pub fn new(config: AggregateConfig) -> Self {
        Self { config }
    }
}

impl Context for EvaluationContext {
    fn config(&self) -> &AggregateConfig {
        &self.config
    }
}
