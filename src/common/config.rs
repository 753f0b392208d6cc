//! Configuration for aggregate evaluation
//!
//! Settings can be loaded from JSON; any field left out keeps its default.

use crate::common::constants::{DISTINCT_SET_CAPACITY, INITIAL_LIST_CAPACITY, MORSEL_SIZE};
use crate::common::error::{PrismAggError, PrismAggResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Aggregate engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Initial capacity of DISTINCT sets
    pub distinct_set_capacity: usize,
    /// Initial capacity of buffered value lists
    pub list_capacity: usize,
    /// Rows per morsel for parallel partial aggregation
    pub morsel_size: usize,
    /// Number of worker threads for parallel partial aggregation
    pub threads: usize,
}

impl AggregateConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> PrismAggResult<Self> {
        let config: AggregateConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> PrismAggResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_morsel_size(mut self, morsel_size: usize) -> Self {
        self.morsel_size = morsel_size;
        self
    }

    pub fn parallel_enabled(&self) -> bool {
        self.threads > 1
    }

    pub fn validate(&self) -> PrismAggResult<()> {
        if self.morsel_size == 0 {
            return Err(PrismAggError::Config(
                "morsel_size must be greater than zero".to_string(),
            ));
        }
        if self.threads == 0 {
            return Err(PrismAggError::Config(
                "threads must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        AggregateConfig {
            distinct_set_capacity: DISTINCT_SET_CAPACITY,
            list_capacity: INITIAL_LIST_CAPACITY,
            morsel_size: MORSEL_SIZE,
            threads: num_cpus::get(),
        }
    }
}
