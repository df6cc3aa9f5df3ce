// Engine Configuration
//
// Runtime knobs for the execution engine. Loadable from JSON, with defaults
// matching the narrow, fail-fast baseline behavior.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::{EtlError, EtlResult};

/// How aggregate operations sharing a group-by set are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    /// One output row per aggregate per group
    #[default]
    Narrow,
    /// Aggregates with identical group-by columns merged into one row per group
    Wide,
}

/// Configuration for pipeline execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output shape of the aggregation stage
    pub aggregate_mode: AggregateMode,

    /// Allow AVG over a group without values (yields 0 instead of an error),
    /// and emit a row for an ungrouped aggregate over zero input rows
    pub allow_empty_groups: bool,

    /// Run the validator before any row is processed
    pub validate_before_run: bool,

    /// Arithmetic and ordering with a NULL operand yield NULL instead of failing
    pub null_short_circuit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aggregate_mode: AggregateMode::Narrow,
            allow_empty_groups: false,
            validate_before_run: true,
            null_short_circuit: false,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> EtlResult<Self> {
        serde_json::from_str(text).map_err(|e| EtlError::Config(e.to_string()))
    }

    pub fn with_aggregate_mode(mut self, mode: AggregateMode) -> Self {
        self.aggregate_mode = mode;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_before_run = validate;
        self
    }
}
