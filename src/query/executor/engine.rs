// Pipeline Execution Engine Implementation
//
// Runs a pipeline over extracted batches: validation, merge, source blocks,
// global row operations, aggregation and hand-off to a loader.

use log::{debug, info};

use crate::catalog::{ColumnRegistry, PipelineValidator, ValidationError};
use crate::config::EngineConfig;
use crate::pipeline::error::{EtlError, EtlResult};
use crate::pipeline::extract::{merge_batches, pad_rows, CsvSource, RowSource, SourceBatch};
use crate::pipeline::load::Loader;
use crate::pipeline::model::{Operation, Pipeline};
use crate::query::executor::expression_eval::Evaluator;
use crate::query::executor::operators::{HashAggregate, RowTransform};
use crate::query::executor::result::{QueryResult, Row};

pub struct ExecutionEngine {
    config: EngineConfig,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        ExecutionEngine::new(EngineConfig::default())
    }
}

impl ExecutionEngine {
    pub fn new(config: EngineConfig) -> Self {
        ExecutionEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate a pipeline against its source files
    pub fn validate(&self, pipeline: &Pipeline) -> EtlResult<ColumnRegistry> {
        Ok(PipelineValidator::check(pipeline)?)
    }

    /// Read every extract source as CSV
    pub fn extract(&self, pipeline: &Pipeline) -> EtlResult<Vec<SourceBatch>> {
        let extract = pipeline
            .extract
            .as_ref()
            .ok_or_else(|| ValidationError::MissingPipelineStep("Extract".to_string()))?;

        let mut batches = Vec::with_capacity(extract.sources.len());
        for source in &extract.sources {
            let batch = CsvSource::from_definition(source).extract()?;
            info!("Extracted {} rows for source '{}'", batch.rows.len(), batch.alias);
            batches.push(batch);
        }
        Ok(batches)
    }

    /// Transform and aggregate already extracted batches. When validation is
    /// enabled the registry is seeded from declared schemas and batch columns.
    pub fn execute(&self, pipeline: &Pipeline, batches: Vec<SourceBatch>) -> EtlResult<Vec<Row>> {
        if self.config.validate_before_run {
            let extract = pipeline
                .extract
                .as_ref()
                .ok_or_else(|| ValidationError::MissingPipelineStep("Extract".to_string()))?;
            let mut registry = PipelineValidator::declared_columns(extract);
            for batch in &batches {
                for column in &batch.columns {
                    if !registry.contains(column) {
                        registry.register(column, None);
                    }
                }
            }
            PipelineValidator::check_with_registry(pipeline, registry)?;
        }
        Ok(self.transform(pipeline, batches)?)
    }

    /// Validate, extract, transform and load. Returns the number of rows loaded.
    pub fn run(&self, pipeline: &Pipeline, loader: &mut dyn Loader) -> EtlResult<usize> {
        info!("Running pipeline '{}' {}", pipeline.name, pipeline.version);
        if self.config.validate_before_run {
            PipelineValidator::validate(pipeline)?;
        }
        let load = pipeline
            .load
            .as_ref()
            .ok_or_else(|| ValidationError::MissingPipelineStep("Load".to_string()))?;

        let batches = self.extract(pipeline)?;
        let rows = self.transform(pipeline, batches).map_err(EtlError::Query)?;

        loader.load(load, &rows)?;
        info!("Pipeline '{}' loaded {} rows into '{}'", pipeline.name, rows.len(), load.target_name);
        Ok(rows.len())
    }

    fn transform(&self, pipeline: &Pipeline, batches: Vec<SourceBatch>) -> QueryResult<Vec<Row>> {
        let mut rows = merge_batches(batches);
        debug!("Merged stream has {} rows", rows.len());

        let Some(transform) = pipeline.transform.as_ref() else {
            return Ok(rows);
        };

        for block in &transform.source_blocks {
            rows = self.run_source_block(rows, &block.source_alias, &block.operations)?;
        }
        // Block targets and block aggregate rows only exist on their own alias
        if !transform.source_blocks.is_empty() {
            pad_rows(&mut rows);
        }

        let evaluator = self.evaluator(None);
        rows = RowTransform::new(&transform.operations, None)?.apply(rows, &evaluator)?;

        let aggregate = HashAggregate::new(&transform.operations, None, &self.config)?;
        if !aggregate.is_empty() {
            rows = aggregate.execute(&rows, &evaluator)?;
        }
        info!("Transform produced {} rows", rows.len());
        Ok(rows)
    }

    /// Apply a block to the rows of its alias. Other rows keep their position;
    /// block aggregates replace the alias rows and are appended to the stream.
    fn run_source_block(&self, rows: Vec<Row>, alias: &str, operations: &[Operation]) -> QueryResult<Vec<Row>> {
        let evaluator = self.evaluator(Some(alias));
        let row_ops = RowTransform::new(operations, Some(alias))?;
        let aggregate = HashAggregate::new(operations, Some(alias), &self.config)?;

        let mut output = Vec::with_capacity(rows.len());
        let mut scoped = Vec::new();
        for row in rows {
            if !row.origin().is_some_and(|origin| origin.eq_ignore_ascii_case(alias)) {
                output.push(row);
                continue;
            }
            if let Some(row) = row_ops.apply_row(row, &evaluator)? {
                if aggregate.is_empty() {
                    output.push(row);
                } else {
                    scoped.push(row);
                }
            }
        }

        if !aggregate.is_empty() {
            output.extend(aggregate.execute(&scoped, &evaluator)?);
        }
        debug!("Source block '{}' done, stream has {} rows", alias, output.len());
        Ok(output)
    }

    fn evaluator<'a>(&self, scope: Option<&'a str>) -> Evaluator<'a> {
        Evaluator::new()
            .with_scope(scope)
            .with_null_short_circuit(self.config.null_short_circuit)
    }
}
