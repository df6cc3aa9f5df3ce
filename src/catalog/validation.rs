// Pipeline Validation Module
//
// Static pass over a pipeline definition run before any row is processed.
// Resolves every referenced column against a registry seeded from the
// extract sources and checks type and naming constraints.

use std::collections::HashSet;

use log::{debug, info};
use once_cell::sync::Lazy;

use crate::catalog::registry::ColumnRegistry;
use crate::catalog::schema::{describe_type, ColumnType};
use crate::catalog::validation_error::{ValidationError, ValidationResult};
use crate::common::types::{qualify, qualify_in_scope};
use crate::pipeline::extract::read_csv_header;
use crate::pipeline::model::{ExtractStep, Operation, Pipeline, TransformStep};
use crate::query::executor::operators::AggregateType;
use crate::query::parser::ast::{ColumnReference, Expression};
use crate::query::parser::lexer::KEYWORDS;
use crate::query::parser::parse;

/// Words the expression language reserves; they can never name a column
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| KEYWORDS.iter().copied().collect());

/// Validates pipeline definitions
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline, failing on the first problem found
    pub fn validate(pipeline: &Pipeline) -> ValidationResult<()> {
        Self::check(pipeline).map(|_| ())
    }

    /// Validate a pipeline and return the registry of every column known
    /// after the last operation
    pub fn check(pipeline: &Pipeline) -> ValidationResult<ColumnRegistry> {
        let (extract, _) = Self::required_steps(pipeline)?;
        let registry = Self::seed_registry(extract)?;
        Self::check_with_registry(pipeline, registry)
    }

    /// Validate against an already seeded registry, e.g. one built from
    /// in-memory batches instead of source files
    pub fn check_with_registry(pipeline: &Pipeline, mut registry: ColumnRegistry) -> ValidationResult<ColumnRegistry> {
        let (extract, transform) = Self::required_steps(pipeline)?;
        debug!("Validation registry seeded with {} columns", registry.len());

        // Source blocks first, then the global operations
        for block in &transform.source_blocks {
            let alias = extract
                .sources
                .iter()
                .find(|s| s.alias.eq_ignore_ascii_case(&block.source_alias))
                .map(|s| s.alias.as_str())
                .ok_or_else(|| ValidationError::UnknownSourceAlias(block.source_alias.clone()))?;
            Self::validate_operations(&block.operations, &mut registry, Some(alias))?;
        }
        Self::validate_operations(&transform.operations, &mut registry, None)?;

        info!("Pipeline '{}' validated ({} columns known)", pipeline.name, registry.len());
        Ok(registry)
    }

    fn required_steps(pipeline: &Pipeline) -> ValidationResult<(&ExtractStep, &TransformStep)> {
        let extract = pipeline
            .extract
            .as_ref()
            .ok_or_else(|| ValidationError::MissingPipelineStep("Extract".to_string()))?;
        let transform = pipeline
            .transform
            .as_ref()
            .ok_or_else(|| ValidationError::MissingPipelineStep("Transform".to_string()))?;
        if pipeline.load.is_none() {
            return Err(ValidationError::MissingPipelineStep("Load".to_string()));
        }
        Ok((extract, transform))
    }

    /// Columns declared on the sources themselves, without reading any file
    pub fn declared_columns(extract: &ExtractStep) -> ColumnRegistry {
        let mut registry = ColumnRegistry::new();
        for source in &extract.sources {
            for column in source.columns.iter().flatten() {
                registry.register(&qualify(&source.alias, &column.name), column.column_type);
            }
        }
        registry
    }

    /// Known columns before any operation: declared schemas, or the header
    /// of every source file with columns typed DECIMAL
    pub fn seed_registry(extract: &ExtractStep) -> ValidationResult<ColumnRegistry> {
        let mut registry = Self::declared_columns(extract);
        for source in extract.sources.iter().filter(|s| s.columns.is_none()) {
            for location in &source.locations {
                let headers = read_csv_header(location).map_err(|e| ValidationError::SourceUnavailable(e.to_string()))?;
                for header in headers {
                    registry.register(&qualify(&source.alias, &header), Some(ColumnType::Decimal));
                }
            }
        }
        Ok(registry)
    }

    fn validate_operations(
        operations: &[Operation],
        registry: &mut ColumnRegistry,
        scope: Option<&str>,
    ) -> ValidationResult<()> {
        let mut local_targets: HashSet<String> = HashSet::new();

        for op in operations {
            debug!("Validating {}", op);
            let target = match op.target_column() {
                Some(target) => {
                    if RESERVED_WORDS.contains(target.trim().to_uppercase().as_str()) {
                        return Err(ValidationError::ReservedColumnName(target.to_string()));
                    }
                    let qualified = qualify_in_scope(scope, target);
                    if !local_targets.insert(qualified.to_lowercase()) {
                        return Err(ValidationError::DuplicateColumn(qualified));
                    }
                    Some(qualified)
                }
                None => None,
            };

            match op {
                Operation::Map { expression, .. } => {
                    Self::check_expression(expression, registry, scope, false)?;
                }
                Operation::ConditionalMap {
                    condition,
                    true_expression,
                    false_expression,
                    ..
                } => {
                    Self::check_expression(condition, registry, scope, true)?;
                    Self::check_expression(true_expression, registry, scope, false)?;
                    Self::check_expression(false_expression, registry, scope, false)?;
                }
                Operation::Filter { condition } => {
                    Self::check_expression(condition, registry, scope, true)?;
                }
                Operation::Aggregate {
                    function,
                    expression,
                    group_by_columns,
                    ..
                } => {
                    let agg_type: AggregateType = function
                        .parse()
                        .map_err(|_| ValidationError::UnknownAggregateFunction(function.clone()))?;
                    let expr = Self::check_expression(expression, registry, scope, false)?;

                    if agg_type.requires_numeric() {
                        if let Expression::Column(col_ref) = &expr {
                            let (resolved, column_type) = Self::resolve(col_ref, registry, scope)?;
                            if column_type.is_some_and(|t| !t.is_numeric()) {
                                return Err(ValidationError::TypeMismatch {
                                    column: resolved,
                                    expected: ColumnType::Decimal.to_string(),
                                    actual: describe_type(column_type).to_string(),
                                });
                            }
                        }
                    }

                    for column in group_by_columns {
                        Self::resolve(&ColumnReference::from_identifier(column.trim()), registry, scope)?;
                    }
                }
            }

            if let Some(target) = target {
                registry.register(&target, op.target_type());
            }
        }
        Ok(())
    }

    /// Parse an expression and resolve every column it references. A condition
    /// without any comparison may only reference BOOLEAN or untyped columns.
    fn check_expression(
        text: &str,
        registry: &ColumnRegistry,
        scope: Option<&str>,
        is_condition: bool,
    ) -> ValidationResult<Expression> {
        let expr = parse(text).map_err(|source| ValidationError::Parse {
            expression: text.to_string(),
            source,
        })?;
        let needs_boolean = is_condition && !expr.has_comparison();

        for col_ref in expr.column_references() {
            let (resolved, column_type) = Self::resolve(col_ref, registry, scope)?;
            if needs_boolean && column_type.is_some_and(|t| t != ColumnType::Boolean) {
                return Err(ValidationError::TypeMismatch {
                    column: resolved,
                    expected: ColumnType::Boolean.to_string(),
                    actual: describe_type(column_type).to_string(),
                });
            }
        }
        Ok(expr)
    }

    /// Resolve a column reference the way the evaluator does: a qualified name
    /// as written; a bare name under the scope alias, then literally, then by
    /// a unique `<alias>.<name>` suffix.
    fn resolve(
        col_ref: &ColumnReference,
        registry: &ColumnRegistry,
        scope: Option<&str>,
    ) -> ValidationResult<(String, Option<ColumnType>)> {
        let written = col_ref.full_name();
        let found = |name: &str| {
            registry
                .display_name(name)
                .map(|display| (display.to_string(), registry.column_type(name).flatten()))
        };

        if col_ref.is_qualified() {
            return found(&written).ok_or_else(|| unknown_column(&written, &written, registry));
        }

        let scoped = qualify_in_scope(scope, &written);
        if let Some(hit) = found(&scoped).or_else(|| found(&written)) {
            return Ok(hit);
        }

        match registry.suffix_matches(&written).as_slice() {
            [single] => Ok(found(single).unwrap_or_else(|| (single.to_string(), None))),
            [] => Err(unknown_column(&written, &scoped, registry)),
            many => Err(ValidationError::AmbiguousColumn {
                column: written,
                candidates: many.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }
}

fn unknown_column(column: &str, resolved: &str, registry: &ColumnRegistry) -> ValidationError {
    ValidationError::UnknownColumn {
        column: column.to_string(),
        resolved: resolved.to_string(),
        available: registry.names(),
    }
}
