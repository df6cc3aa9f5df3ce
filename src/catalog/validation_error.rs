use thiserror::Error;

use crate::query::parser::ParseError;

/// Errors raised by the static pipeline check
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Pipeline must have a {0} step")]
    MissingPipelineStep(String),
    #[error("Source block refers to unknown source alias '{0}'")]
    UnknownSourceAlias(String),
    #[error("Extract source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Column '{column}' (resolved as '{resolved}') does not exist. Available columns: {}", .available.join(", "))]
    UnknownColumn {
        column: String,
        resolved: String,
        available: Vec<String>,
    },
    #[error("Column '{column}' is ambiguous between {}", .candidates.join(", "))]
    AmbiguousColumn { column: String, candidates: Vec<String> },
    #[error("Duplicate column '{0}' in the same scope")]
    DuplicateColumn(String),
    #[error("Column name '{0}' is a reserved word")]
    ReservedColumnName(String),
    #[error("Unknown aggregate function: {0}")]
    UnknownAggregateFunction(String),
    #[error("Column '{column}' is {actual}, but {expected} expected")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
    #[error("Invalid expression '{expression}': {source}")]
    Parse {
        expression: String,
        #[source]
        source: ParseError,
    },
}

/// Validation result
pub type ValidationResult<T> = Result<T, ValidationError>;
