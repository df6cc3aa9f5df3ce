// Pipeline Definition Model
//
// Declarative pipeline data: extract sources, transform operations (global and
// per-source blocks) and the load target. Definitions are immutable once built.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::schema::ColumnType;
use crate::pipeline::error::{EtlError, EtlResult};

/// A complete pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub extract: Option<ExtractStep>,
    #[serde(default)]
    pub transform: Option<TransformStep>,
    #[serde(default)]
    pub load: Option<LoadStep>,
}

/// Sources to extract from, each under its own alias
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractStep {
    pub sources: Vec<ExtractSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractSource {
    pub alias: String,
    #[serde(default)]
    pub locations: Vec<String>,
    /// Explicit schema; when absent the header of the first location is read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnSchema>>,
}

/// Declared field of a source schema (unqualified name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformStep {
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub source_blocks: Vec<SourceBlock>,
}

/// Operations applying only to rows extracted from one source alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBlock {
    pub source_alias: String,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStep {
    pub target_kind: String,
    pub target_name: String,
}

/// Pipeline operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Computed column
    Map {
        expression: String,
        target_column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_type: Option<ColumnType>,
    },
    /// Computed column choosing between two expressions
    ConditionalMap {
        condition: String,
        true_expression: String,
        false_expression: String,
        target_column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_type: Option<ColumnType>,
    },
    /// Drop rows whose condition is false
    Filter { condition: String },
    /// Grouped reduction. The function name is checked by the validator.
    Aggregate {
        function: String,
        expression: String,
        #[serde(default)]
        group_by_columns: Vec<String>,
        target_column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_type: Option<ColumnType>,
    },
}

impl Operation {
    pub fn map(expression: &str, target_column: &str, target_type: Option<ColumnType>) -> Self {
        Operation::Map {
            expression: expression.to_string(),
            target_column: target_column.to_string(),
            target_type,
        }
    }

    pub fn conditional_map(
        condition: &str,
        true_expression: &str,
        false_expression: &str,
        target_column: &str,
        target_type: Option<ColumnType>,
    ) -> Self {
        Operation::ConditionalMap {
            condition: condition.to_string(),
            true_expression: true_expression.to_string(),
            false_expression: false_expression.to_string(),
            target_column: target_column.to_string(),
            target_type,
        }
    }

    pub fn filter(condition: &str) -> Self {
        Operation::Filter {
            condition: condition.to_string(),
        }
    }

    pub fn aggregate(
        function: &str,
        expression: &str,
        group_by_columns: &[&str],
        target_column: &str,
        target_type: Option<ColumnType>,
    ) -> Self {
        Operation::Aggregate {
            function: function.to_string(),
            expression: expression.to_string(),
            group_by_columns: group_by_columns.iter().map(|c| c.to_string()).collect(),
            target_column: target_column.to_string(),
            target_type,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Operation::Aggregate { .. })
    }

    /// Column written by the operation, if any
    pub fn target_column(&self) -> Option<&str> {
        match self {
            Operation::Map { target_column, .. }
            | Operation::ConditionalMap { target_column, .. }
            | Operation::Aggregate { target_column, .. } => Some(target_column),
            Operation::Filter { .. } => None,
        }
    }

    pub fn target_type(&self) -> Option<ColumnType> {
        match self {
            Operation::Map { target_type, .. }
            | Operation::ConditionalMap { target_type, .. }
            | Operation::Aggregate { target_type, .. } => *target_type,
            Operation::Filter { .. } => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Map { expression, target_column, .. } => {
                write!(f, "MAP {} TO {}", expression, target_column)
            }
            Operation::ConditionalMap {
                condition,
                true_expression,
                false_expression,
                target_column,
                ..
            } => write!(
                f,
                "IF {} THEN {} ELSE {} TO {}",
                condition, true_expression, false_expression, target_column
            ),
            Operation::Filter { condition } => write!(f, "FILTER {}", condition),
            Operation::Aggregate {
                function,
                expression,
                group_by_columns,
                target_column,
                ..
            } => {
                write!(f, "AGGREGATE {}({}) TO {}", function, expression, target_column)?;
                if !group_by_columns.is_empty() {
                    write!(f, " GROUP BY {}", group_by_columns.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

impl Pipeline {
    pub fn new(name: &str) -> Self {
        Pipeline {
            name: name.to_string(),
            version: String::new(),
            extract: None,
            transform: None,
            load: None,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_extract(mut self, extract: ExtractStep) -> Self {
        self.extract = Some(extract);
        self
    }

    pub fn with_transform(mut self, transform: TransformStep) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_load(mut self, load: LoadStep) -> Self {
        self.load = Some(load);
        self
    }

    /// Parse a pipeline from JSON text
    pub fn from_json_str(text: &str) -> EtlResult<Self> {
        serde_json::from_str(text).map_err(|e| EtlError::Config(format!("invalid pipeline definition: {}", e)))
    }

    /// Load a pipeline from a JSON file. Relative source locations are
    /// resolved against the file's directory.
    pub fn from_json_file(path: impl AsRef<Path>) -> EtlResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EtlError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut pipeline = Self::from_json_str(&text)?;
        if let Some(base) = path.parent() {
            pipeline.resolve_locations(base);
        }
        Ok(pipeline)
    }

    fn resolve_locations(&mut self, base: &Path) {
        let Some(extract) = self.extract.as_mut() else {
            return;
        };
        for source in &mut extract.sources {
            for location in &mut source.locations {
                let candidate = PathBuf::from(location.as_str());
                if candidate.is_relative() {
                    *location = base.join(candidate).to_string_lossy().into_owned();
                }
            }
        }
    }

    /// All source aliases in declaration order
    pub fn source_aliases(&self) -> Vec<&str> {
        self.extract
            .as_ref()
            .map(|e| e.sources.iter().map(|s| s.alias.as_str()).collect())
            .unwrap_or_default()
    }
}

impl ExtractStep {
    pub fn new(sources: Vec<ExtractSource>) -> Self {
        ExtractStep { sources }
    }
}

impl ExtractSource {
    pub fn new(alias: &str, locations: &[&str]) -> Self {
        ExtractSource {
            alias: alias.to_string(),
            locations: locations.iter().map(|l| l.to_string()).collect(),
            columns: None,
        }
    }

    /// Source with an explicit schema
    pub fn with_columns(mut self, columns: &[(&str, Option<ColumnType>)]) -> Self {
        self.columns = Some(
            columns
                .iter()
                .map(|(name, column_type)| ColumnSchema {
                    name: name.to_string(),
                    column_type: *column_type,
                })
                .collect(),
        );
        self
    }
}

impl TransformStep {
    pub fn new(operations: Vec<Operation>) -> Self {
        TransformStep {
            operations,
            source_blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, source_alias: &str, operations: Vec<Operation>) -> Self {
        self.source_blocks.push(SourceBlock {
            source_alias: source_alias.to_string(),
            operations,
        });
        self
    }
}

impl LoadStep {
    pub fn new(target_kind: &str, target_name: &str) -> Self {
        LoadStep {
            target_kind: target_kind.to_string(),
            target_name: target_name.to_string(),
        }
    }
}
