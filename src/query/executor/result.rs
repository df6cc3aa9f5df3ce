// Runtime Values, Rows and Execution Errors
//
// This module defines the value and row types flowing through the engine and
// the errors raised while evaluating expressions against them.

use std::fmt;
use std::str::FromStr;

use linked_hash_map::LinkedHashMap;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::common::types::field_suffix;
use crate::query::parser::ParseError;

/// Runtime value. All numbers are decimals so chained transforms do not drift.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(Decimal),
    Text(String),
    Boolean(bool),
}

impl Value {
    /// Canonical textual form used for equality and grouping. NULL has none.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(n.normalize().to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Boolean(b) => Some(b.to_string()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Number(_) => "NUMBER",
            Value::Text(_) => "TEXT",
            Value::Boolean(_) => "BOOLEAN",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by conditions and Boolean coercion. NULL is false.
    pub fn truthy(&self) -> QueryResult<bool> {
        match self {
            Value::Null => Ok(false),
            Value::Boolean(b) => Ok(*b),
            Value::Number(n) => Ok(!n.is_zero()),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if trimmed.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Decimal::from_str(trimmed)
                        .map(|n| !n.is_zero())
                        .map_err(|_| QueryError::TypeConversion(format!("cannot interpret text '{}' as a boolean", s)))
                }
            }
        }
    }

    /// Interpret a raw extracted cell: empty is NULL, decimals become numbers
    pub fn from_cell(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match Decimal::from_str(trimmed) {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Number(n) => serializer.serialize_str(&n.normalize().to_string()),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

/// A row keyed by qualified column name. Column order is kept for display
/// only; equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Values in insertion order
    values: LinkedHashMap<String, Value>,
    /// Alias of the source the row was extracted from
    origin: Option<String>,
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self.values.iter().all(|(col, v)| other.values.get(col) == Some(v))
    }
}

impl Row {
    /// Create a new empty row
    pub fn new() -> Self {
        Row::default()
    }

    /// Create an empty row tagged with its source alias
    pub fn with_origin(alias: impl Into<String>) -> Self {
        Row {
            values: LinkedHashMap::new(),
            origin: Some(alias.into()),
        }
    }

    /// Create a row from `(column, value)` pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Row::new();
        for (col, val) in pairs {
            row.set(col.into(), val.into());
        }
        row
    }

    /// Get a value by exact column name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// The stored key matching `column` exactly or case-insensitively
    pub fn find_key(&self, column: &str) -> Option<&String> {
        self.values
            .keys()
            .find(|key| key.as_str() == column)
            .or_else(|| self.values.keys().find(|key| key.eq_ignore_ascii_case(column)))
    }

    /// Columns whose field part (after the first dot) matches `field`
    pub fn columns_with_suffix(&self, field: &str) -> Vec<&String> {
        self.values
            .keys()
            .filter(|key| field_suffix(key).is_some_and(|suffix| suffix.eq_ignore_ascii_case(field)))
            .collect()
    }

    /// Set a value for a column, keeping the position of an existing column
    pub fn set(&mut self, column: String, value: Value) {
        if let Some(slot) = self.values.get_mut(&column) {
            *slot = value;
        } else {
            self.values.insert(column, value);
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Get all columns in the row
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Get all values with their corresponding column names
    pub fn values_with_names(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn set_origin(&mut self, alias: Option<String>) {
        self.origin = alias;
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (col, val) in &self.values {
            map.serialize_entry(col, val)?;
        }
        map.end()
    }
}

/// Represents an expression evaluation or execution error
#[derive(Error, Debug)]
pub enum QueryError {
    /// Column reference could not be resolved against the row
    #[error("Column not found: '{column}'. Available columns: {}", .available.join(", "))]
    ColumnNotFound { column: String, available: Vec<String> },
    /// Bare column name matches more than one qualified column
    #[error("Ambiguous column '{column}' matches {}", .candidates.join(", "))]
    AmbiguousColumn { column: String, candidates: Vec<String> },
    /// Operator applied to incompatible operand types
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// Failed coercion to a declared column type
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Numeric overflow")]
    NumericOverflow,
    #[error("Unknown aggregate function: {0}")]
    UnknownAggregateFunction(String),
    /// AVG over a group without values when empty groups are not allowed
    #[error("{function} of '{target}' over a group without values")]
    EmptyAggregate { function: String, target: String },
    /// Expression text failed to parse
    #[error("Invalid expression '{expression}': {source}")]
    Parse {
        expression: String,
        #[source]
        source: ParseError,
    },
    /// Error raised while running one pipeline operation
    #[error("{context}: {source}")]
    Operation {
        context: String,
        #[source]
        source: Box<QueryError>,
    },
}

impl QueryError {
    /// Attach the offending operation to an error
    pub fn in_operation(self, context: impl Into<String>) -> QueryError {
        QueryError::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with operation context stripped
    pub fn root(&self) -> &QueryError {
        match self {
            QueryError::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for evaluation and execution
pub type QueryResult<T> = Result<T, QueryError>;
