// Column Type Module
//
// Declared column types for extracted fields and computed targets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Int,
    Decimal,
    String,
    Boolean,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Decimal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::String => "STRING",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    /// Convert a string representation to a ColumnType
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(ColumnType::Int),
            "DECIMAL" | "NUMBER" | "NUMERIC" | "FLOAT" => Ok(ColumnType::Decimal),
            "STRING" | "TEXT" | "VARCHAR" => Ok(ColumnType::String),
            "BOOL" | "BOOLEAN" => Ok(ColumnType::Boolean),
            _ => Err(format!("Unknown column type: {}", s)),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Render an optional declared type; untyped columns show as ANY
pub fn describe_type(column_type: Option<ColumnType>) -> &'static str {
    column_type.map(|t| t.as_str()).unwrap_or("ANY")
}
