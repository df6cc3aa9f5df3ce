// Aggregation Operators Module
//
// This module contains the grouped aggregation stage and the supported
// aggregate functions (SUM, AVG, MIN, MAX, COUNT).

mod hash;

use std::fmt;
use std::str::FromStr;

pub use hash::{reduce, HashAggregate};

use crate::query::executor::result::QueryError;

/// Types of supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateType {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateType {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateType::Count => "COUNT",
            AggregateType::Sum => "SUM",
            AggregateType::Avg => "AVG",
            AggregateType::Min => "MIN",
            AggregateType::Max => "MAX",
        }
    }

    /// Whether the function needs numeric input (COUNT accepts any value)
    pub fn requires_numeric(&self) -> bool {
        !matches!(self, AggregateType::Count)
    }
}

impl FromStr for AggregateType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COUNT" => Ok(AggregateType::Count),
            "SUM" => Ok(AggregateType::Sum),
            "AVG" => Ok(AggregateType::Avg),
            "MIN" => Ok(AggregateType::Min),
            "MAX" => Ok(AggregateType::Max),
            _ => Err(QueryError::UnknownAggregateFunction(s.to_string())),
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
