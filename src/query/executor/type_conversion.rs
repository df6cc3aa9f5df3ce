// Type Conversion Utilities for the Execution Engine
//
// Coerces computed values to the type declared on an operation target.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::catalog::schema::ColumnType;
use crate::query::executor::result::{QueryError, QueryResult, Value};

/// Convert a value to the declared target type.
///
/// `Int` truncates toward zero, `Decimal` parses text, `String` renders the
/// canonical text and `Boolean` applies truthiness. NULL cannot become a
/// number; it stays NULL for `String` and is false for `Boolean`.
pub fn convert(value: Value, target_type: ColumnType) -> QueryResult<Value> {
    match target_type {
        ColumnType::Int => to_number(value, target_type).map(|n| Value::Number(n.trunc())),
        ColumnType::Decimal => to_number(value, target_type).map(Value::Number),
        ColumnType::String => Ok(match value.canonical() {
            Some(text) => Value::Text(text),
            None => Value::Null,
        }),
        ColumnType::Boolean => value.truthy().map(Value::Boolean),
    }
}

/// Cast only when a target type is declared
pub fn cast_to_type_if_needed(value: Value, target_type: Option<ColumnType>) -> QueryResult<Value> {
    match target_type {
        Some(target) => convert(value, target),
        None => Ok(value),
    }
}

fn to_number(value: Value, target_type: ColumnType) -> QueryResult<Decimal> {
    match value {
        Value::Number(n) => Ok(n),
        Value::Boolean(b) => Ok(if b { Decimal::ONE } else { Decimal::ZERO }),
        Value::Text(s) => Decimal::from_str(s.trim()).map_err(|_| {
            QueryError::TypeConversion(format!("cannot convert text '{}' to {}", s, target_type))
        }),
        Value::Null => Err(QueryError::TypeConversion(format!("cannot convert NULL to {}", target_type))),
    }
}

/// Coerce a value to a number for aggregation; NULL yields None
pub fn coerce_to_number(value: &Value) -> QueryResult<Option<Decimal>> {
    match value {
        Value::Null => Ok(None),
        other => to_number(other.clone(), ColumnType::Decimal).map(Some),
    }
}
