// Expression Evaluation Utility
//
// Evaluates a parsed expression against a single row. Evaluation never
// mutates the row.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::common::types::qualify;
use crate::query::executor::result::{QueryError, QueryResult, Row, Value};
use crate::query::parser::ast::{BinaryOperator, ColumnReference, Expression, Literal, UnaryOperator};
use crate::query::parser::parse;

/// Parse an expression string, attaching the text to any parse error
pub fn compile(expression_text: &str) -> QueryResult<Expression> {
    parse(expression_text).map_err(|source| QueryError::Parse {
        expression: expression_text.to_string(),
        source,
    })
}

/// Evaluate an expression string against a row with default settings
pub fn evaluate(expression_text: &str, row: &Row) -> QueryResult<Value> {
    Evaluator::new().evaluate(expression_text, row)
}

/// Expression evaluator with an optional source scope.
///
/// Inside a source block the scope alias is tried first for bare column names.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator<'a> {
    scope: Option<&'a str>,
    null_short_circuit: bool,
}

impl<'a> Evaluator<'a> {
    pub fn new() -> Self {
        Evaluator::default()
    }

    pub fn with_scope(mut self, scope: Option<&'a str>) -> Self {
        self.scope = scope;
        self
    }

    /// Arithmetic and ordering with a NULL operand yield NULL instead of failing
    pub fn with_null_short_circuit(mut self, enabled: bool) -> Self {
        self.null_short_circuit = enabled;
        self
    }

    pub fn scope(&self) -> Option<&'a str> {
        self.scope
    }

    /// Parse and evaluate an expression string
    pub fn evaluate(&self, expression_text: &str, row: &Row) -> QueryResult<Value> {
        let expr = compile(expression_text)?;
        self.evaluate_expression(&expr, row)
    }

    /// Evaluate a parsed expression in the context of a single row
    pub fn evaluate_expression(&self, expr: &Expression, row: &Row) -> QueryResult<Value> {
        match expr {
            Expression::Literal(lit) => Ok(match lit {
                Literal::Null => Value::Null,
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::Text(s.clone()),
                Literal::Boolean(b) => Value::Boolean(*b),
            }),
            Expression::Column(col_ref) => self.resolve_column(col_ref, row).cloned(),
            Expression::UnaryOp { op, expr } => {
                let val = self.evaluate_expression(expr, row)?;
                match op {
                    UnaryOperator::Not => Ok(Value::Boolean(!val.truthy()?)),
                    UnaryOperator::Minus => match val {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        Value::Null if self.null_short_circuit => Ok(Value::Null),
                        other => Err(QueryError::TypeMismatch(format!(
                            "unary minus requires a number, got {} in {}",
                            other.type_name(),
                            expr
                        ))),
                    },
                }
            }
            Expression::BinaryOp { left, op, right } => match op {
                // Logical operators only evaluate the right side when needed
                BinaryOperator::And => {
                    if !self.evaluate_expression(left, row)?.truthy()? {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(Value::Boolean(self.evaluate_expression(right, row)?.truthy()?))
                }
                BinaryOperator::Or => {
                    if self.evaluate_expression(left, row)?.truthy()? {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(Value::Boolean(self.evaluate_expression(right, row)?.truthy()?))
                }
                _ => {
                    let left_val = self.evaluate_expression(left, row)?;
                    let right_val = self.evaluate_expression(right, row)?;
                    self.apply_binary(*op, left_val, right_val, expr)
                }
            },
        }
    }

    fn apply_binary(&self, op: BinaryOperator, left: Value, right: Value, expr: &Expression) -> QueryResult<Value> {
        match op {
            BinaryOperator::Equals => Ok(Value::Boolean(values_equal(&left, &right))),
            BinaryOperator::NotEquals => Ok(Value::Boolean(!values_equal(&left, &right))),
            BinaryOperator::Contains => Ok(Value::Boolean(match (left.canonical(), right.canonical()) {
                (Some(haystack), Some(needle)) => haystack.contains(&needle),
                _ => false,
            })),
            BinaryOperator::LessThan
            | BinaryOperator::GreaterThan
            | BinaryOperator::LessEquals
            | BinaryOperator::GreaterEquals => {
                let (l, r) = match (&left, &right) {
                    (Value::Number(l), Value::Number(r)) => (*l, *r),
                    _ if self.null_short_circuit && (left.is_null() || right.is_null()) => return Ok(Value::Null),
                    _ => return Err(mismatch(op, &left, &right, expr)),
                };
                let ordering = l.cmp(&r);
                Ok(Value::Boolean(match op {
                    BinaryOperator::LessThan => ordering == Ordering::Less,
                    BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                    BinaryOperator::LessEquals => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Multiply | BinaryOperator::Divide => {
                let (l, r) = match (&left, &right) {
                    (Value::Number(l), Value::Number(r)) => (*l, *r),
                    _ if self.null_short_circuit && (left.is_null() || right.is_null()) => return Ok(Value::Null),
                    _ => return Err(mismatch(op, &left, &right, expr)),
                };
                arithmetic(op, l, r).map(Value::Number)
            }
            BinaryOperator::And => Ok(Value::Boolean(left.truthy()? && right.truthy()?)),
            BinaryOperator::Or => Ok(Value::Boolean(left.truthy()? || right.truthy()?)),
        }
    }

    /// Resolve a column reference against the row.
    ///
    /// Qualified names match their key, then the bare field for rows whose
    /// keys are not yet qualified. Bare names try the scope alias, the literal
    /// key and finally a unique `<alias>.<name>` suffix match.
    pub fn resolve_column<'r>(&self, col_ref: &ColumnReference, row: &'r Row) -> QueryResult<&'r Value> {
        let key = self.resolve_column_key(col_ref, row)?;
        row.get(key).ok_or_else(|| column_not_found(key, row))
    }

    /// The row key a column reference resolves to
    pub fn resolve_column_key<'r>(&self, col_ref: &ColumnReference, row: &'r Row) -> QueryResult<&'r String> {
        let full_name = col_ref.full_name();

        if col_ref.is_qualified() {
            return row
                .find_key(&full_name)
                .or_else(|| row.find_key(&col_ref.name))
                .ok_or_else(|| column_not_found(&full_name, row));
        }

        if let Some(alias) = self.scope {
            if let Some(key) = row.find_key(&qualify(alias, &col_ref.name)) {
                return Ok(key);
            }
        }

        if let Some(key) = row.find_key(&col_ref.name) {
            return Ok(key);
        }

        let candidates = row.columns_with_suffix(&col_ref.name);
        match candidates.as_slice() {
            [single] => Ok(*single),
            [] => Err(column_not_found(&full_name, row)),
            many => Err(QueryError::AmbiguousColumn {
                column: full_name,
                candidates: many.iter().map(|c| c.to_string()).collect(),
            }),
        }
    }
}

/// Equality over canonical text; NULL only equals NULL
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.canonical(), right.canonical()) {
        (None, None) => true,
        (Some(l), Some(r)) => {
            if matches!(left, Value::Boolean(_)) || matches!(right, Value::Boolean(_)) {
                l.eq_ignore_ascii_case(&r)
            } else {
                l == r
            }
        }
        _ => false,
    }
}

fn arithmetic(op: BinaryOperator, l: Decimal, r: Decimal) -> QueryResult<Decimal> {
    let result = match op {
        BinaryOperator::Plus => l.checked_add(r),
        BinaryOperator::Minus => l.checked_sub(r),
        BinaryOperator::Multiply => l.checked_mul(r),
        _ => {
            if r.is_zero() {
                return Err(QueryError::DivisionByZero);
            }
            l.checked_div(r)
        }
    };
    result.ok_or(QueryError::NumericOverflow)
}

fn mismatch(op: BinaryOperator, left: &Value, right: &Value, expr: &Expression) -> QueryError {
    QueryError::TypeMismatch(format!(
        "operator '{}' requires numbers, got {} and {} in {}",
        op.symbol(),
        left.type_name(),
        right.type_name(),
        expr
    ))
}

fn column_not_found(column: &str, row: &Row) -> QueryError {
    QueryError::ColumnNotFound {
        column: column.to_string(),
        available: row.columns().cloned().collect(),
    }
}
