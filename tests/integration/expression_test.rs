use anyhow::Result;
use rust_decimal::Decimal;

use etlflow::query::executor::expression_eval::{evaluate, Evaluator};
use etlflow::query::executor::result::{QueryError, Row, Value};
use etlflow::query::executor::type_conversion::convert;
use etlflow::catalog::ColumnType;

#[test]
fn test_operator_precedence() -> Result<()> {
    let row = Row::new();
    assert_eq!(evaluate("2 + 3 * 4", &row)?, Value::from(14));
    assert_eq!(evaluate("(2 + 3) * 4", &row)?, Value::from(20));
    assert_eq!(evaluate("1 + 1 = 2 AND 2 * 2 = 4", &row)?, Value::from(true));
    assert_eq!(evaluate("FALSE AND FALSE OR TRUE", &row)?, Value::from(true));
    assert_eq!(evaluate("NOT 1 > 2 AND TRUE", &row)?, Value::from(true));
    assert_eq!(evaluate("((((7))))", &row)?, Value::from(7));
    Ok(())
}

#[test]
fn test_decimal_arithmetic_does_not_drift() -> Result<()> {
    let row = Row::from_pairs([("sales.price", Value::Number(Decimal::new(110, 2)))]);
    let mut value = evaluate("sales.price", &row)?;
    for _ in 0..10 {
        let step = Row::from_pairs([("v", value)]);
        value = evaluate("v * 3 / 3 + 0.1", &step)?;
    }
    assert_eq!(value.to_string(), "2.1");
    Ok(())
}

#[test]
fn test_operators_inside_strings_are_text() -> Result<()> {
    let row = Row::from_pairs([("t.label", "a + b = (c)")]);
    assert_eq!(evaluate("t.label = \"a + b = (c)\"", &row)?, Value::from(true));
    assert_eq!(evaluate("t.label CONTAINS \"= (\"", &row)?, Value::from(true));
    Ok(())
}

#[test]
fn test_equality_compares_canonical_text() -> Result<()> {
    let row = Row::from_pairs([("s.code", Value::from("5")), ("s.n", Value::from(5))]);
    assert_eq!(evaluate("s.code = s.n", &row)?, Value::from(true));
    assert_eq!(evaluate("s.code == 5.0", &row)?, Value::from(true));
    assert_eq!(evaluate("s.code <> 6", &row)?, Value::from(true));
    Ok(())
}

#[test]
fn test_ordering_needs_numbers() {
    let row = Row::from_pairs([("s.code", "5")]);
    assert!(matches!(evaluate("s.code > 1", &row), Err(QueryError::TypeMismatch(_))));
}

#[test]
fn test_unresolved_column_lists_available_keys() {
    let row = Row::from_pairs([("sales.qty", 1), ("sales.price", 2)]);
    let err = evaluate("sales.quantity * 2", &row).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("sales.quantity"));
    assert!(message.contains("sales.qty"));
    assert!(message.contains("sales.price"));
}

#[test]
fn test_bare_name_resolution() -> Result<()> {
    let row = Row::from_pairs([("qty", 1), ("sales.qty", 2), ("sales.price", 3)]);
    // literal key wins over suffix match
    assert_eq!(evaluate("qty", &row)?, Value::from(1));
    assert_eq!(evaluate("price", &row)?, Value::from(3));
    // the scope alias wins over both
    let scoped = Evaluator::new().with_scope(Some("sales"));
    assert_eq!(scoped.evaluate("qty", &row)?, Value::from(2));
    Ok(())
}

#[test]
fn test_evaluation_does_not_mutate_row() -> Result<()> {
    let row = Row::from_pairs([("a.x", 1)]);
    let before = row.clone();
    evaluate("a.x + 1 = 2", &row)?;
    assert_eq!(row, before);
    Ok(())
}

#[test]
fn test_conversions() -> Result<()> {
    assert!(matches!(
        convert(Value::from("abc"), ColumnType::Decimal),
        Err(QueryError::TypeConversion(_))
    ));
    assert_eq!(convert(Value::from(3), ColumnType::String)?, Value::from("3"));
    assert_eq!(convert(Value::from("7.9"), ColumnType::Int)?, Value::from(7));
    assert_eq!(convert(Value::from(2), ColumnType::Boolean)?, Value::from(true));
    Ok(())
}
