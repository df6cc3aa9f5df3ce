// Aggregation Integration Tests
//
// Grouped reductions run through the engine and directly through the operator.

use anyhow::Result;

#[path = "../common/mod.rs"]
mod common;
use common::{batch, column_text, sales_batch};

use etlflow::catalog::ColumnType;
use etlflow::pipeline::{merge_batches, ExtractSource, ExtractStep, LoadStep, Operation, Pipeline, TransformStep};
use etlflow::query::executor::expression_eval::Evaluator;
use etlflow::query::executor::operators::{reduce, AggregateType};
use etlflow::query::executor::result::{QueryError, Row, Value};
use etlflow::{AggregateMode, EngineConfig, EtlError, ExecutionEngine};

fn pipeline(operations: Vec<Operation>) -> Pipeline {
    Pipeline::new("totals")
        .with_extract(ExtractStep::new(vec![ExtractSource::new("sales", &[])]))
        .with_transform(TransformStep::new(operations))
        .with_load(LoadStep::new("memory", "out"))
}

#[test]
fn test_sum_by_product() -> Result<()> {
    let ops = vec![Operation::aggregate("SUM", "sales.qty", &["sales.product"], "total", Some(ColumnType::Int))];
    let rows = ExecutionEngine::default().execute(&pipeline(ops), vec![sales_batch()])?;
    assert_eq!(
        rows,
        vec![
            Row::from_pairs([("sales.product", Value::from("A")), ("total", Value::from(8))]),
            Row::from_pairs([("sales.product", Value::from("B")), ("total", Value::from(2))]),
        ]
    );
    Ok(())
}

#[test]
fn test_narrow_mode_emits_one_row_per_aggregate() -> Result<()> {
    let ops = vec![
        Operation::aggregate("COUNT", "sales.qty", &["sales.product"], "orders", None),
        Operation::aggregate("MAX", "sales.qty", &["sales.product"], "largest", None),
    ];
    let rows = ExecutionEngine::default().execute(&pipeline(ops), vec![sales_batch()])?;
    assert_eq!(rows.len(), 4);
    assert_eq!(column_text(&rows, "orders"), vec!["2", "1", "NULL", "NULL"]);
    assert_eq!(column_text(&rows, "largest"), vec!["NULL", "NULL", "5", "2"]);
    Ok(())
}

#[test]
fn test_wide_mode_merges_matching_group_by() -> Result<()> {
    let ops = vec![
        Operation::aggregate("COUNT", "sales.qty", &["sales.product"], "orders", None),
        Operation::aggregate("AVG", "sales.qty", &["SALES.PRODUCT"], "mean", None),
        Operation::aggregate("SUM", "sales.qty", &[], "grand", None),
    ];
    let engine = ExecutionEngine::new(EngineConfig::default().with_aggregate_mode(AggregateMode::Wide));
    let rows = engine.execute(&pipeline(ops), vec![sales_batch()])?;

    assert_eq!(rows.len(), 3);
    assert_eq!(column_text(&rows[..2], "orders"), vec!["2", "1"]);
    assert_eq!(column_text(&rows[..2], "mean"), vec!["4", "2"]);
    assert_eq!(rows[2], Row::from_pairs([("grand", 10)]));
    Ok(())
}

#[test]
fn test_nulls_are_skipped() -> Result<()> {
    let input = batch(
        "sales",
        vec![
            vec![("sales.product", Value::from("A")), ("sales.qty", Value::from(4))],
            vec![("sales.product", Value::from("A")), ("sales.qty", Value::Null)],
            vec![("sales.product", Value::Null), ("sales.qty", Value::from(6))],
        ],
    );
    let ops = vec![
        Operation::aggregate("COUNT", "sales.qty", &["sales.product"], "n", None),
        Operation::aggregate("AVG", "sales.qty", &[], "mean", None),
    ];
    let rows = reduce(&merge_batches(vec![input]), &ops, &Evaluator::new(), &EngineConfig::default())?;

    // NULL group keys form their own group
    assert_eq!(column_text(&rows, "sales.product"), vec!["A", "NULL", "NULL"]);
    assert_eq!(column_text(&rows, "n"), vec!["1", "1", "NULL"]);
    assert_eq!(column_text(&rows, "mean"), vec!["NULL", "NULL", "5"]);
    Ok(())
}

#[test]
fn test_avg_over_empty_group() -> Result<()> {
    let input = batch("sales", vec![vec![("sales.product", Value::from("A")), ("sales.qty", Value::Null)]]);
    let ops = vec![Operation::aggregate("AVG", "sales.qty", &["sales.product"], "mean", None)];
    let rows = merge_batches(vec![input]);

    let err = reduce(&rows, &ops, &Evaluator::new(), &EngineConfig::default()).unwrap_err();
    assert!(matches!(err.root(), QueryError::EmptyAggregate { .. }));

    let lenient = EngineConfig {
        allow_empty_groups: true,
        ..EngineConfig::default()
    };
    let out = reduce(&rows, &ops, &Evaluator::new(), &lenient)?;
    assert_eq!(column_text(&out, "mean"), vec!["0"]);
    Ok(())
}

#[test]
fn test_unknown_function() {
    let ops = vec![Operation::aggregate("MEDIAN", "sales.qty", &[], "m", None)];
    let engine = ExecutionEngine::new(EngineConfig::default().with_validation(false));
    match engine.execute(&pipeline(ops.clone()), vec![sales_batch()]) {
        Err(EtlError::Query(err)) => assert!(matches!(err.root(), QueryError::UnknownAggregateFunction(_))),
        other => panic!("expected an unknown function error, got {:?}", other),
    }
    assert!(ExecutionEngine::default().execute(&pipeline(ops), vec![sales_batch()]).is_err());
}

#[test]
fn test_function_names() {
    assert_eq!("avg".parse::<AggregateType>().ok(), Some(AggregateType::Avg));
    assert_eq!(AggregateType::Count.to_string(), "COUNT");
    assert!(!AggregateType::Count.requires_numeric());
}
