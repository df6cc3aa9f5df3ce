// Row Transform Integration Tests
//
// Map, conditional map and filter operations over merged source rows.

use anyhow::Result;

#[path = "../common/mod.rs"]
mod common;
use common::{batch, column_text, sales_batch};

use etlflow::catalog::ColumnType;
use etlflow::pipeline::{merge_batches, ExtractSource, ExtractStep, LoadStep, Operation, Pipeline, TransformStep};
use etlflow::query::executor::expression_eval::Evaluator;
use etlflow::query::executor::operators::{apply, RowTransform};
use etlflow::query::executor::result::{QueryError, Value};
use etlflow::{EngineConfig, EtlError, ExecutionEngine};

fn pipeline(transform: TransformStep) -> Pipeline {
    Pipeline::new("transform")
        .with_extract(ExtractStep::new(vec![
            ExtractSource::new("sales", &[]),
            ExtractSource::new("discount", &[]),
        ]))
        .with_transform(transform)
        .with_load(LoadStep::new("memory", "out"))
}

#[test]
fn test_failed_filter_skips_remaining_operations() -> Result<()> {
    // The map would divide by zero for qty = 2 if it ever ran on that row
    let ops = vec![
        Operation::filter("sales.qty > 2"),
        Operation::map("10 / (sales.qty - 2)", "ratio", None),
    ];
    let rows = apply(merge_batches(vec![sales_batch()]), &ops, &Evaluator::new())?;
    assert_eq!(rows.len(), 2);
    let ratios = column_text(&rows, "ratio");
    assert_eq!(ratios[0], "10");
    assert!(ratios[1].starts_with("3.3333"));
    Ok(())
}

#[test]
fn test_conditional_map_picks_branch() -> Result<()> {
    let ops = vec![Operation::conditional_map(
        "sales.qty >= 3",
        "\"bulk\"",
        "\"single\"",
        "size",
        Some(ColumnType::String),
    )];
    let rows = apply(merge_batches(vec![sales_batch()]), &ops, &Evaluator::new())?;
    assert_eq!(column_text(&rows, "size"), vec!["bulk", "bulk", "single"]);
    Ok(())
}

#[test]
fn test_target_type_is_applied() -> Result<()> {
    let ops = vec![Operation::map("sales.qty / 2", "half", Some(ColumnType::Int))];
    let rows = apply(merge_batches(vec![sales_batch()]), &ops, &Evaluator::new())?;
    assert_eq!(column_text(&rows, "half"), vec!["1", "2", "1"]);

    let ops = vec![Operation::map("sales.product", "code", Some(ColumnType::Decimal))];
    let err = apply(merge_batches(vec![sales_batch()]), &ops, &Evaluator::new()).unwrap_err();
    assert!(matches!(err.root(), QueryError::TypeConversion(_)));
    Ok(())
}

#[test]
fn test_scoped_transform_qualifies_targets() -> Result<()> {
    let transform = RowTransform::new(&[Operation::map("qty + 1", "next", None)], Some("sales"))?;
    let evaluator = Evaluator::new().with_scope(Some("sales"));
    let rows = transform.apply(merge_batches(vec![sales_batch()]), &evaluator)?;
    assert_eq!(column_text(&rows, "sales.next"), vec!["4", "6", "3"]);
    assert!(rows.iter().all(|row| !row.contains("next")));
    Ok(())
}

#[test]
fn test_source_blocks_only_see_their_rows() -> Result<()> {
    let discount = batch(
        "discount",
        vec![
            vec![("discount.product", Value::from("A")), ("discount.rate", Value::from_cell("0.1"))],
            vec![("discount.product", Value::from("B")), ("discount.rate", Value::from_cell("0.2"))],
        ],
    );
    let transform = TransformStep::new(vec![Operation::map("sales.qty", "copy", None)])
        .with_block("sales", vec![Operation::filter("qty > 2")])
        .with_block("discount", vec![Operation::map("rate * 100", "percent", Some(ColumnType::Int))]);

    let engine = ExecutionEngine::new(EngineConfig::default().with_validation(false));
    let rows = engine.execute(&pipeline(transform), vec![sales_batch(), discount])?;

    // Sales rows keep their order, discount rows follow
    assert_eq!(rows.len(), 4);
    assert_eq!(column_text(&rows, "sales.qty"), vec!["3", "5", "NULL", "NULL"]);
    assert_eq!(column_text(&rows, "discount.percent"), vec!["NULL", "NULL", "10", "20"]);
    assert_eq!(column_text(&rows, "copy"), vec!["3", "5", "NULL", "NULL"]);
    Ok(())
}

#[test]
fn test_errors_name_the_operation() {
    let ops = vec![Operation::map("sales.qty * sales.missing", "bad", None)];
    let err = apply(merge_batches(vec![sales_batch()]), &ops, &Evaluator::new()).unwrap_err();
    assert!(err.to_string().starts_with("MAP sales.qty * sales.missing TO bad"));
    assert!(matches!(err.root(), QueryError::ColumnNotFound { .. }));
}

#[test]
fn test_engine_rejects_invalid_pipeline_before_rows() {
    let transform = TransformStep::new(vec![Operation::filter("sales.qty > 2"), Operation::map("x.y", "z", None)]);
    let err = ExecutionEngine::default()
        .execute(&pipeline(transform), vec![sales_batch()])
        .unwrap_err();
    assert!(matches!(err, EtlError::Validation(_)));
}

#[test]
fn test_block_column_visible_to_global_ops_on_every_row() -> Result<()> {
    let discount = batch(
        "discount",
        vec![vec![("discount.product", Value::from("A")), ("discount.rate", Value::from_cell("0.1"))]],
    );
    let transform = TransformStep::new(vec![
        Operation::filter("sales.double = NULL OR sales.double > 4"),
        Operation::map("sales.double", "double_copy", None),
    ])
    .with_block("sales", vec![Operation::map("qty * 2", "double", None)]);

    // validation accepts sales.double, so execution must too
    let rows = ExecutionEngine::default().execute(&pipeline(transform), vec![sales_batch(), discount])?;
    assert_eq!(rows.len(), 3);
    assert_eq!(column_text(&rows, "sales.double"), vec!["6", "10", "NULL"]);
    assert_eq!(column_text(&rows, "double_copy"), vec!["6", "10", "NULL"]);
    assert_eq!(rows[2].get("sales.double"), Some(&Value::Null));
    Ok(())
}
