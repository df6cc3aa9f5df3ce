// End-to-End Pipeline Tests
//
// Extract from CSV files, transform, aggregate and load through the engine.

use anyhow::Result;

#[path = "../common/mod.rs"]
mod common;
use common::{column_text, Fixture, DISCOUNT_CSV, SALES_CSV};

use etlflow::catalog::ColumnType;
use etlflow::pipeline::{
    merge_batches, ConsoleLoader, CsvSource, ExtractSource, ExtractStep, LoadStep, MemoryLoader, Operation,
    Pipeline, RowSource, TransformStep,
};
use etlflow::query::executor::result::{Row, Value};
use etlflow::{EngineConfig, EtlError, ExecutionEngine, ValidationError};

fn csv_pipeline(fixture: &Fixture, transform: TransformStep) -> Result<Pipeline> {
    let sales = fixture.write("sales.csv", SALES_CSV)?.to_string_lossy().into_owned();
    let discount = fixture.write("discount.csv", DISCOUNT_CSV)?.to_string_lossy().into_owned();
    Ok(Pipeline::new("report")
        .with_version("2")
        .with_extract(ExtractStep::new(vec![
            ExtractSource::new("sales", &[sales.as_str()]),
            ExtractSource::new("discount", &[discount.as_str()]),
        ]))
        .with_transform(transform)
        .with_load(LoadStep::new("memory", "report")))
}

#[test]
fn test_merge_pads_missing_columns() -> Result<()> {
    let fixture = Fixture::new()?;
    let sales = fixture.write("sales.csv", SALES_CSV)?;
    let discount = fixture.write("discount.csv", DISCOUNT_CSV)?;

    let batches = vec![
        CsvSource::new("sales", vec![sales.to_string_lossy().into_owned()]).extract()?,
        CsvSource::new("discount", vec![discount.to_string_lossy().into_owned()]).extract()?,
    ];
    let rows = merge_batches(batches);

    assert_eq!(rows.len(), 5);
    let columns: Vec<&String> = rows[0].columns().collect();
    assert_eq!(
        columns,
        vec!["sales.product", "sales.qty", "sales.price", "discount.product", "discount.rate"]
    );
    assert!(rows.iter().all(|row| row.len() == 5));
    assert_eq!(rows[0].get("discount.rate"), Some(&Value::Null));
    assert_eq!(rows[4].get("sales.qty"), Some(&Value::Null));
    assert_eq!(rows[4].origin(), Some("discount"));
    Ok(())
}

#[test]
fn test_run_revenue_report() -> Result<()> {
    let fixture = Fixture::new()?;
    let transform = TransformStep::new(vec![
        Operation::filter("sales.qty != NULL"),
        Operation::map("sales.qty * sales.price", "revenue", Some(ColumnType::Decimal)),
        Operation::aggregate("SUM", "revenue", &["sales.product"], "total", None),
    ])
    .with_block("sales", vec![Operation::filter("NOT product = \"C\"")]);
    let pipeline = csv_pipeline(&fixture, transform)?;

    let mut loader = MemoryLoader::new();
    let loaded = ExecutionEngine::default().run(&pipeline, &mut loader)?;

    assert_eq!(loaded, 2);
    assert_eq!(loader.target().map(|t| t.target_name.as_str()), Some("report"));
    assert_eq!(column_text(loader.rows(), "sales.product"), vec!["A", "B"]);
    assert_eq!(column_text(loader.rows(), "total"), vec!["20", "20"]);
    Ok(())
}

#[test]
fn test_run_to_console() -> Result<()> {
    let fixture = Fixture::new()?;
    let transform = TransformStep::new(vec![Operation::aggregate(
        "COUNT",
        "sales.qty",
        &["sales.product"],
        "orders",
        None,
    )]);
    let mut pipeline = csv_pipeline(&fixture, transform)?;
    pipeline.load = Some(LoadStep::new("console", "stdout"));

    let mut loader = ConsoleLoader::new(Vec::new());
    ExecutionEngine::default().run(&pipeline, &mut loader)?;
    let text = String::from_utf8(loader.into_inner())?;

    assert!(text.starts_with("console stdout\n"));
    assert!(text.contains("| sales.product | orders |"));
    // the discount rows form a NULL group with no counted values
    assert!(text.contains(&format!("| {:<13} | {:<6} |", "NULL", "0")));
    assert!(text.ends_with("(3 rows)\n"));
    Ok(())
}

#[test]
fn test_pipeline_from_json_file() -> Result<()> {
    let fixture = Fixture::new()?;
    fixture.write("sales.csv", SALES_CSV)?;
    let path = fixture.write(
        "pipeline.json",
        r#"{
            "name": "bulk",
            "extract": { "sources": [ { "alias": "sales", "locations": ["sales.csv"] } ] },
            "transform": {
                "operations": [
                    {
                        "kind": "conditional_map",
                        "condition": "sales.qty >= 3",
                        "true_expression": "\"bulk\"",
                        "false_expression": "\"single\"",
                        "target_column": "size",
                        "target_type": "STRING"
                    },
                    { "kind": "filter", "condition": "size = \"bulk\"" }
                ]
            },
            "load": { "target_kind": "memory", "target_name": "bulk_orders" }
        }"#,
    )?;

    let pipeline = Pipeline::from_json_file(&path)?;
    assert_eq!(pipeline.source_aliases(), vec!["sales"]);

    let mut loader = MemoryLoader::new();
    ExecutionEngine::default().run(&pipeline, &mut loader)?;
    assert_eq!(column_text(loader.rows(), "sales.qty"), vec!["3", "5"]);
    assert!(loader.rows().iter().all(|row| row.get("size") == Some(&Value::from("bulk"))));
    Ok(())
}

#[test]
fn test_ragged_record_fails_extract() -> Result<()> {
    let fixture = Fixture::new()?;
    let path = fixture.write("broken.csv", "product,qty\nA,1\nB\n")?;
    let err = CsvSource::new("broken", vec![path.to_string_lossy().into_owned()])
        .extract()
        .unwrap_err();
    assert!(matches!(err, EtlError::Extract(_)));
    Ok(())
}

#[test]
fn test_missing_source_fails_validation() {
    let pipeline = Pipeline::new("missing")
        .with_extract(ExtractStep::new(vec![ExtractSource::new("sales", &["/nonexistent/sales.csv"])]))
        .with_transform(TransformStep::default())
        .with_load(LoadStep::new("memory", "out"));
    let mut loader = MemoryLoader::new();
    let err = ExecutionEngine::default().run(&pipeline, &mut loader).unwrap_err();
    assert!(matches!(err, EtlError::Validation(ValidationError::SourceUnavailable(_))));

    let engine = ExecutionEngine::new(EngineConfig::default().with_validation(false));
    assert!(matches!(engine.run(&pipeline, &mut loader), Err(EtlError::Extract(_))));
}

#[test]
fn test_rows_without_transform_pass_through() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut pipeline = csv_pipeline(&fixture, TransformStep::default())?;
    pipeline.transform = None;

    let engine = ExecutionEngine::new(EngineConfig::default().with_validation(false));
    let rows = engine.execute(&pipeline, engine.extract(&pipeline)?)?;
    assert_eq!(rows.len(), 5);
    assert_eq!(
        rows[0],
        Row::from_pairs([
            ("sales.product", Value::from("A")),
            ("sales.qty", Value::from(3)),
            ("sales.price", Value::from_cell("2.50")),
            ("discount.product", Value::Null),
            ("discount.rate", Value::Null),
        ])
    );
    Ok(())
}
