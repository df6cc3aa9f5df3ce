#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use etlflow::pipeline::SourceBatch;
use etlflow::query::executor::result::{Row, Value};

/// Directory holding CSV fixtures and pipeline files for one test
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Result<Self> {
        Ok(Fixture { dir: tempfile::tempdir()? })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file into the fixture directory and return its full path
    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }
}

pub const SALES_CSV: &str = "product,qty,price\nA,3,2.50\nA,5,2.50\nB,2,10\n";

pub const DISCOUNT_CSV: &str = "product,rate\nA,0.1\nB,0.2\n";

/// Batch of qualified rows for one alias
pub fn batch(alias: &str, rows: Vec<Vec<(&str, Value)>>) -> SourceBatch {
    SourceBatch::from_rows(alias, rows.into_iter().map(Row::from_pairs).collect())
}

/// The classic three-row sales batch: A:3, A:5, B:2
pub fn sales_batch() -> SourceBatch {
    batch(
        "sales",
        vec![
            vec![("sales.product", Value::from("A")), ("sales.qty", Value::from(3))],
            vec![("sales.product", Value::from("A")), ("sales.qty", Value::from(5))],
            vec![("sales.product", Value::from("B")), ("sales.qty", Value::from(2))],
        ],
    )
}

/// Render a column of every row as text, NULL for missing values
pub fn column_text(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter()
        .map(|r| r.get(column).map(|v| v.to_string()).unwrap_or_else(|| "NULL".to_string()))
        .collect()
}
