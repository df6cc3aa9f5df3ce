// Row Extraction
//
// Reads aliased sources into row batches and merges batches into a single
// stream padded with NULL for columns that only other sources provide.

use std::fs;
use std::path::Path;

use linked_hash_map::LinkedHashMap;
use log::debug;

use crate::common::types::qualify;
use crate::pipeline::error::{EtlError, EtlResult};
use crate::pipeline::model::ExtractSource;
use crate::query::executor::result::{Row, Value};

/// Rows extracted from one source alias
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub alias: String,
    /// Qualified column names in header order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl SourceBatch {
    pub fn new(alias: &str) -> Self {
        SourceBatch {
            alias: alias.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a batch from already-qualified rows; columns follow first appearance
    pub fn from_rows(alias: &str, rows: Vec<Row>) -> Self {
        let mut batch = SourceBatch::new(alias);
        for row in &rows {
            for col in row.columns() {
                batch.add_column(col);
            }
        }
        batch.rows = rows;
        batch
    }

    fn add_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }
}

/// A supplier of rows for one alias
pub trait RowSource {
    fn alias(&self) -> &str;

    fn extract(&self) -> EtlResult<SourceBatch>;
}

/// CSV file source. Cells are split on commas without quoting rules.
#[derive(Debug, Clone)]
pub struct CsvSource {
    alias: String,
    locations: Vec<String>,
}

impl CsvSource {
    pub fn new(alias: &str, locations: Vec<String>) -> Self {
        CsvSource {
            alias: alias.to_string(),
            locations,
        }
    }

    pub fn from_definition(source: &ExtractSource) -> Self {
        CsvSource::new(&source.alias, source.locations.clone())
    }

    fn read_file(&self, path: &str, batch: &mut SourceBatch) -> EtlResult<()> {
        let text = read_source(path)?;
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let Some(header_line) = lines.next() else {
            return Err(EtlError::Extract(format!("{} has no header line", path)));
        };
        let columns: Vec<String> = split_cells(header_line)
            .iter()
            .map(|header| qualify(&self.alias, header))
            .collect();
        for col in &columns {
            batch.add_column(col);
        }

        let mut count = 0usize;
        for (index, line) in lines.enumerate() {
            let cells = split_cells(line);
            if cells.len() != columns.len() {
                return Err(EtlError::Extract(format!(
                    "{} record {}: expected {} fields, found {}",
                    path,
                    index + 1,
                    columns.len(),
                    cells.len()
                )));
            }
            let mut row = Row::with_origin(self.alias.as_str());
            for (col, cell) in columns.iter().zip(&cells) {
                row.set(col.clone(), Value::from_cell(cell));
            }
            batch.rows.push(row);
            count += 1;
        }

        debug!("Read {} rows from {} as '{}'", count, path, self.alias);
        Ok(())
    }
}

impl RowSource for CsvSource {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn extract(&self) -> EtlResult<SourceBatch> {
        let mut batch = SourceBatch::new(&self.alias);
        for path in &self.locations {
            self.read_file(path, &mut batch)?;
        }
        // Files of one alias may disagree on columns
        let columns = batch.columns.clone();
        for row in &mut batch.rows {
            pad_row(row, &columns);
        }
        Ok(batch)
    }
}

/// Read only the header line of a CSV file, returning unqualified names
pub fn read_csv_header(path: impl AsRef<Path>) -> EtlResult<Vec<String>> {
    let path = path.as_ref();
    let text = read_source(&path.to_string_lossy())?;
    let header = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| EtlError::Extract(format!("{} has no header line", path.display())))?;
    Ok(split_cells(header))
}

fn read_source(path: &str) -> EtlResult<String> {
    fs::read_to_string(path).map_err(|e| EtlError::Extract(format!("cannot read source {}: {}", path, e)))
}

fn split_cells(line: &str) -> Vec<String> {
    line.split(',')
        .map(|cell| cell.trim().trim_matches('"').to_string())
        .collect()
}

fn pad_row(row: &mut Row, columns: &[String]) {
    if columns.iter().all(|col| row.contains(col)) && row.len() == columns.len() {
        return;
    }
    let mut padded = Row::new();
    padded.set_origin(row.origin().map(str::to_string));
    for col in columns {
        let value = row.get(col).cloned().unwrap_or(Value::Null);
        padded.set(col.clone(), value);
    }
    // Keep anything the column list did not cover
    for (col, value) in row.values_with_names() {
        if !padded.contains(col) {
            padded.set(col.clone(), value.clone());
        }
    }
    *row = padded;
}

/// Union of column names in first-seen order
fn column_union<'a>(names: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut union: LinkedHashMap<String, ()> = LinkedHashMap::new();
    for col in names {
        if !union.contains_key(col) {
            union.insert(col.clone(), ());
        }
    }
    union.into_iter().map(|(col, _)| col).collect()
}

/// Pad every row to the union of the stream's columns, NULL where missing
pub fn pad_rows(rows: &mut [Row]) {
    let columns = column_union(rows.iter().flat_map(|row| row.columns()));
    for row in rows.iter_mut() {
        pad_row(row, &columns);
    }
}

/// Merge batches into one stream. Every row carries the union of all
/// columns, NULL where its source lacks them, and is tagged with its alias.
pub fn merge_batches(batches: Vec<SourceBatch>) -> Vec<Row> {
    let columns = column_union(
        batches
            .iter()
            .flat_map(|batch| batch.columns.iter().chain(batch.rows.iter().flat_map(|row| row.columns()))),
    );

    let mut merged = Vec::new();
    for batch in batches {
        for mut row in batch.rows {
            if row.origin().is_none() {
                row.set_origin(Some(batch.alias.clone()));
            }
            pad_row(&mut row, &columns);
            merged.push(row);
        }
    }
    merged
}
