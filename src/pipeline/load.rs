// Load Sinks
//
// Consumers of the final row sequence together with the declared load target.

use std::io::Write;

use log::info;

use crate::pipeline::error::{EtlError, EtlResult};
use crate::pipeline::model::LoadStep;
use crate::query::executor::result::Row;

/// A sink receiving the rows produced by a pipeline run
pub trait Loader {
    fn load(&mut self, target: &LoadStep, rows: &[Row]) -> EtlResult<()>;
}

/// Collects loaded rows in memory
#[derive(Debug, Default)]
pub struct MemoryLoader {
    target: Option<LoadStep>,
    rows: Vec<Row>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        MemoryLoader::default()
    }

    pub fn target(&self) -> Option<&LoadStep> {
        self.target.as_ref()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

impl Loader for MemoryLoader {
    fn load(&mut self, target: &LoadStep, rows: &[Row]) -> EtlResult<()> {
        self.target = Some(target.clone());
        self.rows.extend_from_slice(rows);
        Ok(())
    }
}

/// Renders loaded rows as a text table
pub struct ConsoleLoader<W: Write> {
    out: W,
}

impl<W: Write> ConsoleLoader<W> {
    pub fn new(out: W) -> Self {
        ConsoleLoader { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Loader for ConsoleLoader<W> {
    fn load(&mut self, target: &LoadStep, rows: &[Row]) -> EtlResult<()> {
        info!("Loading {} rows into {} '{}'", rows.len(), target.target_kind, target.target_name);
        writeln!(self.out, "{} {}", target.target_kind, target.target_name)
            .and_then(|_| write!(self.out, "{}", render_table(rows)))
            .map_err(|e| EtlError::Load(format!("cannot write to {}: {}", target.target_name, e)))
    }
}

/// Format rows as a table. Columns are the union of row columns in
/// first-seen order; cells a row lacks render as blank.
pub fn render_table(rows: &[Row]) -> String {
    let mut headers: Vec<&String> = Vec::new();
    for row in rows {
        for col in row.columns() {
            if !headers.contains(&col) {
                headers.push(col);
            }
        }
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    // Minimum width of 3 characters per column
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| cells.iter().map(|r| r[i].len()).fold(h.len(), usize::max).max(3))
        .collect();

    let mut out = String::new();
    if !headers.is_empty() {
        out.push('|');
        for (header, width) in headers.iter().zip(&widths) {
            out.push_str(&format!(" {:<width$} |", header, width = width));
        }
        out.push('\n');

        out.push('+');
        for width in &widths {
            out.push_str(&format!("{:-<width$}+", "", width = width + 2));
        }
        out.push('\n');

        for row in &cells {
            out.push('|');
            for (cell, width) in row.iter().zip(&widths) {
                out.push_str(&format!(" {:<width$} |", cell, width = width));
            }
            out.push('\n');
        }
    }
    out.push_str(&format!("({} rows)\n", rows.len()));
    out
}
