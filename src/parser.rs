//! CSV reader for the raw spreadsheet exports.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};

/// An export as read from disk: header labels and untyped cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Returns the cell at `row`/`col`, treating short rows as blank.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Adds (or overwrites) a column holding the same value on every row.
    pub fn with_constant_column(mut self, name: &str, value: &str) -> Self {
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.to_string());
                self.headers.len() - 1
            }
        };
        for row in &mut self.rows {
            if row.len() <= col {
                row.resize(col + 1, String::new());
            }
            row[col] = value.to_string();
        }
        self
    }
}

/// Reads a CSV export whose header sits on line `header_row` (0-based).
///
/// Lines above the header (report titles etc.) are skipped.
pub fn read_table<R: Read>(reader: R, header_row: usize) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records().skip(header_row);

    let headers = match records.next() {
        Some(record) => record?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Opens `path` and reads it with [`read_table`]. The handle is closed on return.
pub fn read_table_file(path: &Path, header_row: usize) -> Result<RawTable> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let table = read_table(file, header_row)?;
    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "Export loaded"
    );
    Ok(table)
}
