//! Two-dimensional named tables, the unit a report sink stores.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::records::{DATE_FORMAT, TIMESTAMP_FORMAT};

/// A single value in a sheet. `Empty` is a blank cell, never a zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn timestamp(value: NaiveDateTime) -> Self {
        Cell::Text(value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn date(value: NaiveDate) -> Self {
        Cell::Text(value.format(DATE_FORMAT).to_string())
    }

    pub fn count(value: usize) -> Self {
        Cell::Int(value as i64)
    }

    /// Renders a duration the way spreadsheet users read it: `2 days 03:00:00`.
    pub fn duration(value: Duration) -> Self {
        let sign = if value < Duration::zero() { "-" } else { "" };
        let total = value.num_seconds().abs();
        let days = total / 86_400;
        let rem = total % 86_400;
        Cell::Text(format!(
            "{sign}{days} days {:02}:{:02}:{:02}",
            rem / 3600,
            (rem % 3600) / 60,
            rem % 60
        ))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! cell_from_option {
    ($ty:ty, $variant:ident) => {
        impl From<Option<$ty>> for Cell {
            fn from(value: Option<$ty>) -> Self {
                value.map(Cell::$variant).unwrap_or(Cell::Empty)
            }
        }
    };
}

cell_from_option!(bool, Bool);
cell_from_option!(i64, Int);
cell_from_option!(f64, Float);
cell_from_option!(String, Text);

/// A named table: header row plus data rows of equal width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sheet {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Looks up a cell by the value in the first column and a column name.
    pub fn get(&self, index: &str, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.first().map(Cell::to_string).as_deref() == Some(index))
            .and_then(|row| row.get(col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_format() {
        let d = Duration::days(2) + Duration::hours(3) + Duration::seconds(5);
        assert_eq!(Cell::duration(d), Cell::text("2 days 03:00:05"));
        assert_eq!(Cell::duration(Duration::zero()), Cell::text("0 days 00:00:00"));
    }

    #[test]
    fn test_empty_serializes_as_null() {
        let row = vec![Cell::Empty, Cell::Int(3), Cell::text("a")];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[null,3,"a"]"#);
    }

    #[test]
    fn test_get_by_index_and_column() {
        let mut sheet = Sheet::new("S", ["date", "70001"]);
        sheet.push_row(vec![Cell::text("2023-01-01"), Cell::Float(5.0)]);
        assert_eq!(sheet.get("2023-01-01", "70001"), Some(&Cell::Float(5.0)));
        assert_eq!(sheet.get("2023-01-02", "70001"), None);
    }
}
