//! CSV and JSON rendering of evaluated test tables.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::records::TestTable;

/// Writes the present columns of `table` as CSV, blanks for undefined values.
pub fn write_tests_csv<W: Write>(writer: W, table: &TestTable) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    writer.write_record(table.columns.iter().map(|c| c.as_str()))?;
    for record in &table.records {
        writer.write_record(
            table
                .columns
                .iter()
                .map(|c| record.cell(*c).to_string()),
        )?;
    }
    writer.flush().map_err(|e| Error::io("csv writer", e))?;
    Ok(())
}

/// Writes `table` to a CSV file at `path`, replacing any previous file.
pub fn write_tests_csv_file(path: &Path, table: &TestTable) -> Result<()> {
    debug!(path = %path.display(), rows = table.len(), "Writing tests CSV");
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    write_tests_csv(file, table)
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{TestColumn, TestRecord};
    use chrono::NaiveDate;

    fn table() -> TestTable {
        let ts = NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let mut record = TestRecord::new("70001-A", ts);
        record.dn_br = Some(12.5);
        TestTable::new(
            vec![TestColumn::Site, TestColumn::DnBr, TestColumn::Pass],
            vec![record],
        )
    }

    #[test]
    fn test_csv_has_header_and_blank_undefined() {
        let mut buf = Vec::new();
        write_tests_csv(&mut buf, &table()).unwrap();
        let content = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["site,dn_br,pass", "70001-A,12.5,"]);
    }

    #[test]
    fn test_csv_file_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.csv");
        write_tests_csv_file(&path, &table()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&serde_json::json!({ "rows": 1 })).unwrap();
    }
}
