//! Normalization of raw exports into canonical records.
//!
//! Each export type has a fixed header vocabulary ([`mapping`]). Recognized
//! columns are renamed, everything else is dropped, and absent columns are
//! simply left out of the resulting table.

pub mod mapping;

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::parser::{RawTable, read_table_file};
use crate::records::{
    LocationRecord, Outcome, TIMESTAMP_FORMAT, TestColumn, TestRecord, TestTable, TicketRecord,
};
use mapping::{
    LOCATIONS_KEY_MAPPING, NON_OPERATIONAL_ORIGIN, OPERATIONAL_ORIGIN, TESTS_KEY_MAPPING,
    TICKETS_KEY_MAPPING,
};

/// Canonical name paired with the raw column index that feeds it.
type ResolvedColumns = Vec<(&'static str, usize)>;

/// Walks a mapping table in order and keeps the source columns that exist.
fn resolve_columns(raw: &RawTable, mapping: &'static [(&'static str, &'static str)]) -> ResolvedColumns {
    let mut resolved: ResolvedColumns = Vec::new();
    for &(source, canonical) in mapping {
        let Some(idx) = raw.column_index(source) else {
            continue;
        };
        match resolved.iter_mut().find(|(c, _)| *c == canonical) {
            Some(entry) => entry.1 = idx,
            None => resolved.push((canonical, idx)),
        }
    }
    resolved
}

fn find(resolved: &ResolvedColumns, canonical: &'static str) -> Option<usize> {
    resolved
        .iter()
        .find(|(c, _)| *c == canonical)
        .map(|(_, idx)| *idx)
}

fn require(resolved: &ResolvedColumns, canonical: &'static str) -> Result<usize> {
    find(resolved, canonical).ok_or(Error::MissingColumn(canonical))
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

pub(crate) fn parse_timestamp(column: &'static str, row: usize, value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|_| {
        Error::MalformedTimestamp {
            column,
            row,
            value: value.to_string(),
        }
    })
}

fn parse_optional_timestamp(
    column: &'static str,
    row: usize,
    value: &str,
) -> Result<Option<NaiveDateTime>> {
    non_empty(value)
        .map(|v| parse_timestamp(column, row, v))
        .transpose()
}

fn parse_rate(column: &'static str, row: usize, value: &str) -> Result<Option<f64>> {
    let Some(v) = non_empty(value) else {
        return Ok(None);
    };
    v.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .map(Some)
        .ok_or_else(|| Error::MalformedNumber {
            column,
            row,
            value: value.to_string(),
        })
}

/// Integer ids, tolerating the `123.0` form spreadsheets like to export.
fn parse_id(column: &'static str, row: usize, value: &str) -> Result<Option<i64>> {
    let Some(v) = non_empty(value) else {
        return Ok(None);
    };
    if let Ok(id) = v.parse::<i64>() {
        return Ok(Some(id));
    }
    match v.parse::<f64>() {
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        Ok(x) if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 => {
            Ok(Some(x as i64))
        }
        _ => Err(Error::MalformedNumber {
            column,
            row,
            value: value.to_string(),
        }),
    }
}

/// Normalizes one test export.
///
/// Fails on the first malformed timestamp or rate; the whole source file is
/// rejected in that case.
pub fn clean_tests(raw: &RawTable) -> Result<TestTable> {
    let resolved = resolve_columns(raw, TESTS_KEY_MAPPING);
    let site_col = require(&resolved, "site")?;
    let ts_col = require(&resolved, "timestamp")?;

    let columns: Vec<TestColumn> = resolved
        .iter()
        .filter_map(|(c, _)| TestColumn::from_name(c))
        .collect();

    let mut records = Vec::with_capacity(raw.rows.len());
    for row in 0..raw.rows.len() {
        let line = row + 1;
        let timestamp = parse_timestamp("timestamp", line, raw.cell(row, ts_col))?;
        let mut record = TestRecord::new(raw.cell(row, site_col).trim(), timestamp);

        for &(canonical, idx) in &resolved {
            let value = raw.cell(row, idx);
            match canonical {
                "exp_dn_br" => record.exp_dn_br = parse_rate(canonical, line, value)?,
                "dn_br" => record.dn_br = parse_rate(canonical, line, value)?,
                "exp_up_br" => record.exp_up_br = parse_rate(canonical, line, value)?,
                "up_br" => record.up_br = parse_rate(canonical, line, value)?,
                "res" => record.res = non_empty(value).map(Outcome::parse),
                "hour" => record.hour = non_empty(value).map(str::to_string),
                "profile" => record.profile = non_empty(value).map(str::to_string),
                "type" => record.test_type = non_empty(value).map(str::to_string),
                "error" => record.error = non_empty(value).map(str::to_string),
                "origin_file" => record.origin_file = non_empty(value).map(str::to_string),
                _ => {}
            }
        }
        records.push(record);
    }

    Ok(dedup_tests(TestTable::new(columns, records)))
}

/// Drops rows repeating an earlier `{site, dn_br, up_br, timestamp, hour}`.
pub fn dedup_tests(table: TestTable) -> TestTable {
    let before = table.len();
    let mut seen = HashSet::new();
    let TestTable { columns, records } = table;

    let records: Vec<TestRecord> = records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.site.clone(),
                r.dn_br.map(f64::to_bits),
                r.up_br.map(f64::to_bits),
                r.timestamp,
                r.hour.clone(),
            ))
        })
        .collect();

    let dropped = before - records.len();
    if dropped > 0 {
        debug!(dropped, "Duplicate tests removed");
    }
    TestTable::new(columns, records)
}

/// Combines the operational and non-operational exports into one table.
///
/// Each source is tagged with its `origin_file` before normalization.
pub fn tests_from_exports(operational: RawTable, non_operational: RawTable) -> Result<TestTable> {
    let op = clean_tests(&operational.with_constant_column("origin_file", OPERATIONAL_ORIGIN))?;
    let non_op =
        clean_tests(&non_operational.with_constant_column("origin_file", NON_OPERATIONAL_ORIGIN))?;

    info!(
        operational = op.len(),
        non_operational = non_op.len(),
        "Test exports normalized"
    );
    Ok(op.concat(non_op))
}

/// Normalizes the site registry. Rows missing either key are skipped.
pub fn clean_locations(raw: &RawTable) -> Result<Vec<LocationRecord>> {
    let resolved = resolve_columns(raw, LOCATIONS_KEY_MAPPING);
    let code_col = require(&resolved, "site_code")?;
    let ben_col = require(&resolved, "ben_id")?;

    let mut locations = Vec::with_capacity(raw.rows.len());
    let mut skipped = 0usize;
    for row in 0..raw.rows.len() {
        let ben_id = parse_id("ben_id", row + 1, raw.cell(row, ben_col))?;
        match (non_empty(raw.cell(row, code_col)), ben_id) {
            (Some(code), Some(ben_id)) => locations.push(LocationRecord {
                site_code: code.to_string(),
                ben_id,
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "Location rows without site code or beneficiary");
    }
    Ok(locations)
}

pub fn clean_tickets(raw: &RawTable) -> Result<Vec<TicketRecord>> {
    let resolved = resolve_columns(raw, TICKETS_KEY_MAPPING);
    let start_col = require(&resolved, "start")?;
    let ben_col = find(&resolved, "ben_id");
    let code_col = find(&resolved, "site_code");
    let end_col = find(&resolved, "end");

    let mut tickets = Vec::with_capacity(raw.rows.len());
    for row in 0..raw.rows.len() {
        let line = row + 1;
        let ben_id = match ben_col {
            Some(col) => parse_id("ben_id", line, raw.cell(row, col))?,
            None => None,
        };
        let end = match end_col {
            Some(col) => parse_optional_timestamp("end", line, raw.cell(row, col))?,
            None => None,
        };
        tickets.push(TicketRecord {
            ben_id,
            site_code: code_col
                .and_then(|col| non_empty(raw.cell(row, col)))
                .map(str::to_string),
            start: parse_timestamp("start", line, raw.cell(row, start_col))?,
            end,
        });
    }
    Ok(tickets)
}

/// Reads and combines the two test exports from disk.
pub fn load_tests(operational: &Path, non_operational: &Path, header_row: usize) -> Result<TestTable> {
    let op = read_table_file(operational, header_row)?;
    let non_op = read_table_file(non_operational, header_row)?;
    tests_from_exports(op, non_op)
}

pub fn load_locations(path: &Path) -> Result<Vec<LocationRecord>> {
    clean_locations(&read_table_file(path, 0)?)
}

pub fn load_tickets(path: &Path) -> Result<Vec<TicketRecord>> {
    clean_tickets(&read_table_file(path, 0)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Ubicación,BW Bajada Esperado,BW Bajada Encontrado,BW Subida Esperado,BW Subida Encontrado,Resultado,Fecha de la Prueba,Hora de la Prueba,Perfil de Velocidad,Columna Extra";

    fn raw(body: &str) -> RawTable {
        crate::parser::read_table(format!("{HEADER}\n{body}").as_bytes(), 0).unwrap()
    }

    #[test]
    fn test_clean_renames_and_drops_unmapped() {
        let table = clean_tests(&raw(
            "70001-A,10,12,2,3,succeeded,2023-03-01 10:00:00.000,10,DN:10-UP:2,x\n",
        ))
        .unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.has_column(TestColumn::Profile));
        assert!(!table.has_column(TestColumn::Type));
        assert!(!table.has_column(TestColumn::Error));

        let r = &table.records[0];
        assert_eq!(r.site, "70001-A");
        assert_eq!(r.dn_br, Some(12.0));
        assert_eq!(r.res, Some(Outcome::Succeeded));
        assert_eq!(r.hour.as_deref(), Some("10"));
    }

    #[test]
    fn test_timestamp_without_fraction_is_accepted() {
        let table = clean_tests(&raw(
            "70001-A,10,12,2,3,succeeded,2023-03-01 10:00:00,10,DN:10-UP:2,x\n",
        ))
        .unwrap();
        assert_eq!(
            table.records[0].timestamp.format("%H:%M").to_string(),
            "10:00"
        );
    }

    #[test]
    fn test_malformed_timestamp_fails() {
        let err = clean_tests(&raw("70001-A,10,12,2,3,succeeded,01/03/2023,10,DN:10-UP:2,x\n"))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_malformed_rate_fails() {
        let err = clean_tests(&raw(
            "70001-A,10,fast,2,3,succeeded,2023-03-01 10:00:00,10,DN:10-UP:2,x\n",
        ))
        .unwrap_err();
        assert!(matches!(err, Error::MalformedNumber { column: "dn_br", .. }));
    }

    #[test]
    fn test_missing_timestamp_column() {
        let raw = RawTable::new(vec!["Ubicación".into()], vec![vec!["70001-A".into()]]);
        assert!(matches!(
            clean_tests(&raw),
            Err(Error::MissingColumn("timestamp"))
        ));
    }

    #[test]
    fn test_dedup_drops_exact_repeats() {
        let row = "70001-A,10,12,2,3,succeeded,2023-03-01 10:00:00.000,10,DN:10-UP:2,x\n";
        let other = "70001-A,10,12,2,3,succeeded,2023-03-01 11:00:00.000,11,DN:10-UP:2,x\n";
        let table = clean_tests(&raw(&format!("{row}{row}{row}{other}"))).unwrap();
        // three copies collapse into one
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_dedup_ignores_non_key_columns() {
        let a = "70001-A,10,12,2,3,succeeded,2023-03-01 10:00:00.000,10,DN:10-UP:2,x\n";
        let b = "70001-A,99,12,2,3,failed,2023-03-01 10:00:00.000,10,DN:10-UP:2,y\n";
        let table = clean_tests(&raw(&format!("{a}{b}"))).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].exp_dn_br, Some(10.0));
    }

    #[test]
    fn test_later_type_header_wins() {
        let raw = RawTable::new(
            vec![
                "Ubicación".into(),
                "Fecha de la Prueba".into(),
                "Tipo de prueba".into(),
                "Tipo de Prueba".into(),
            ],
            vec![vec![
                "70001-A".into(),
                "2023-03-01 10:00:00".into(),
                "lower".into(),
                "upper".into(),
            ]],
        );
        let table = clean_tests(&raw).unwrap();
        assert_eq!(table.records[0].test_type.as_deref(), Some("upper"));
        assert_eq!(
            table.columns.iter().filter(|c| **c == TestColumn::Type).count(),
            1
        );
    }

    #[test]
    fn test_exports_are_tagged_and_concatenated() {
        let op = raw("70001-A,10,12,2,3,succeeded,2023-03-01 10:00:00,10,DN:10-UP:2,x\n");
        let non_op = raw("70002-A,10,12,2,3,failed,2023-03-01 10:00:00,10,DN:10-UP:2,x\n");
        let table = tests_from_exports(op, non_op).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.has_column(TestColumn::OriginFile));
        assert_eq!(table.records[0].origin_file.as_deref(), Some("operativos"));
        assert_eq!(table.records[1].origin_file.as_deref(), Some("no operativos"));
    }

    #[test]
    fn test_clean_locations_accepts_float_ids() {
        let raw = RawTable::new(
            vec!["Sitio (código)".into(), "ID Beneficiario".into(), "Otro".into()],
            vec![
                vec!["500".into(), "70001.0".into(), "z".into()],
                vec!["".into(), "70002".into(), "z".into()],
            ],
        );
        let locations = clean_locations(&raw).unwrap();
        assert_eq!(
            locations,
            vec![LocationRecord {
                site_code: "500".into(),
                ben_id: 70001
            }]
        );
    }

    #[test]
    fn test_out_of_range_float_id_fails() {
        assert_eq!(parse_id("ben_id", 1, "70001.0").unwrap(), Some(70001));
        for value in ["1e30", "-1e30", "9223372036854775808", "inf", "NaN"] {
            assert!(
                matches!(
                    parse_id("ben_id", 1, value),
                    Err(Error::MalformedNumber { column: "ben_id", .. })
                ),
                "{value}"
            );
        }
    }

    #[test]
    fn test_clean_tickets_open_ticket() {
        let raw = RawTable::new(
            vec![
                "ID_BENEFICIARIO".into(),
                "ID_MINTIC".into(),
                "FECHA_HORA_DE_APERTURA".into(),
                "FECHA_HORA_DE_RESOLUCION".into(),
            ],
            vec![vec![
                "70001".into(),
                "500".into(),
                "2023-03-01 08:00:00".into(),
                "".into(),
            ]],
        );
        let tickets = clean_tickets(&raw).unwrap();
        assert_eq!(tickets[0].ben_id, Some(70001));
        assert_eq!(tickets[0].site_code.as_deref(), Some("500"));
        assert!(tickets[0].end.is_none());
    }
}
