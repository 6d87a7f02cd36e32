//! Caller-driven selection over evaluated tests and tickets.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::{Error, Result};
use crate::records::{DATE_FORMAT, LocationRecord, TestColumn, TestRecord, TestTable, TicketRecord};
use crate::report::sheet::Cell;

/// One `key = value` selection rule for [`filter_tests`].
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Calendar date of the test timestamp.
    Date(NaiveDate),
    /// Value of the combined `pass` flag.
    Passing(bool),
    /// Exact match on the rendered value of any canonical column.
    Equals(TestColumn, String),
    /// Numeric equality on a rate, id or count column.
    EqualsNumber(TestColumn, f64),
}

impl Criterion {
    /// Parses a criterion from its textual key and value.
    ///
    /// Keys that name no canonical column are rejected with
    /// [`Error::UnknownFilterKey`] instead of silently matching nothing.
    pub fn parse(key: &str, value: &str) -> Result<Self> {
        match key {
            "date" => Ok(Criterion::Date(parse_date(value)?)),
            "passing" => value
                .trim()
                .parse::<bool>()
                .map(Criterion::Passing)
                .map_err(|_| Error::InvalidFilterValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            other => {
                let column = TestColumn::from_name(other)
                    .ok_or_else(|| Error::UnknownFilterKey(other.to_string()))?;
                if !column.is_numeric() {
                    return Ok(Criterion::Equals(column, value.to_string()));
                }
                value
                    .trim()
                    .parse::<f64>()
                    .map(|n| Criterion::EqualsNumber(column, n))
                    .map_err(|_| Error::InvalidFilterValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
            }
        }
    }

    fn column(&self) -> Option<TestColumn> {
        match self {
            Criterion::Equals(column, _) | Criterion::EqualsNumber(column, _) => Some(*column),
            Criterion::Date(_) | Criterion::Passing(_) => None,
        }
    }

    /// Parses `key=value`.
    pub fn parse_pair(pair: &str) -> Result<Self> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::UnknownFilterKey(pair.to_string()))?;
        Self::parse(key.trim(), value)
    }

    fn matches(&self, record: &TestRecord) -> bool {
        match self {
            Criterion::Date(date) => record.timestamp.date() == *date,
            Criterion::Passing(value) => record.pass == Some(*value),
            Criterion::Equals(column, value) => record.cell(*column).to_string() == *value,
            Criterion::EqualsNumber(column, value) => match record.cell(*column) {
                Cell::Float(x) => x == *value,
                Cell::Int(n) => n as f64 == *value,
                _ => false,
            },
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidDateFormat(value.to_string()))
}

/// Returns the tests matching every criterion.
///
/// An equality criterion on a column the table does not carry is an
/// [`Error::UnknownFilterKey`].
pub fn filter_tests(table: &TestTable, criteria: &[Criterion]) -> Result<TestTable> {
    for criterion in criteria {
        if let Some(column) = criterion.column() {
            if !table.has_column(column) {
                return Err(Error::UnknownFilterKey(column.as_str().to_string()));
            }
        }
    }

    let records = table
        .records
        .iter()
        .filter(|r| criteria.iter().all(|c| c.matches(r)))
        .cloned()
        .collect();
    Ok(table.with_records(records))
}

/// Drops every test belonging to one of `site_codes`.
pub fn remove_locations(table: &TestTable, site_codes: &[String]) -> TestTable {
    let excluded: HashSet<&str> = site_codes.iter().map(String::as_str).collect();
    let records: Vec<TestRecord> = table
        .records
        .iter()
        .filter(|r| {
            r.site_code
                .as_deref()
                .is_none_or(|code| !excluded.contains(code))
        })
        .cloned()
        .collect();
    debug!(removed = table.len() - records.len(), "Excluded sites removed");
    table.with_records(records)
}

/// Keeps tests dated within `[from, to]`; either bound may be open.
pub fn restrict_dates(table: &TestTable, from: Option<NaiveDate>, to: Option<NaiveDate>) -> TestTable {
    let records = table
        .records
        .iter()
        .filter(|r| {
            let date = r.timestamp.date();
            from.is_none_or(|f| date >= f) && to.is_none_or(|t| date <= t)
        })
        .cloned()
        .collect();
    table.with_records(records)
}

/// Parses a comma separated list of numeric site codes, e.g. `"500, 501"`.
pub fn parse_exclusion_list(value: &str) -> Result<Vec<String>> {
    value
        .split(',')
        .map(str::trim)
        .map(|item| {
            if !item.is_empty() && item.chars().all(|c| c.is_ascii_digit()) {
                Ok(item.to_string())
            } else {
                Err(Error::MalformedExclusionList(value.to_string()))
            }
        })
        .collect()
}

/// Restricts tickets to registered beneficiaries opened within
/// `[start_date, end_date]` (by calendar date, inclusive), filling open
/// tickets' `end` with `end_date`.
pub fn filter_tickets(
    tickets: &[TicketRecord],
    locations: &[LocationRecord],
    start_date: NaiveDateTime,
    end_date: NaiveDateTime,
) -> Vec<TicketRecord> {
    let sites: HashSet<i64> = locations.iter().map(|l| l.ben_id).collect();
    let (first, last) = (start_date.date(), end_date.date());

    tickets
        .iter()
        .filter(|t| t.ben_id.is_some_and(|id| sites.contains(&id)))
        .filter(|t| {
            let opened = t.start.date();
            opened >= first && opened <= last
        })
        .map(|t| TicketRecord {
            end: Some(t.end.unwrap_or(end_date)),
            ..t.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Outcome;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn table() -> TestTable {
        let mut a = TestRecord::new("70001-A", ts(1, 10));
        a.res = Some(Outcome::Succeeded);
        a.pass = Some(true);
        a.site_code = Some("500".into());
        let mut b = TestRecord::new("70002-A", ts(2, 10));
        b.res = Some(Outcome::Failed);
        b.pass = Some(false);
        b.site_code = Some("501".into());
        TestTable::new(
            vec![TestColumn::Site, TestColumn::Res, TestColumn::SiteCode, TestColumn::Pass],
            vec![a, b],
        )
    }

    #[test]
    fn test_filter_by_date() {
        let out = filter_tests(&table(), &[Criterion::parse("date", "2023-03-02").unwrap()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].site, "70002-A");
    }

    #[test]
    fn test_invalid_date_rejected() {
        assert!(matches!(
            Criterion::parse("date", "02/03/2023"),
            Err(Error::InvalidDateFormat(_))
        ));
    }

    #[test]
    fn test_filter_passing_and_column() {
        let t = table();
        let passing = filter_tests(&t, &[Criterion::parse("passing", "true").unwrap()]).unwrap();
        assert_eq!(passing.len(), 1);

        let failed = filter_tests(&t, &[Criterion::parse_pair("res=failed").unwrap()]).unwrap();
        assert_eq!(failed.records[0].site_code.as_deref(), Some("501"));
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        assert!(matches!(
            Criterion::parse("colour", "blue"),
            Err(Error::UnknownFilterKey(_))
        ));
        // canonical, but absent from this table
        let err = filter_tests(&table(), &[Criterion::parse("profile", "x").unwrap()]).unwrap_err();
        assert!(matches!(err, Error::UnknownFilterKey(k) if k == "profile"));
    }

    #[test]
    fn test_numeric_columns_compare_by_value() {
        let mut t = table();
        t.records[0].dn_br = Some(12.5);
        t.records[1].dn_br = Some(8.0);
        t.records[1].ben_id = Some(70002);
        t.add_column(TestColumn::DnBr);
        t.add_column(TestColumn::BenId);

        let out = filter_tests(&t, &[Criterion::parse_pair("dn_br=12.50").unwrap()]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].site, "70001-A");

        let out = filter_tests(&t, &[Criterion::parse("dn_br", "8").unwrap()]).unwrap();
        assert_eq!(out.records[0].site, "70002-A");

        let out = filter_tests(&t, &[Criterion::parse("ben_id", "70002.0").unwrap()]).unwrap();
        assert_eq!(out.len(), 1);

        assert!(matches!(
            Criterion::parse("dn_br", "fast"),
            Err(Error::InvalidFilterValue { .. })
        ));
    }

    #[test]
    fn test_remove_locations() {
        let out = remove_locations(&table(), &["501".to_string()]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].site_code.as_deref(), Some("500"));
    }

    #[test]
    fn test_restrict_dates() {
        let out = restrict_dates(&table(), NaiveDate::from_ymd_opt(2023, 3, 2), None);
        assert_eq!(out.len(), 1);
        let out = restrict_dates(&table(), None, NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(out.records[0].site, "70001-A");
    }

    #[test]
    fn test_parse_exclusion_list() {
        assert_eq!(
            parse_exclusion_list("500, 501").unwrap(),
            vec!["500".to_string(), "501".to_string()]
        );
        assert!(parse_exclusion_list("500,abc").is_err());
        assert!(parse_exclusion_list("500,,501").is_err());
    }

    #[test]
    fn test_filter_tickets() {
        let locations = vec![LocationRecord {
            site_code: "500".into(),
            ben_id: 70001,
        }];
        let ticket = |ben_id, start, end| TicketRecord {
            ben_id: Some(ben_id),
            site_code: Some("500".into()),
            start,
            end,
        };
        let tickets = vec![
            ticket(70001, ts(1, 8), None),
            ticket(70001, ts(5, 8), Some(ts(5, 9))),
            ticket(79999, ts(1, 8), Some(ts(1, 9))),
            ticket(70001, ts(3, 23), Some(ts(4, 1))),
        ];

        let out = filter_tickets(&tickets, &locations, ts(1, 12), ts(3, 12));
        assert_eq!(out.len(), 2);
        // opened before the start instant but on the same calendar day
        assert_eq!(out[0].end, Some(ts(3, 12)));
        assert_eq!(out[1].end, Some(ts(4, 1)));
    }
}
