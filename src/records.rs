//! Canonical record shapes produced by the normalizer and enriched downstream.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::report::sheet::Cell;

/// Format used for every instant read from the exports and written back out.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result reported by the speed-test tool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
    Succeeded,
    Failed,
    Other(String),
}

impl Outcome {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "succeeded" => Outcome::Succeeded,
            "failed" => Outcome::Failed,
            other => Outcome::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Failed => "failed",
            Outcome::Other(s) => s,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Outcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One executed speed test.
///
/// Source fields are `None` when the column was absent or the cell empty.
/// The trailing block is filled in by the resolver and the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRecord {
    pub site: String,
    pub exp_dn_br: Option<f64>,
    pub dn_br: Option<f64>,
    pub exp_up_br: Option<f64>,
    pub up_br: Option<f64>,
    pub res: Option<Outcome>,
    pub timestamp: NaiveDateTime,
    pub hour: Option<String>,
    pub profile: Option<String>,
    #[serde(rename = "type")]
    pub test_type: Option<String>,
    pub error: Option<String>,
    pub origin_file: Option<String>,

    pub site_code: Option<String>,
    pub ben_id: Option<i64>,
    pub dn_pass: Option<bool>,
    pub up_pass: Option<bool>,
    pub pass: Option<bool>,
    pub concurrent_tests: Option<usize>,
    pub date: Option<NaiveDate>,
}

impl TestRecord {
    /// A record carrying only the two mandatory fields.
    pub fn new(site: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        TestRecord {
            site: site.into(),
            exp_dn_br: None,
            dn_br: None,
            exp_up_br: None,
            up_br: None,
            res: None,
            timestamp,
            hour: None,
            profile: None,
            test_type: None,
            error: None,
            origin_file: None,
            site_code: None,
            ben_id: None,
            dn_pass: None,
            up_pass: None,
            pass: None,
            concurrent_tests: None,
            date: None,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.res == Some(Outcome::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        self.res == Some(Outcome::Failed)
    }

    /// Renders one column of this record as a sheet cell.
    pub fn cell(&self, column: TestColumn) -> Cell {
        match column {
            TestColumn::Site => Cell::text(&self.site),
            TestColumn::ExpDnBr => self.exp_dn_br.into(),
            TestColumn::DnBr => self.dn_br.into(),
            TestColumn::ExpUpBr => self.exp_up_br.into(),
            TestColumn::UpBr => self.up_br.into(),
            TestColumn::Res => self.res.as_ref().map(Outcome::to_string).into(),
            TestColumn::Timestamp => Cell::timestamp(self.timestamp),
            TestColumn::Hour => self.hour.clone().into(),
            TestColumn::Profile => self.profile.clone().into(),
            TestColumn::Type => self.test_type.clone().into(),
            TestColumn::Error => self.error.clone().into(),
            TestColumn::OriginFile => self.origin_file.clone().into(),
            TestColumn::SiteCode => self.site_code.clone().into(),
            TestColumn::BenId => self.ben_id.into(),
            TestColumn::DnPass => self.dn_pass.into(),
            TestColumn::UpPass => self.up_pass.into(),
            TestColumn::Pass => self.pass.into(),
            TestColumn::ConcurrentTests => self.concurrent_tests.map(|n| n as i64).into(),
            TestColumn::Date => self.date.map(Cell::date).unwrap_or(Cell::Empty),
        }
    }
}

/// Canonical column names of a test table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestColumn {
    Site,
    ExpDnBr,
    DnBr,
    ExpUpBr,
    UpBr,
    Res,
    Timestamp,
    Hour,
    Profile,
    Type,
    Error,
    OriginFile,
    SiteCode,
    BenId,
    DnPass,
    UpPass,
    Pass,
    ConcurrentTests,
    Date,
}

impl TestColumn {
    pub const ALL: [TestColumn; 19] = [
        TestColumn::Site,
        TestColumn::ExpDnBr,
        TestColumn::DnBr,
        TestColumn::ExpUpBr,
        TestColumn::UpBr,
        TestColumn::Res,
        TestColumn::Timestamp,
        TestColumn::Hour,
        TestColumn::Profile,
        TestColumn::Type,
        TestColumn::Error,
        TestColumn::OriginFile,
        TestColumn::SiteCode,
        TestColumn::BenId,
        TestColumn::DnPass,
        TestColumn::UpPass,
        TestColumn::Pass,
        TestColumn::ConcurrentTests,
        TestColumn::Date,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestColumn::Site => "site",
            TestColumn::ExpDnBr => "exp_dn_br",
            TestColumn::DnBr => "dn_br",
            TestColumn::ExpUpBr => "exp_up_br",
            TestColumn::UpBr => "up_br",
            TestColumn::Res => "res",
            TestColumn::Timestamp => "timestamp",
            TestColumn::Hour => "hour",
            TestColumn::Profile => "profile",
            TestColumn::Type => "type",
            TestColumn::Error => "error",
            TestColumn::OriginFile => "origin_file",
            TestColumn::SiteCode => "site_code",
            TestColumn::BenId => "ben_id",
            TestColumn::DnPass => "dn_pass",
            TestColumn::UpPass => "up_pass",
            TestColumn::Pass => "pass",
            TestColumn::ConcurrentTests => "concurrent_tests",
            TestColumn::Date => "date",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Columns holding rates, ids or counts.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TestColumn::ExpDnBr
                | TestColumn::DnBr
                | TestColumn::ExpUpBr
                | TestColumn::UpBr
                | TestColumn::BenId
                | TestColumn::ConcurrentTests
        )
    }
}

/// A batch of test records plus the columns actually present in it.
///
/// Columns missing from every source export stay out of `columns`, so the
/// raw dump of the table only shows what the exports provided.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestTable {
    pub columns: Vec<TestColumn>,
    pub records: Vec<TestRecord>,
}

impl TestTable {
    pub fn new(columns: Vec<TestColumn>, records: Vec<TestRecord>) -> Self {
        TestTable { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: TestColumn) -> bool {
        self.columns.contains(&column)
    }

    /// Registers a column, keeping the first position if already present.
    pub fn add_column(&mut self, column: TestColumn) {
        if !self.has_column(column) {
            self.columns.push(column);
        }
    }

    /// Same columns, a different subset of records.
    pub fn with_records(&self, records: Vec<TestRecord>) -> Self {
        TestTable {
            columns: self.columns.clone(),
            records,
        }
    }

    /// Appends another table, merging its columns after the existing ones.
    pub fn concat(mut self, other: TestTable) -> Self {
        for column in other.columns {
            self.add_column(column);
        }
        self.records.extend(other.records);
        self
    }
}

/// One row of the site registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRecord {
    pub site_code: String,
    pub ben_id: i64,
}

/// One trouble ticket. `end` is `None` while the ticket is still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRecord {
    pub ben_id: Option<i64>,
    pub site_code: Option<String>,
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse() {
        assert_eq!(Outcome::parse("succeeded"), Outcome::Succeeded);
        assert_eq!(Outcome::parse(" failed "), Outcome::Failed);
        assert_eq!(
            Outcome::parse("timeout"),
            Outcome::Other("timeout".to_string())
        );
    }

    #[test]
    fn test_column_names_round_trip() {
        for column in TestColumn::ALL {
            assert_eq!(TestColumn::from_name(column.as_str()), Some(column));
        }
        assert_eq!(TestColumn::from_name("nope"), None);
    }

    #[test]
    fn test_concat_merges_columns() {
        let a = TestTable::new(vec![TestColumn::Site, TestColumn::Timestamp], vec![]);
        let b = TestTable::new(vec![TestColumn::Site, TestColumn::Hour], vec![]);
        let merged = a.concat(b);
        assert_eq!(
            merged.columns,
            vec![TestColumn::Site, TestColumn::Timestamp, TestColumn::Hour]
        );
    }
}
