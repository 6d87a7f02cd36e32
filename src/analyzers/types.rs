//! Data types produced by the aggregation pipeline.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::report::sheet::Cell;

/// Counts and rate statistics for one group of tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub passed: usize,
    pub non_passed: usize,
    pub up_non_passed: usize,
    pub dn_non_passed: usize,
    pub both_non_passed: usize,
    pub dn_nth_value: Option<f64>,
    pub up_nth_value: Option<f64>,
    pub dn_mean: Option<f64>,
    pub up_mean: Option<f64>,
    pub concurrency: usize,
}

impl SummaryRecord {
    pub const COLUMNS: [&'static str; 13] = [
        "total",
        "succeeded",
        "failed",
        "passed",
        "non_passed",
        "up_non_passed",
        "dn_non_passed",
        "both_non_passed",
        "dn_nth_value",
        "up_nth_value",
        "dn_mean",
        "up_mean",
        "concurrency",
    ];

    pub fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::count(self.total),
            Cell::count(self.succeeded),
            Cell::count(self.failed),
            Cell::count(self.passed),
            Cell::count(self.non_passed),
            Cell::count(self.up_non_passed),
            Cell::count(self.dn_non_passed),
            Cell::count(self.both_non_passed),
            self.dn_nth_value.into(),
            self.up_nth_value.into(),
            self.dn_mean.into(),
            self.up_mean.into(),
            Cell::count(self.concurrency),
        ]
    }
}

/// Whether a site has enough clean data to trust its statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Validity {
    #[serde(rename = "valid")]
    Valid,
    #[serde(rename = "< 30 tests")]
    FewTests,
    #[serde(rename = "> 24 hr & < 15 tests")]
    OutageFewTests,
}

impl Validity {
    pub fn label(self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::FewTests => "< 30 tests",
            Validity::OutageFewTests => "> 24 hr & < 15 tests",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub summary: SummaryRecord,
}

/// Summary of one `hour` label.
#[derive(Debug, Clone, PartialEq)]
pub struct HourSummary {
    pub hour: String,
    pub summary: SummaryRecord,
}

/// Summary of one site, with outage accounting when tickets were supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct VsatSummary {
    pub site_code: String,
    pub summary: SummaryRecord,
    pub total_dn_time: Option<Duration>,
    pub validity: Option<Validity>,
}
