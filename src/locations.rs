//! Joins tests against the site registry.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::records::{LocationRecord, TestColumn, TestRecord, TestTable};

/// Extracts the beneficiary number encoded before the first `-` of a site id.
///
/// `"70001-SEDE PRINCIPAL"` yields `70001`.
pub fn location_code(site: &str) -> Result<i64> {
    let (prefix, _) = site
        .split_once('-')
        .ok_or_else(|| Error::MalformedSiteIdentifier(site.to_string()))?;
    prefix
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::MalformedSiteIdentifier(site.to_string()))
}

/// Keeps the tests whose location code is a registered beneficiary and
/// attaches that beneficiary's `site_code` and `ben_id`.
///
/// Tests for unregistered locations are dropped, not errored. When the
/// registry repeats a beneficiary the first row is used.
#[tracing::instrument(skip_all, fields(tests = tests.len(), locations = locations.len()))]
pub fn filter_locations(tests: TestTable, locations: &[LocationRecord]) -> Result<TestTable> {
    let mut by_ben_id: HashMap<i64, &LocationRecord> = HashMap::new();
    for location in locations {
        by_ben_id.entry(location.ben_id).or_insert(location);
    }

    let TestTable {
        mut columns,
        records,
    } = tests;
    let before = records.len();

    let mut kept: Vec<TestRecord> = Vec::with_capacity(before);
    for mut record in records {
        let code = location_code(&record.site)?;
        let Some(location) = by_ben_id.get(&code) else {
            continue;
        };
        record.site_code = Some(location.site_code.clone());
        record.ben_id = Some(location.ben_id);
        kept.push(record);
    }

    let dropped = before - kept.len();
    if dropped > 0 {
        debug!(dropped, "Tests for unregistered locations dropped");
    }
    info!(kept = kept.len(), "Tests matched to registered locations");

    for column in [TestColumn::SiteCode, TestColumn::BenId] {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    Ok(TestTable::new(columns, kept))
}
