//! Report assembly.
//!
//! For every service profile present in the evaluated tests the builder
//! writes six sheets (`Progress`, `VSATs`, `Hours`, `Download`, `Upload`,
//! `Count`), followed by the profile-independent `General Progress` and
//! `All Tests` sheets and, when sites were excluded, a `Remove List`.

pub mod pivot;
pub mod sheet;
pub mod sink;

use tracing::info;

use crate::analyzers::{DaySummary, HourSummary, SummaryRecord, TicketData, VsatSummary};
use crate::analyzers::{get_hours, get_progress, get_vsats};
use crate::error::{Error, Result};
use crate::filter::{Criterion, filter_tests, remove_locations};
use crate::records::{LocationRecord, TestColumn, TestRecord, TestTable, TicketRecord};
use pivot::{PivotValue, pivot_table};
use sheet::{Cell, Sheet};
use sink::SheetSink;

/// Sheet-name suffix for a profile label: `DN:10-UP:2` becomes `10X2`.
///
/// The label must have exactly two `-` segments, each carrying a numeric
/// value after its `:`.
pub fn profile_suffix(profile: &str) -> Result<String> {
    let malformed = || Error::MalformedProfileLabel(profile.to_string());
    let value = |part: &str| -> Result<String> {
        part.split(':')
            .nth(1)
            .map(str::trim)
            .filter(|v| v.parse::<f64>().is_ok_and(f64::is_finite))
            .map(str::to_string)
            .ok_or_else(malformed)
    };
    let parts: Vec<&str> = profile.split('-').collect();
    let &[down, up] = parts.as_slice() else {
        return Err(malformed());
    };
    Ok(format!("{}X{}", value(down)?, value(up)?))
}

/// Profiles with their sheet suffixes, failing if two labels share one.
fn profile_suffixes(profiles: Vec<String>) -> Result<Vec<(String, String)>> {
    let mut resolved: Vec<(String, String)> = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let suffix = profile_suffix(&profile)?;
        if let Some((first, _)) = resolved.iter().find(|(_, s)| *s == suffix) {
            return Err(Error::ProfileSuffixCollision {
                suffix,
                first: first.clone(),
                second: profile,
            });
        }
        resolved.push((profile, suffix));
    }
    Ok(resolved)
}

fn summary_sheet<'a>(
    name: String,
    index: &str,
    rows: impl Iterator<Item = (Cell, &'a SummaryRecord)>,
) -> Sheet {
    let mut sheet = Sheet::new(
        name,
        std::iter::once(index).chain(SummaryRecord::COLUMNS),
    );
    for (key, summary) in rows {
        let mut row = vec![key];
        row.extend(summary.cells());
        sheet.push_row(row);
    }
    sheet
}

pub fn progress_sheet(name: String, progress: &[DaySummary]) -> Sheet {
    summary_sheet(
        name,
        "date",
        progress.iter().map(|d| (Cell::date(d.date), &d.summary)),
    )
}

pub fn hours_sheet(name: String, hours: &[HourSummary]) -> Sheet {
    summary_sheet(
        name,
        "hour",
        hours.iter().map(|h| (Cell::text(&h.hour), &h.summary)),
    )
}

/// Site summaries; the downtime columns only appear when tickets were used.
pub fn vsats_sheet(name: String, vsats: &[VsatSummary], with_validity: bool) -> Sheet {
    let mut sheet = summary_sheet(
        name,
        "site_code",
        vsats
            .iter()
            .map(|v| (Cell::text(&v.site_code), &v.summary)),
    );
    if with_validity {
        sheet.columns.push("total_dn_time".to_string());
        sheet.columns.push("validity".to_string());
        for (row, vsat) in sheet.rows.iter_mut().zip(vsats) {
            row.push(vsat.total_dn_time.map(Cell::duration).unwrap_or(Cell::Empty));
            row.push(vsat.validity.map(|v| Cell::text(v.label())).unwrap_or(Cell::Empty));
        }
    }
    sheet
}

pub fn tests_sheet(name: String, table: &TestTable) -> Sheet {
    let mut sheet = Sheet::new(name, table.columns.iter().map(|c| c.as_str()));
    for record in &table.records {
        sheet.push_row(table.columns.iter().map(|c| record.cell(*c)).collect());
    }
    sheet
}

/// Distinct profile labels in order of first appearance.
fn profiles(tests: &[TestRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for profile in tests.iter().filter_map(|t| t.profile.as_ref()) {
        if !seen.contains(profile) {
            seen.push(profile.clone());
        }
    }
    seen
}

fn write_profile_sheets<S: SheetSink>(
    sink: &mut S,
    tests: &TestTable,
    profile: &str,
    suffix: &str,
    tickets: Option<TicketData<'_>>,
) -> Result<()> {
    let profile_tests = filter_tests(
        tests,
        &[Criterion::Equals(TestColumn::Profile, profile.to_string())],
    )?;
    let succeeded: Vec<TestRecord> = profile_tests
        .records
        .iter()
        .filter(|t| t.is_succeeded())
        .cloned()
        .collect();

    let progress = get_progress(&profile_tests.records);
    let vsats = get_vsats(&profile_tests.records, tickets);
    let hours = get_hours(&succeeded);

    sink.write_sheet(progress_sheet(format!("Progress {suffix}"), &progress))?;
    sink.write_sheet(vsats_sheet(
        format!("VSATs {suffix}"),
        &vsats,
        vsats.iter().any(|v| v.validity.is_some()),
    ))?;
    sink.write_sheet(hours_sheet(format!("Hours {suffix}"), &hours))?;
    sink.write_sheet(pivot_table(
        format!("Download {suffix}"),
        &succeeded,
        PivotValue::MaxDownload,
    ))?;
    sink.write_sheet(pivot_table(
        format!("Upload {suffix}"),
        &succeeded,
        PivotValue::MaxUpload,
    ))?;
    sink.write_sheet(pivot_table(
        format!("Count {suffix}"),
        &succeeded,
        PivotValue::Count,
    ))?;

    info!(
        profile,
        suffix,
        tests = profile_tests.len(),
        sites = vsats.len(),
        "Profile sheets built"
    );
    Ok(())
}

/// Builds the full report into `sink` and commits it.
///
/// `remove_list` sites are dropped from the whole table before any
/// segmentation. On error the sink is dropped uncommitted.
#[tracing::instrument(skip_all, fields(tests = tests.len()))]
pub fn build_report<S: SheetSink>(
    tests: &TestTable,
    tickets: Option<&[TicketRecord]>,
    locations: Option<&[LocationRecord]>,
    mut sink: S,
    remove_list: Option<&[String]>,
) -> Result<S::Output> {
    let tests = match remove_list {
        Some(codes) => remove_locations(tests, codes),
        None => tests.clone(),
    };

    let ticket_data = match (tickets, locations) {
        (Some(tickets), Some(locations)) => Some(TicketData { tickets, locations }),
        _ => None,
    };

    for (profile, suffix) in profile_suffixes(profiles(&tests.records))? {
        write_profile_sheets(&mut sink, &tests, &profile, &suffix, ticket_data)?;
    }

    sink.write_sheet(progress_sheet(
        "General Progress".to_string(),
        &get_progress(&tests.records),
    ))?;
    sink.write_sheet(tests_sheet("All Tests".to_string(), &tests))?;

    if let Some(codes) = remove_list {
        let mut sheet = Sheet::new("Remove List", ["site_code"]);
        for code in codes {
            sheet.push_row(vec![Cell::text(code)]);
        }
        sink.write_sheet(sheet)?;
    }

    sink.finish()
}
