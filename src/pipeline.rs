//! End-to-end runs from export files to a written report.

use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::error::Result;
use crate::evaluate::{drop_concurrent, eval_and_cache};
use crate::filter::{parse_date, parse_exclusion_list, restrict_dates};
use crate::locations::filter_locations;
use crate::normalize::{load_locations, load_tests, load_tickets};
use crate::records::{LocationRecord, TestTable};
use crate::report::build_report;
use crate::report::sink::JsonWorkbook;

/// A caller input that was ignored so the rest of the report could proceed.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    ExclusionListIgnored(String),
    DateRangeIgnored(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ExclusionListIgnored(reason) => {
                write!(f, "Wrong remove list format, no VSATs removed: {reason}")
            }
            Warning::DateRangeIgnored(reason) => {
                write!(f, "Wrong date range, all dates kept: {reason}")
            }
        }
    }
}

/// Input paths shared by every command that evaluates tests.
#[derive(Debug, Clone)]
pub struct TestSources {
    pub operational: PathBuf,
    pub non_operational: PathBuf,
    pub locations: PathBuf,
    pub header_row: usize,
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub sources: TestSources,
    pub tickets: Option<PathBuf>,
    pub output: PathBuf,
    pub window: Duration,
    pub accept_concurrency: bool,
    pub exclude: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cache_name: Option<String>,
    pub gzip: bool,
}

#[derive(Debug)]
pub struct ReportOutcome {
    pub path: PathBuf,
    pub tests: usize,
    pub warnings: Vec<Warning>,
}

/// Loads, resolves and evaluates the test exports.
pub fn evaluate_sources(
    sources: &TestSources,
    window: Duration,
    cache: Option<(&dyn CacheStore, &str)>,
) -> Result<(TestTable, Vec<LocationRecord>)> {
    let tests = load_tests(&sources.operational, &sources.non_operational, sources.header_row)?;
    let locations = load_locations(&sources.locations)?;
    let resolved = filter_locations(tests, &locations)?;
    let evaluated = eval_and_cache(resolved, window, cache)?;
    Ok((evaluated, locations))
}

fn parse_range(from: Option<&str>, to: Option<&str>) -> Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    Ok((
        from.map(parse_date).transpose()?,
        to.map(parse_date).transpose()?,
    ))
}

/// Runs the whole pipeline and writes the report atomically.
///
/// Malformed exclusion lists and date bounds are skipped with a [`Warning`].
#[tracing::instrument(skip_all, fields(output = %request.output.display()))]
pub fn run_report(request: &ReportRequest, cache: Option<&dyn CacheStore>) -> Result<ReportOutcome> {
    let mut warnings = Vec::new();

    let cache_slot = cache.zip(request.cache_name.as_deref());
    let (mut tests, locations) = evaluate_sources(&request.sources, request.window, cache_slot)?;

    if !request.accept_concurrency {
        tests = drop_concurrent(tests);
    }

    match parse_range(request.from.as_deref(), request.to.as_deref()) {
        Ok((None, None)) => {}
        Ok((from, to)) => tests = restrict_dates(&tests, from, to),
        Err(e) => {
            warn!(error = %e, "Date range ignored");
            warnings.push(Warning::DateRangeIgnored(e.to_string()));
        }
    }

    let remove_list = match request.exclude.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(list) => match parse_exclusion_list(list) {
            Ok(codes) => Some(codes),
            Err(e) => {
                warn!(error = %e, "Exclusion list ignored");
                warnings.push(Warning::ExclusionListIgnored(e.to_string()));
                None
            }
        },
    };

    let tickets = request.tickets.as_deref().map(load_tickets).transpose()?;

    let sink = JsonWorkbook::new(&request.output).gzip(request.gzip);
    let path = build_report(
        &tests,
        tickets.as_deref(),
        Some(locations.as_slice()),
        sink,
        remove_list.as_deref(),
    )?;

    info!(tests = tests.len(), warnings = warnings.len(), "Report complete");
    Ok(ReportOutcome {
        path,
        tests: tests.len(),
        warnings,
    })
}
