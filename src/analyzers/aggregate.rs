use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::analyzers::types::{DaySummary, HourSummary, SummaryRecord, VsatSummary};
use crate::analyzers::utility::{label_order, mean, quantile_higher};
use crate::analyzers::validity::classify;
use crate::filter::filter_tickets;
use crate::records::{LocationRecord, TestRecord, TicketRecord};

/// Quantile reported as `*_nth_value`.
pub const NTH_QUANTILE: f64 = 0.05;

/// Tickets plus the registry used to scope them to known beneficiaries.
#[derive(Debug, Clone, Copy)]
pub struct TicketData<'a> {
    pub tickets: &'a [TicketRecord],
    pub locations: &'a [LocationRecord],
}

impl TicketData<'_> {
    fn is_empty(&self) -> bool {
        self.tickets.is_empty() || self.locations.is_empty()
    }
}

/// Reduces a group of evaluated tests to one [`SummaryRecord`].
///
/// Rate statistics only look at successful tests with a measured value.
pub fn summarize<'a, I>(tests: I) -> SummaryRecord
where
    I: IntoIterator<Item = &'a TestRecord>,
{
    let mut s = SummaryRecord::default();
    let mut dn_rates = Vec::new();
    let mut up_rates = Vec::new();

    for t in tests {
        s.total += 1;

        if t.concurrent_tests.is_some_and(|n| n >= 1) {
            s.concurrency += 1;
        }

        if t.is_failed() {
            s.failed += 1;
            continue;
        }
        if !t.is_succeeded() {
            continue;
        }

        s.succeeded += 1;
        dn_rates.extend(t.dn_br);
        up_rates.extend(t.up_br);

        match t.pass {
            Some(true) => s.passed += 1,
            Some(false) => {
                s.non_passed += 1;
                match (t.dn_pass, t.up_pass) {
                    (Some(false), Some(true)) => s.dn_non_passed += 1,
                    (Some(true), Some(false)) => s.up_non_passed += 1,
                    (Some(false), Some(false)) => s.both_non_passed += 1,
                    _ => {}
                }
            }
            None => {}
        }
    }

    s.dn_nth_value = quantile_higher(&dn_rates, NTH_QUANTILE);
    s.up_nth_value = quantile_higher(&up_rates, NTH_QUANTILE);
    s.dn_mean = mean(&dn_rates);
    s.up_mean = mean(&up_rates);
    s
}

/// One summary per calendar day that has tests, in date order.
pub fn get_progress(tests: &[TestRecord]) -> Vec<DaySummary> {
    let mut days: BTreeMap<NaiveDate, Vec<&TestRecord>> = BTreeMap::new();
    for t in tests {
        days.entry(t.timestamp.date()).or_default().push(t);
    }
    days.into_iter()
        .map(|(date, group)| DaySummary {
            date,
            summary: summarize(group),
        })
        .collect()
}

/// One summary per literal `hour` label. Tests without a label are skipped.
///
/// Numeric labels come first in numeric order, so `8` precedes `10`.
pub fn get_hours(tests: &[TestRecord]) -> Vec<HourSummary> {
    let mut hours: BTreeMap<&str, Vec<&TestRecord>> = BTreeMap::new();
    for t in tests {
        if let Some(hour) = t.hour.as_deref() {
            hours.entry(hour).or_default().push(t);
        }
    }
    let mut hours: Vec<(&str, Vec<&TestRecord>)> = hours.into_iter().collect();
    hours.sort_by_key(|(hour, _)| label_order(hour));
    hours
        .into_iter()
        .map(|(hour, group)| HourSummary {
            hour: hour.to_string(),
            summary: summarize(group),
        })
        .collect()
}

/// Sums `end - start` per ticket `site_code`. Tickets must have `end` filled.
pub fn downtime_by_site(tickets: &[TicketRecord]) -> HashMap<String, Duration> {
    let mut totals: HashMap<String, Duration> = HashMap::new();
    for t in tickets {
        let (Some(code), Some(end)) = (t.site_code.as_ref(), t.end) else {
            continue;
        };
        *totals.entry(code.clone()).or_insert_with(Duration::zero) += end - t.start;
    }
    totals
}

/// One summary per `site_code`.
///
/// With tickets, downtime is taken from tickets of registered beneficiaries
/// opened between the first and last test; open tickets run until the last
/// test. Every site then gets a validity label, sites without tickets being
/// classified as having no downtime.
#[tracing::instrument(skip_all, fields(tests = tests.len(), with_tickets = tickets.is_some()))]
pub fn get_vsats(tests: &[TestRecord], tickets: Option<TicketData<'_>>) -> Vec<VsatSummary> {
    let mut sites: BTreeMap<&str, Vec<&TestRecord>> = BTreeMap::new();
    for t in tests {
        if let Some(code) = t.site_code.as_deref() {
            sites.entry(code).or_default().push(t);
        }
    }

    let downtime = tickets.filter(|d| !d.is_empty()).and_then(|data| {
        let start = tests.iter().map(|t| t.timestamp).min()?;
        let end = tests.iter().map(|t| t.timestamp).max()?;
        let scoped = filter_tickets(data.tickets, data.locations, start, end);
        debug!(tickets = scoped.len(), "Tickets within the evaluation window");
        Some(downtime_by_site(&scoped))
    });

    sites
        .into_iter()
        .map(|(code, group)| {
            let summary = summarize(group);
            let (total_dn_time, validity) = match &downtime {
                Some(totals) => {
                    let dn = totals.get(code).copied();
                    (
                        dn,
                        Some(classify(summary.succeeded, dn.unwrap_or_else(Duration::zero))),
                    )
                }
                None => (None, None),
            };
            VsatSummary {
                site_code: code.to_string(),
                summary,
                total_dn_time,
                validity,
            }
        })
        .collect()
}
