//! Pass/fail evaluation and concurrency detection.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use crate::cache::CacheStore;
use crate::error::Result;
use crate::records::{TestColumn, TestRecord, TestTable};

/// Default half-width of the window used to find overlapping tests.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// Largest accepted half-width: one day.
pub const MAX_WINDOW_SECS: i64 = 86_400;

/// Window for `secs`, or `None` outside `0..=MAX_WINDOW_SECS`.
pub fn window_from_secs(secs: i64) -> Option<Duration> {
    (0..=MAX_WINDOW_SECS)
        .contains(&secs)
        .then(|| Duration::seconds(secs))
}

/// `expected <= found`, undefined when either side is missing.
fn meets(expected: Option<f64>, found: Option<f64>) -> Option<bool> {
    Some(expected? <= found?)
}

/// For every successful test, counts the other non-failed tests whose
/// timestamp lies within `[t - window, t + window]`. Other tests get `None`.
///
/// Sorted sweep with two monotone pointers over the non-failed timestamps.
pub fn concurrency_counts(records: &[TestRecord], window: Duration) -> Vec<Option<usize>> {
    let mut active: Vec<NaiveDateTime> = records
        .iter()
        .filter(|r| !r.is_failed())
        .map(|r| r.timestamp)
        .collect();
    active.sort_unstable();

    let mut order: Vec<usize> = (0..records.len())
        .filter(|&i| records[i].is_succeeded())
        .collect();
    order.sort_by_key(|&i| records[i].timestamp);

    let mut counts = vec![None; records.len()];
    let (mut lo, mut hi) = (0usize, 0usize);
    for i in order {
        let t = records[i].timestamp;
        let start = t.checked_sub_signed(window).unwrap_or(NaiveDateTime::MIN);
        let end = t.checked_add_signed(window).unwrap_or(NaiveDateTime::MAX);
        while lo < active.len() && active[lo] < start {
            lo += 1;
        }
        while hi < active.len() && active[hi] <= end {
            hi += 1;
        }
        // the test itself is always inside its own window
        counts[i] = Some((hi - lo).saturating_sub(1));
    }
    counts
}

/// Adds `dn_pass`, `up_pass`, `pass`, `concurrent_tests` and `date`.
#[tracing::instrument(skip_all, fields(tests = table.len(), window_secs = window.num_seconds()))]
pub fn eval_tests(table: TestTable, window: Duration) -> TestTable {
    let TestTable {
        mut columns,
        mut records,
    } = table;

    for record in &mut records {
        record.dn_pass = meets(record.exp_dn_br, record.dn_br);
        record.up_pass = meets(record.exp_up_br, record.up_br);
        record.pass = match (record.dn_pass, record.up_pass) {
            (Some(dn), Some(up)) => Some(dn && up),
            _ => None,
        };
        record.date = Some(record.timestamp.date());
    }

    let counts = concurrency_counts(&records, window);
    for (record, count) in records.iter_mut().zip(counts) {
        record.concurrent_tests = count;
    }

    for column in [
        TestColumn::DnPass,
        TestColumn::UpPass,
        TestColumn::Pass,
        TestColumn::ConcurrentTests,
        TestColumn::Date,
    ] {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }

    let concurrent = records
        .iter()
        .filter(|r| r.concurrent_tests.is_some_and(|n| n >= 1))
        .count();
    info!(concurrent, "Tests evaluated");

    TestTable::new(columns, records)
}

/// Evaluates and, when a cache slot is given, stores the enriched table.
pub fn eval_and_cache(
    table: TestTable,
    window: Duration,
    cache: Option<(&dyn CacheStore, &str)>,
) -> Result<TestTable> {
    let evaluated = eval_tests(table, window);
    if let Some((store, key)) = cache {
        store.store(key, &evaluated)?;
    }
    Ok(evaluated)
}

/// Drops tests that overlapped at least one other test.
pub fn drop_concurrent(table: TestTable) -> TestTable {
    let before = table.len();
    let records: Vec<TestRecord> = table
        .records
        .iter()
        .filter(|r| !r.concurrent_tests.is_some_and(|n| n >= 1))
        .cloned()
        .collect();
    debug!(dropped = before - records.len(), "Concurrent tests removed");
    table.with_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Outcome;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    fn at(secs: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + Duration::seconds(secs)
    }

    fn test(secs: i64, res: Outcome) -> TestRecord {
        let mut r = TestRecord::new("70001-A", at(secs));
        r.res = Some(res);
        r
    }

    fn rated(exp_dn: f64, dn: f64, exp_up: f64, up: f64) -> TestRecord {
        let mut r = test(0, Outcome::Succeeded);
        r.exp_dn_br = Some(exp_dn);
        r.dn_br = Some(dn);
        r.exp_up_br = Some(exp_up);
        r.up_br = Some(up);
        r
    }

    fn evaluate(records: Vec<TestRecord>) -> Vec<TestRecord> {
        eval_tests(TestTable::new(vec![], records), Duration::seconds(60)).records
    }

    #[test]
    fn test_pass_flags() {
        let out = evaluate(vec![
            rated(10.0, 10.0, 2.0, 3.0),
            rated(10.0, 9.0, 2.0, 3.0),
            rated(10.0, 11.0, 2.0, 1.0),
        ]);
        assert_eq!(out[0].pass, Some(true));
        assert_eq!((out[1].dn_pass, out[1].up_pass, out[1].pass), (Some(false), Some(true), Some(false)));
        assert_eq!((out[2].dn_pass, out[2].up_pass, out[2].pass), (Some(true), Some(false), Some(false)));
    }

    #[test]
    fn test_missing_rate_leaves_pass_undefined() {
        let mut r = rated(10.0, 12.0, 2.0, 3.0);
        r.up_br = None;
        let out = evaluate(vec![r]);
        assert_eq!(out[0].dn_pass, Some(true));
        assert_eq!(out[0].up_pass, None);
        assert_eq!(out[0].pass, None);
    }

    #[test]
    fn test_simultaneous_successes_count_n_minus_one() {
        let records: Vec<_> = (0..7).map(|_| test(0, Outcome::Succeeded)).collect();
        let out = evaluate(records);
        assert!(out.iter().all(|r| r.concurrent_tests == Some(6)));
    }

    #[test]
    fn test_window_is_inclusive_and_skips_failed() {
        let out = evaluate(vec![
            test(0, Outcome::Succeeded),
            test(60, Outcome::Other("timeout".into())),
            test(-60, Outcome::Failed),
            test(61, Outcome::Succeeded),
        ]);
        // +60 is inside, the failed test and +61 are not
        assert_eq!(out[0].concurrent_tests, Some(1));
        assert_eq!(out[1].concurrent_tests, None);
        assert_eq!(out[2].concurrent_tests, None);
        // 61 sees the non-failed test at 60 and the success at 0 is 61s away
        assert_eq!(out[3].concurrent_tests, Some(1));
    }

    #[test]
    fn test_sweep_matches_pairwise_count() {
        let offsets = [0, 5, 200, 30, 100, 101, 160, 161, 400, -20];
        let records: Vec<_> = offsets
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let res = if i % 4 == 3 {
                    Outcome::Failed
                } else {
                    Outcome::Succeeded
                };
                test(s, res)
            })
            .collect();

        let w = Duration::seconds(60);
        let swept = concurrency_counts(&records, w);
        for (i, r) in records.iter().enumerate() {
            let expected = r.is_succeeded().then(|| {
                records
                    .iter()
                    .filter(|o| !o.is_failed())
                    .filter(|o| o.timestamp >= r.timestamp - w && o.timestamp <= r.timestamp + w)
                    .count()
                    - 1
            });
            assert_eq!(swept[i], expected, "record {i}");
        }
    }

    #[test]
    fn test_oversized_window_saturates() {
        let records = vec![
            test(0, Outcome::Succeeded),
            test(86_400 * 365, Outcome::Succeeded),
        ];
        let counts = concurrency_counts(&records, Duration::seconds(10_000_000_000_000));
        assert_eq!(counts, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_window_from_secs_bounds() {
        assert_eq!(window_from_secs(0), Some(Duration::zero()));
        assert_eq!(window_from_secs(MAX_WINDOW_SECS), Some(Duration::days(1)));
        assert_eq!(window_from_secs(-1), None);
        assert_eq!(window_from_secs(10_000_000_000_000), None);
    }

    #[test]
    fn test_date_derived() {
        let out = evaluate(vec![test(0, Outcome::Succeeded)]);
        assert_eq!(out[0].date, NaiveDate::from_ymd_opt(2023, 3, 1));
    }

    #[test]
    fn test_drop_concurrent_keeps_undefined() {
        let table = eval_tests(
            TestTable::new(
                vec![],
                vec![
                    test(0, Outcome::Succeeded),
                    test(10, Outcome::Succeeded),
                    test(500, Outcome::Succeeded),
                    test(1000, Outcome::Failed),
                ],
            ),
            Duration::seconds(60),
        );
        let kept = drop_concurrent(table);
        assert_eq!(kept.len(), 2);
    }

    struct RecordingCache(RefCell<Vec<(String, usize)>>);

    impl CacheStore for RecordingCache {
        fn store(&self, key: &str, table: &TestTable) -> Result<()> {
            self.0.borrow_mut().push((key.to_string(), table.len()));
            Ok(())
        }
    }

    #[test]
    fn test_eval_and_cache_stores_under_key() {
        let cache = RecordingCache(RefCell::new(Vec::new()));
        let table = TestTable::new(vec![], vec![test(0, Outcome::Succeeded)]);
        let store: &dyn CacheStore = &cache;
        eval_and_cache(table, Duration::seconds(60), Some((store, "march"))).unwrap();
        assert_eq!(cache.0.borrow().as_slice(), &[("march".to_string(), 1)]);
    }
}
