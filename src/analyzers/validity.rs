use chrono::Duration;

use crate::analyzers::types::Validity;

/// Successful tests needed for a site to count as valid on its own.
pub const MIN_TESTS: usize = 30;
/// Successful tests needed when a long outage explains the shortfall.
pub const MIN_TESTS_WITH_OUTAGE: usize = 15;

/// Classifies a site from its successful test count and total outage time.
///
/// | succeeded | downtime | validity               |
/// |-----------|----------|------------------------|
/// | >= 30     | any      | valid                  |
/// | < 30      | < 1 day  | < 30 tests             |
/// | 15..30    | >= 1 day | valid                  |
/// | < 15      | >= 1 day | > 24 hr & < 15 tests   |
pub fn classify(succeeded: usize, total_dn_time: Duration) -> Validity {
    match succeeded {
        n if n >= MIN_TESTS => Validity::Valid,
        _ if total_dn_time < Duration::days(1) => Validity::FewTests,
        n if n < MIN_TESTS_WITH_OUTAGE => Validity::OutageFewTests,
        _ => Validity::Valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(30, Duration::zero()), Validity::Valid);
        assert_eq!(classify(29, Duration::zero()), Validity::FewTests);
        assert_eq!(classify(29, Duration::hours(23)), Validity::FewTests);
        assert_eq!(classify(15, Duration::days(1)), Validity::Valid);
        assert_eq!(classify(14, Duration::days(1)), Validity::OutageFewTests);
        assert_eq!(classify(0, Duration::days(3)), Validity::OutageFewTests);
    }
}
