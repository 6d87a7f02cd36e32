/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Quantile without interpolation: the smallest value whose rank fraction
/// `(i + 1) / n` reaches `q`. Returns `None` for empty input.
pub fn quantile_higher(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let rank = (q.clamp(0.0, 1.0) * n as f64).ceil() as usize;
    Some(sorted[rank.saturating_sub(1).min(n - 1)])
}

/// Sort key putting integer labels first, by value, then the rest by text.
pub fn label_order(label: &str) -> (bool, Option<i64>, String) {
    match label.trim().parse::<i64>() {
        Ok(n) => (false, Some(n), String::new()),
        Err(_) => (true, None, label.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }

    #[test]
    fn test_fifth_percentile_of_ten_values() {
        let values: Vec<f64> = (1..=10).rev().map(|v| (v * 10) as f64).collect();
        assert_eq!(quantile_higher(&values, 0.05), Some(10.0));
    }

    #[test]
    fn test_quantile_never_interpolates() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(quantile_higher(&values, 0.05), Some(5.0));
        assert_eq!(quantile_higher(&[3.0, 7.0], 0.5), Some(3.0));
        assert_eq!(quantile_higher(&[3.0, 7.0], 0.51), Some(7.0));
    }

    #[test]
    fn test_label_order() {
        let mut labels = vec!["10", "x", "8", "08", "abc", "-1"];
        labels.sort_by_key(|l| label_order(l));
        assert_eq!(labels, vec!["-1", "8", "08", "10", "abc", "x"]);
    }

    #[test]
    fn test_quantile_empty() {
        assert_eq!(quantile_higher(&[], 0.05), None);
    }
}
