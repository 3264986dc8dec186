use std::cmp::Ordering;

use crate::datamodel::Statistic;

/// Evaluate `statistic` over the present values of one row.
///
/// `None` is an undefined result: no value for min, max, mean, median and
/// std, fewer than two values for std. Count and sum are always defined.
pub fn compute(statistic: Statistic, values: &[f64]) -> Option<f64> {
    match statistic {
        Statistic::Count => Some(values.len() as f64),
        Statistic::Sum => Some(sum(values)),
        Statistic::Min => values.iter().copied().min_by(|a, b| a.total_cmp(b)),
        Statistic::Max => values.iter().copied().max_by(|a, b| a.total_cmp(b)),
        Statistic::Mean => mean(values),
        Statistic::Median => median(values),
        Statistic::Std => sample_std(values),
    }
}

pub fn sum(values: &[f64]) -> f64 {
    // Kahan summation
    let mut sum = 0.0f64;
    let mut c = 0.0f64;
    for value in values {
        let y = value - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    // Welford's online algorithm
    let mut mean = 0.0f64;
    for (count, value) in values.iter().enumerate() {
        mean += (value - mean) / (count + 1) as f64;
    }
    Some(mean)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Mean and sum of squared deviations, Welford style.
fn moments(values: &[f64]) -> (usize, f64, f64) {
    let mut mean = 0.0f64;
    let mut m2 = 0.0f64;
    let mut count = 0usize;
    for value in values {
        count += 1;
        let delta = value - mean;
        mean += delta / count as f64;
        m2 += delta * (value - mean);
    }
    (count, mean, m2)
}

/// Standard deviation with `n - 1` normalisation.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let (count, _, m2) = moments(values);
    if count < 2 {
        return None;
    }
    Some((m2 / (count - 1) as f64).sqrt())
}

/// Mean and standard deviation with `n` normalisation.
pub fn population_mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let (count, mean, m2) = moments(values);
    if count == 0 {
        return None;
    }
    Some((mean, (m2 / count as f64).sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_values() {
        let values = [10.0, 20.0];
        assert_eq!(compute(Statistic::Mean, &values), Some(15.0));
        assert_eq!(compute(Statistic::Min, &values), Some(10.0));
        assert_eq!(compute(Statistic::Max, &values), Some(20.0));
        assert_eq!(compute(Statistic::Median, &values), Some(15.0));
        assert_eq!(compute(Statistic::Count, &values), Some(2.0));
        assert_eq!(compute(Statistic::Sum, &values), Some(30.0));
        let std = compute(Statistic::Std, &values).unwrap();
        assert!((std - 7.0711).abs() < 1e-3);
    }

    #[test]
    fn test_single_value_std_is_undefined() {
        assert_eq!(compute(Statistic::Std, &[4.0]), None);
        assert_eq!(compute(Statistic::Median, &[4.0]), Some(4.0));
    }

    #[test]
    fn test_no_values() {
        assert_eq!(compute(Statistic::Count, &[]), Some(0.0));
        assert_eq!(compute(Statistic::Sum, &[]), Some(0.0));
        for statistic in [Statistic::Min, Statistic::Max, Statistic::Mean, Statistic::Median, Statistic::Std] {
            assert_eq!(compute(statistic, &[]), None);
        }
    }

    #[test]
    fn test_median_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_population_std() {
        let (mean, std) = population_mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }
}
