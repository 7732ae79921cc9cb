//! Metrics engine.
//!
//! Pure computations over the windowed record sets the collectors produce:
//!
//! - [`github`] - PR, review, and contributor statistics
//! - [`jira`] - throughput, WIP, bug counts, weekly scope trend
//! - [`dora`] - the four DORA indicators and their classification
//! - [`score`] - min-max-normalized composite performance score
//!
//! Aggregation is commutative under its inputs; nothing here depends on the
//! order workers delivered records in.

pub mod dora;
pub mod github;
pub mod jira;
pub mod score;

/// Median of a sample. `None` on an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Percentile over a sorted copy, linearly interpolated between
/// neighboring ranks. `None` on an empty slice.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        Some(sorted[low])
    } else {
        // Linear interpolation between the neighbors
        let weight = rank - low as f64;
        Some(sorted[low] * (1.0 - weight) + sorted[high] * weight)
    }
}

/// Arithmetic mean. `None` on an empty slice.
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_sample() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn median_of_even_sample_interpolates() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn empty_sample_has_no_stats() {
        assert_eq!(median(&[]), None);
        assert_eq!(percentile(&[], 95.0), None);
        assert_eq!(average(&[]), None);
    }

    #[test]
    fn p95_near_the_top() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        let p95 = percentile(&values, 95.0).unwrap();
        assert!((p95 - 95.05).abs() < 0.1);
    }

    #[test]
    fn single_value_is_every_percentile() {
        assert_eq!(percentile(&[42.0], 5.0), Some(42.0));
        assert_eq!(percentile(&[42.0], 95.0), Some(42.0));
    }

    #[test]
    fn average_of_sample() {
        assert_eq!(average(&[2.0, 4.0]), Some(3.0));
    }
}
