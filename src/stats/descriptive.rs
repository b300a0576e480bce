//! Descriptive statistics over a numeric sample

use super::round_to;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Reported values are rounded to this many decimals
const PLACES: u32 = 4;

/// Summary of a numeric sample. Every field except `count` is null for an empty sample.
///
/// Variance and standard deviation use the population denominator `N`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub variance: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
}

impl DescriptiveStats {
    /// Stats of an empty sample
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Summarize a slice; non-finite values are dropped first
    pub fn from_values(values: &[f64]) -> Self {
        Self::from_optional(values.iter().copied().map(Some))
    }

    /// Summarize a sample that may contain missing or non-numeric entries
    pub fn from_optional<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let mut data: Vec<f64> = values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .collect();
        if data.is_empty() {
            return Self::empty();
        }

        let n = data.len() as f64;
        let sum: f64 = data.iter().sum();
        let mean = sum / n;
        let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };

        Self {
            count: data.len(),
            mean: Some(round_to(mean, PLACES)),
            median: Some(round_to(median, PLACES)),
            std_dev: Some(round_to(variance.sqrt(), PLACES)),
            variance: Some(round_to(variance, PLACES)),
            min: Some(round_to(data[0], PLACES)),
            max: Some(round_to(data[data.len() - 1], PLACES)),
            sum: Some(round_to(sum, PLACES)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_all_null() {
        let s = DescriptiveStats::from_values(&[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_none());
        assert!(s.median.is_none());
        assert!(s.std_dev.is_none());
        assert!(s.variance.is_none());
        assert!(s.min.is_none());
        assert!(s.max.is_none());
        assert!(s.sum.is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn empty_serializes_nulls() {
        let json = serde_json::to_value(DescriptiveStats::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "count": 0, "mean": null, "median": null, "std_dev": null,
                "variance": null, "min": null, "max": null, "sum": null
            })
        );
    }

    #[test]
    fn all_filtered_is_empty() {
        let s = DescriptiveStats::from_optional(vec![None, Some(f64::NAN), Some(f64::INFINITY)]);
        assert_eq!(s, DescriptiveStats::empty());
    }

    #[test]
    fn population_variance() {
        let s = DescriptiveStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count, 8);
        assert_eq!(s.mean, Some(5.0));
        assert_eq!(s.variance, Some(4.0));
        assert_eq!(s.std_dev, Some(2.0));
        assert_eq!(s.median, Some(4.5));
        assert_eq!(s.min, Some(2.0));
        assert_eq!(s.max, Some(9.0));
        assert_eq!(s.sum, Some(40.0));
    }

    #[test]
    fn odd_count_median_and_rounding() {
        let s = DescriptiveStats::from_values(&[1.0, 2.0, 2.5]);
        assert_eq!(s.median, Some(2.0));
        // mean 1.8333..., variance 0.3889...
        assert_eq!(s.mean, Some(1.8333));
        assert_eq!(s.variance, Some(0.3889));
        assert_eq!(s.std_dev, Some(0.6236));
    }

    #[test]
    fn single_value_has_zero_spread() {
        let s = DescriptiveStats::from_values(&[3.5]);
        assert_eq!(s.count, 1);
        assert_eq!(s.variance, Some(0.0));
        assert_eq!(s.std_dev, Some(0.0));
        assert_eq!(s.median, Some(3.5));
    }

    #[test]
    fn missing_values_are_skipped() {
        let s = DescriptiveStats::from_optional(vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, Some(2.0));
    }
}
