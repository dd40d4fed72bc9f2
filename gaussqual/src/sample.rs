//! Grey-value samples fed to the mixture fitter.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed grey-value interval used to threshold a sample before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Builds a range from two bounds given in either order.
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if a.is_nan() || b.is_nan() {
            return Err(Error::invalid("value_range", "bounds must not be NaN"));
        }
        Ok(Self {
            min: a.min(b),
            max: a.max(b),
        })
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Immutable multiset of grey values. Non-finite values are dropped on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new(mut values: Vec<f64>) -> Self {
        values.retain(|v| v.is_finite());
        Self { values }
    }

    pub fn from_pixels(pixels: &[f32]) -> Self {
        Self::new(pixels.iter().map(|&p| p as f64).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keeps only the values inside `range`.
    pub fn restrict(mut self, range: ValueRange) -> Self {
        self.values.retain(|&v| range.contains(v));
        self
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let sum_sq: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        Some((sum_sq / self.values.len() as f64).sqrt())
    }

    /// Collapses the sample into ascending distinct values with multiplicities.
    ///
    /// Grey values are usually integers of limited bit depth, so this turns
    /// millions of pixels into a few thousand weighted points.
    pub(crate) fn histogram(&self) -> Vec<(f64, f64)> {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);

        let mut points: Vec<(f64, f64)> = Vec::new();
        for v in sorted {
            match points.last_mut() {
                Some((last, count)) if *last == v => *count += 1.0,
                _ => points.push((v, 1.0)),
            }
        }
        points
    }
}

impl From<Vec<f64>> for Sample {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_values_dropped() {
        let sample = Sample::new(vec![1.0, f64::NAN, 2.0, f64::INFINITY, f64::NEG_INFINITY]);
        assert_eq!(sample.values(), &[1.0, 2.0]);
    }

    #[test]
    fn test_restrict_is_inclusive() {
        let sample = Sample::new(vec![0.0, 10.0, 20.0, 30.0, 40.0]);
        let range = ValueRange::new(30.0, 10.0).unwrap();
        assert_eq!(range.min, 10.0);
        assert_eq!(sample.restrict(range).values(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_restrict_can_empty_the_sample() {
        let sample = Sample::new(vec![1.0, 2.0]);
        let range = ValueRange::new(5.0, 6.0).unwrap();
        assert!(sample.restrict(range).is_empty());
    }

    #[test]
    fn test_nan_range_rejected() {
        assert!(ValueRange::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_statistics() {
        let sample = Sample::new(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(sample.min_max(), Some((2.0, 9.0)));
        assert!((sample.mean().unwrap() - 5.0).abs() < 1e-12);
        assert!((sample.std_dev().unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_statistics() {
        let sample = Sample::default();
        assert_eq!(sample.min_max(), None);
        assert_eq!(sample.mean(), None);
        assert_eq!(sample.std_dev(), None);
    }

    #[test]
    fn test_histogram_counts_duplicates() {
        let sample = Sample::new(vec![3.0, 1.0, 3.0, 2.0, 3.0, 1.0]);
        assert_eq!(sample.histogram(), vec![(1.0, 2.0), (2.0, 1.0), (3.0, 3.0)]);
    }

    #[test]
    fn test_from_pixels() {
        let sample = Sample::from_pixels(&[0.5, 255.0, f32::NAN]);
        assert_eq!(sample.values(), &[0.5, 255.0]);
    }
}
