//! Distribution statistics for segment-level outlier detection.
//!
//! All functions ignore non-finite inputs. Standard deviation defaults to the
//! population form (N denominator); the sample form is exposed separately.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Minimum threshold for standard deviation to avoid division by zero.
/// Values below this threshold are treated as zero variance.
pub const MIN_STD_THRESHOLD: f64 = 1e-10;

/// Scale factor that makes the MAD comparable to a standard deviation
/// under normality.
pub const MAD_CONSTANT: f64 = 0.6745;

/// Summary statistics of one metric within one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Number of finite observations.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation (N denominator).
    pub std: f64,
    /// Sample standard deviation (N-1 denominator).
    pub sample_std: f64,
    /// Median (linear interpolation).
    pub median: f64,
    /// First quartile.
    pub q1: f64,
    /// Third quartile.
    pub q3: f64,
    /// Interquartile range, `q3 - q1`.
    pub iqr: f64,
    /// Median absolute deviation from the median.
    pub mad: f64,
}

impl Distribution {
    /// Compute statistics over the finite values of `values`.
    ///
    /// Returns `None` when there is no finite value.
    ///
    /// # Examples
    ///
    /// ```
    /// use ronda_traits::stats::Distribution;
    ///
    /// let dist = Distribution::from_values(&[10.0, 10.0, 10.0, 10.0, 100.0]).unwrap();
    /// assert_eq!(dist.mean, 28.0);
    /// assert_eq!(dist.std, 36.0);
    /// assert_eq!(dist.median, 10.0);
    /// ```
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let array = Array1::from_vec(sorted);
        let count = array.len();
        let mean = array.mean().unwrap_or(f64::NAN);
        let std = array.std(0.0);
        let sample_std = if count > 1 { array.std(1.0) } else { 0.0 };

        let sorted = array.to_vec();
        let median = quantile_sorted(&sorted, 0.5);
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);

        let mut deviations: Vec<f64> = sorted.iter().map(|x| (x - median).abs()).collect();
        deviations.sort_by(f64::total_cmp);
        let mad = quantile_sorted(&deviations, 0.5);

        Some(Self {
            count,
            mean,
            std,
            sample_std,
            median,
            q1,
            q3,
            iqr: q3 - q1,
            mad,
        })
    }

    /// Whether the spread is too small to standardize against.
    pub fn is_degenerate(&self) -> bool {
        !(self.std > MIN_STD_THRESHOLD)
    }

    /// Distance of `x` from the mean in population standard deviations.
    ///
    /// `None` for degenerate distributions.
    pub fn z_score(&self, x: f64) -> Option<f64> {
        if self.is_degenerate() || !x.is_finite() {
            None
        } else {
            Some((x - self.mean) / self.std)
        }
    }

    /// Modified z-score `0.6745 * (x - median) / MAD`.
    ///
    /// `None` when the MAD is zero.
    pub fn modified_z_score(&self, x: f64) -> Option<f64> {
        if !(self.mad > MIN_STD_THRESHOLD) || !x.is_finite() {
            None
        } else {
            Some(MAD_CONSTANT * (x - self.median) / self.mad)
        }
    }
}

/// Quantile of an ascending-sorted slice with linear interpolation.
///
/// Returns NaN for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let weight = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Percentile rank (0 to 100) of `x` among the finite `values`.
///
/// Ties count half, so the rank of a value equal to every observation is 50.
pub fn percentile_rank(values: &[f64], x: f64) -> Option<f64> {
    let mut below = 0usize;
    let mut equal = 0usize;
    let mut n = 0usize;
    for v in values.iter().filter(|v| v.is_finite()) {
        n += 1;
        if *v < x {
            below += 1;
        } else if *v == x {
            equal += 1;
        }
    }
    if n == 0 || !x.is_finite() {
        return None;
    }
    Some(100.0 * (below as f64 + 0.5 * equal as f64) / n as f64)
}

/// Mean of the finite values, or `None` when there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    }
}

/// Median of the finite values, or `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    Some(quantile_sorted(&finite, 0.5))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distribution_basic() {
        let dist = Distribution::from_values(&[10.0, 10.0, 10.0, 10.0, 100.0]).unwrap();
        assert_eq!(dist.count, 5);
        assert_relative_eq!(dist.mean, 28.0);
        assert_relative_eq!(dist.std, 36.0);
        assert_relative_eq!(dist.sample_std, 1620.0_f64.sqrt());
        assert_relative_eq!(dist.median, 10.0);
        assert_relative_eq!(dist.iqr, 0.0);
        assert_relative_eq!(dist.mad, 0.0);
        assert_eq!(dist.z_score(100.0), Some(2.0));
    }

    #[test]
    fn test_distribution_ignores_non_finite() {
        let dist = Distribution::from_values(&[1.0, f64::NAN, 3.0, f64::INFINITY]).unwrap();
        assert_eq!(dist.count, 2);
        assert_relative_eq!(dist.mean, 2.0);
        assert_relative_eq!(dist.median, 2.0);
    }

    #[test]
    fn test_distribution_empty() {
        assert!(Distribution::from_values(&[]).is_none());
        assert!(Distribution::from_values(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_constant_values_are_degenerate() {
        let dist = Distribution::from_values(&[5.0; 6]).unwrap();
        assert!(dist.is_degenerate());
        assert_eq!(dist.z_score(5.0), None);
        assert_eq!(dist.modified_z_score(5.0), None);
    }

    #[test]
    fn test_quartiles() {
        let dist = Distribution::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_relative_eq!(dist.q1, 2.0);
        assert_relative_eq!(dist.q3, 4.0);
        assert_relative_eq!(dist.iqr, 2.0);
        assert_relative_eq!(dist.mad, 1.0);
    }

    #[test]
    fn test_quantile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile_sorted(&sorted, 0.5), 2.5);
        assert_relative_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_relative_eq!(quantile_sorted(&sorted, 1.0), 4.0);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_percentile_rank() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile_rank(&values, 4.0).unwrap(), 87.5);
        assert_relative_eq!(percentile_rank(&values, 0.0).unwrap(), 0.0);
        assert_relative_eq!(percentile_rank(&[7.0, 7.0], 7.0).unwrap(), 50.0);
        assert_eq!(percentile_rank(&[], 1.0), None);
    }

    #[test]
    fn test_mean_and_median_helpers() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, f64::NAN]).unwrap(), 1.5);
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
    }
}
