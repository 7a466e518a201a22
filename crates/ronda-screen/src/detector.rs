//! Outlier detectors and their registry.
//!
//! A detector looks at one segment's sample of a metric and one company's
//! value, and returns an [`OutlierVerdict`]. Detectors never see missing
//! values: the screening engine filters them and enforces the minimum segment
//! size before calling. Polarity comes from the metric catalog.
//!
//! Built-in detectors:
//!
//! - `sigma` - `|x - mean| / std > k`, population standard deviation
//! - `ratio_to_mean` - `x / mean > k` or `< 1/k`
//! - `mad` - modified z-score `0.6745 (x - median) / MAD` beyond a threshold
//! - `percentile` - rank percentile in the top or bottom tail

use crate::segment::MetricSample;
use ronda_traits::stats::MIN_STD_THRESHOLD;
use ronda_traits::{OutlierVerdict, Polarity, Result, RondaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A detection strategy.
pub type DetectorFn = Arc<dyn Fn(&MetricSample, f64, Polarity) -> OutlierVerdict + Send + Sync>;

/// Thresholds for the built-in detectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sigma distance beyond which a value is flagged.
    pub sigma_threshold: f64,
    /// Ratio to the segment mean beyond which (or below whose inverse) a
    /// value is flagged.
    pub ratio_threshold: f64,
    /// Modified z-score beyond which a value is flagged.
    pub mad_threshold: f64,
    /// Percentile rank at or above which (or at or below `100 - p`) a value
    /// is flagged.
    pub percentile: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sigma_threshold: 2.0,
            ratio_threshold: 2.0,
            mad_threshold: 3.5,
            percentile: 90.0,
        }
    }
}

/// Sigma-threshold verdict.
///
/// Flags when the population z-score exceeds `k` in absolute value (strictly).
/// A zero or near-zero standard deviation flags nothing.
pub fn sigma_verdict(
    sample: &MetricSample,
    subject: f64,
    polarity: Polarity,
    k: f64,
) -> OutlierVerdict {
    let Some(z) = sample.distribution().and_then(|d| d.z_score(subject)) else {
        return OutlierVerdict::unflagged(0.0);
    };
    OutlierVerdict::new(z, z.abs(), z.abs() > k, z > 0.0, polarity)
}

/// Ratio-to-mean verdict.
///
/// Flags when `subject / mean` is above `k` or below `1 / k`. A near-zero or
/// negative mean, or a non-positive ratio, flags nothing. The magnitude is
/// `max(r, 1/r)` so both tails rank on one scale.
pub fn ratio_verdict(
    sample: &MetricSample,
    subject: f64,
    polarity: Polarity,
    k: f64,
) -> OutlierVerdict {
    let Some(dist) = sample.distribution() else {
        return OutlierVerdict::unflagged(0.0);
    };
    if dist.mean <= MIN_STD_THRESHOLD {
        return OutlierVerdict::unflagged(0.0);
    }
    let r = subject / dist.mean;
    if r <= 0.0 || !r.is_finite() {
        return OutlierVerdict::unflagged(r);
    }
    let flagged = r > k || r < 1.0 / k;
    OutlierVerdict::new(r, r.max(1.0 / r), flagged, r > 1.0, polarity)
}

/// Modified z-score verdict using the median absolute deviation.
///
/// A zero MAD flags nothing.
pub fn mad_verdict(
    sample: &MetricSample,
    subject: f64,
    polarity: Polarity,
    threshold: f64,
) -> OutlierVerdict {
    let Some(m) = sample.distribution().and_then(|d| d.modified_z_score(subject)) else {
        return OutlierVerdict::unflagged(0.0);
    };
    OutlierVerdict::new(m, m.abs(), m.abs() > threshold, m > 0.0, polarity)
}

/// Percentile-rank verdict.
///
/// The score is the rank centered on 50. Flags when the rank is at least `p`
/// or at most `100 - p`.
pub fn percentile_verdict(
    sample: &MetricSample,
    subject: f64,
    polarity: Polarity,
    p: f64,
) -> OutlierVerdict {
    let Some(rank) = sample.percentile_rank(subject) else {
        return OutlierVerdict::unflagged(0.0);
    };
    let score = rank - 50.0;
    let flagged = rank >= p || rank <= 100.0 - p;
    OutlierVerdict::new(score, score.abs(), flagged, score > 0.0, polarity)
}

/// Metadata about a registered detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorInfo {
    /// Registered name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

struct Entry {
    description: String,
    func: DetectorFn,
}

/// Name to detector mapping.
#[derive(Default)]
pub struct DetectorRegistry {
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for DetectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorRegistry")
            .field("names", &self.list())
            .finish()
    }
}

impl DetectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in detectors with the given thresholds.
    pub fn with_defaults(config: &DetectorConfig) -> Self {
        let DetectorConfig {
            sigma_threshold,
            ratio_threshold,
            mad_threshold,
            percentile,
        } = *config;
        let mut registry = Self::new();
        registry.insert(
            "sigma",
            format!("|x - mean| / std > {sigma_threshold}"),
            Arc::new(move |s: &MetricSample, x: f64, p: Polarity| {
                sigma_verdict(s, x, p, sigma_threshold)
            }),
        );
        registry.insert(
            "ratio_to_mean",
            format!("x / mean > {ratio_threshold} or < 1/{ratio_threshold}"),
            Arc::new(move |s: &MetricSample, x: f64, p: Polarity| {
                ratio_verdict(s, x, p, ratio_threshold)
            }),
        );
        registry.insert(
            "mad",
            format!("|modified z| > {mad_threshold}"),
            Arc::new(move |s: &MetricSample, x: f64, p: Polarity| {
                mad_verdict(s, x, p, mad_threshold)
            }),
        );
        registry.insert(
            "percentile",
            format!("rank >= {percentile} or <= {}", 100.0 - percentile),
            Arc::new(move |s: &MetricSample, x: f64, p: Polarity| {
                percentile_verdict(s, x, p, percentile)
            }),
        );
        registry
    }

    fn insert(&mut self, name: &str, description: String, func: DetectorFn) {
        self.entries
            .insert(name.to_string(), Entry { description, func });
    }

    /// Register a detector under a new name.
    ///
    /// # Errors
    ///
    /// [`RondaError::DuplicateRegistration`] if the name is taken.
    pub fn register<F>(&mut self, name: &str, description: &str, func: F) -> Result<()>
    where
        F: Fn(&MetricSample, f64, Polarity) -> OutlierVerdict + Send + Sync + 'static,
    {
        if self.entries.contains_key(name) {
            return Err(RondaError::DuplicateRegistration(name.to_string()));
        }
        self.insert(name, description.to_string(), Arc::new(func));
        Ok(())
    }

    /// Look up a detector.
    pub fn get(&self, name: &str) -> Option<DetectorFn> {
        self.entries.get(name).map(|e| Arc::clone(&e.func))
    }

    /// Look up a detector, failing on unknown names.
    ///
    /// # Errors
    ///
    /// [`RondaError::UnknownDetector`].
    pub fn require(&self, name: &str) -> Result<DetectorFn> {
        self.get(name)
            .ok_or_else(|| RondaError::UnknownDetector(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Names with descriptions, sorted by name.
    pub fn infos(&self) -> Vec<DetectorInfo> {
        self.entries
            .iter()
            .map(|(name, e)| DetectorInfo {
                name: name.clone(),
                description: e.description.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ronda_traits::Direction;

    fn sample(values: &[f64]) -> MetricSample {
        MetricSample::new(values.iter().copied())
    }

    #[test]
    fn test_sigma_threshold_is_strict() {
        let s = sample(&[10.0, 10.0, 10.0, 10.0, 100.0]);
        let v = sigma_verdict(&s, 100.0, Polarity::HigherIsBetter, 2.0);
        assert_eq!(v.score, 2.0);
        assert!(!v.flagged);
        assert_eq!(v.direction, None);

        let v = sigma_verdict(&s, 100.0, Polarity::HigherIsBetter, 1.9);
        assert!(v.flagged);
        assert_eq!(v.direction, Some(Direction::Favorable));

        let v = sigma_verdict(&s, 100.0, Polarity::LowerIsBetter, 1.9);
        assert_eq!(v.direction, Some(Direction::Unfavorable));
    }

    #[test]
    fn test_sigma_identical_values_flag_nothing() {
        let s = sample(&[7.0; 6]);
        let v = sigma_verdict(&s, 7.0, Polarity::HigherIsBetter, 0.5);
        assert!(!v.flagged);
        assert_eq!(v.magnitude, 0.0);
    }

    #[test]
    fn test_ratio_to_mean() {
        // mean = 10
        let s = sample(&[2.0, 4.0, 6.0, 8.0, 30.0]);
        let high = ratio_verdict(&s, 30.0, Polarity::LowerIsBetter, 2.0);
        assert!(high.flagged);
        assert_relative_eq!(high.score, 3.0);
        assert_eq!(high.direction, Some(Direction::Unfavorable));

        let low = ratio_verdict(&s, 2.0, Polarity::LowerIsBetter, 2.0);
        assert!(low.flagged);
        assert_relative_eq!(low.magnitude, 5.0);
        assert_eq!(low.direction, Some(Direction::Favorable));

        let mid = ratio_verdict(&s, 8.0, Polarity::LowerIsBetter, 2.0);
        assert!(!mid.flagged);
    }

    #[test]
    fn test_ratio_degenerate_mean() {
        let s = sample(&[-5.0, -1.0, 0.0, 1.0, 5.0]);
        assert!(!ratio_verdict(&s, 5.0, Polarity::HigherIsBetter, 2.0).flagged);

        let s = sample(&[-20.0, 1.0, 2.0, 3.0, 30.0]);
        // mean 3.2, negative ratio
        assert!(!ratio_verdict(&s, -20.0, Polarity::HigherIsBetter, 2.0).flagged);
    }

    #[test]
    fn test_mad() {
        // median 10, MAD 1
        let s = sample(&[9.0, 10.0, 10.0, 11.0, 50.0]);
        let v = mad_verdict(&s, 50.0, Polarity::HigherIsBetter, 3.5);
        assert!(v.flagged);
        assert_relative_eq!(v.score, 0.6745 * 40.0);
        assert!(!mad_verdict(&s, 11.0, Polarity::HigherIsBetter, 3.5).flagged);
    }

    #[test]
    fn test_percentile() {
        let s = sample(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let top = percentile_verdict(&s, 10.0, Polarity::HigherIsBetter, 90.0);
        assert_relative_eq!(top.score, 45.0);
        assert!(top.flagged);
        let bottom = percentile_verdict(&s, 1.0, Polarity::HigherIsBetter, 90.0);
        assert!(bottom.flagged);
        assert_eq!(bottom.direction, Some(Direction::Unfavorable));
        assert!(!percentile_verdict(&s, 5.0, Polarity::HigherIsBetter, 90.0).flagged);
    }

    #[test]
    fn test_registry() {
        let mut registry = DetectorRegistry::with_defaults(&DetectorConfig::default());
        assert_eq!(registry.list(), vec!["mad", "percentile", "ratio_to_mean", "sigma"]);

        let err = registry
            .register("sigma", "again", |_, _, _| OutlierVerdict::unflagged(0.0))
            .unwrap_err();
        assert!(matches!(err, RondaError::DuplicateRegistration(_)));

        registry
            .register("never", "Flags nothing", |_, _, _| OutlierVerdict::unflagged(0.0))
            .unwrap();
        assert!(registry.get("never").is_some());
        assert!(matches!(
            registry.require("missing"),
            Err(RondaError::UnknownDetector(_))
        ));
    }

    #[test]
    fn test_custom_threshold_flows_through_registry() {
        let config = DetectorConfig {
            sigma_threshold: 1.9,
            ..Default::default()
        };
        let registry = DetectorRegistry::with_defaults(&config);
        let s = sample(&[10.0, 10.0, 10.0, 10.0, 100.0]);
        let sigma = registry.require("sigma").unwrap();
        assert!(sigma(&s, 100.0, Polarity::HigherIsBetter).flagged);
    }
}
