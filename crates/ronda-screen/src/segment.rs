//! Peer groups and their per-metric value distributions.

use crate::segmentation::SegmentKey;
use ronda_data::MetricDef;
use ronda_traits::CompanyProfile;
use ronda_traits::stats::{self, Distribution};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

/// The admissible values of one metric within one segment.
///
/// Distribution statistics are computed on first use and cached.
#[derive(Debug, Clone, Default)]
pub struct MetricSample {
    values: Vec<f64>,
    distribution: OnceLock<Option<Distribution>>,
}

impl MetricSample {
    /// Build a sample; non-finite values are dropped.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().filter(|v| v.is_finite()).collect(),
            distribution: OnceLock::new(),
        }
    }

    /// The values, in member order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the sample is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cached distribution statistics; `None` for an empty sample.
    pub fn distribution(&self) -> Option<&Distribution> {
        self.distribution
            .get_or_init(|| Distribution::from_values(&self.values))
            .as_ref()
    }

    /// Percentile rank (0 to 100) of `x` within the sample.
    pub fn percentile_rank(&self, x: f64) -> Option<f64> {
        stats::percentile_rank(&self.values, x)
    }
}

/// A peer group at one as-of date.
///
/// Samples come from the members themselves, or from a pool of the
/// segment's recent filings when one is attached.
#[derive(Debug)]
pub struct Segment {
    key: SegmentKey,
    members: Vec<Arc<CompanyProfile>>,
    pool: Option<Vec<Arc<CompanyProfile>>>,
    metrics: BTreeMap<&'static str, (MetricDef, OnceLock<MetricSample>)>,
}

impl Segment {
    /// Create a segment over `members` for the given metrics.
    pub fn new(key: SegmentKey, members: Vec<Arc<CompanyProfile>>, metrics: &[MetricDef]) -> Self {
        Self {
            key,
            members,
            pool: None,
            metrics: metrics
                .iter()
                .map(|def| (def.name, (*def, OnceLock::new())))
                .collect(),
        }
    }

    /// Build samples from `pool` instead of the members.
    #[must_use]
    pub fn with_pool(mut self, pool: Vec<Arc<CompanyProfile>>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Whether samples come from an attached pool.
    pub const fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }

    /// The segment key.
    pub const fn key(&self) -> &SegmentKey {
        &self.key
    }

    /// Member profiles.
    pub fn members(&self) -> &[Arc<CompanyProfile>] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the segment has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Admissible value of `def` for one member.
    pub fn value_of(def: &MetricDef, profile: &CompanyProfile) -> Option<f64> {
        profile.metric(def.name).filter(|v| def.admits(*v))
    }

    /// Sample of a metric across members (or the pool), built once per
    /// segment.
    ///
    /// `None` when the metric was not requested for this segment.
    pub fn sample(&self, metric: &str) -> Option<&MetricSample> {
        let (def, cell) = self.metrics.get(metric)?;
        let source = self.pool.as_deref().unwrap_or(&self.members);
        Some(cell.get_or_init(|| {
            MetricSample::new(source.iter().filter_map(|p| Self::value_of(def, p)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ronda_data::MetricCatalog;

    fn member(ticker: &str, pe: Option<f64>) -> Arc<CompanyProfile> {
        Arc::new(
            CompanyProfile::builder(ticker, NaiveDate::from_ymd_opt(2020, 6, 30).unwrap())
                .metric("pe_ratio", pe)
                .build(),
        )
    }

    #[test]
    fn test_sample_drops_missing_and_inadmissible() {
        let catalog = MetricCatalog::with_defaults();
        let pe = *catalog.require("pe_ratio").unwrap();
        let segment = Segment::new(
            SegmentKey::new("Technology"),
            vec![
                member("A", Some(10.0)),
                member("B", Some(20.0)),
                member("C", None),
                member("D", Some(-5.0)),
                member("E", Some(30.0)),
            ],
            &[pe],
        );

        let sample = segment.sample("pe_ratio").unwrap();
        assert_eq!(sample.values(), &[10.0, 20.0, 30.0]);
        let dist = sample.distribution().unwrap();
        assert_relative_eq!(dist.mean, 20.0);
        // Second call hits the cache.
        assert!(std::ptr::eq(dist, sample.distribution().unwrap()));
        assert!(segment.sample("roe_calculated").is_none());
    }

    #[test]
    fn test_pool_replaces_members_in_sample() {
        let catalog = MetricCatalog::with_defaults();
        let pe = *catalog.require("pe_ratio").unwrap();
        let segment = Segment::new(
            SegmentKey::new("Technology"),
            vec![member("A", Some(10.0))],
            &[pe],
        )
        .with_pool(vec![
            member("A", Some(10.0)),
            member("A", Some(12.0)),
            member("B", Some(14.0)),
        ]);
        assert!(segment.is_pooled());
        assert_eq!(segment.len(), 1);
        assert_eq!(segment.sample("pe_ratio").unwrap().values(), &[10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_empty_sample() {
        let sample = MetricSample::new([f64::NAN]);
        assert!(sample.is_empty());
        assert!(sample.distribution().is_none());
        assert!(sample.percentile_rank(1.0).is_none());
    }
}
