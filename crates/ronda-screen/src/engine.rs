//! The screening engine.
//!
//! One screening pass runs in five steps:
//!
//! 1. Resolve the segmentation, detector and metric names (fail before any work)
//! 2. Take a point-in-time snapshot of the dataset at the as-of date
//! 3. Apply the sector and market-cap prefilters
//! 4. Bucket companies into segments with the named segmentation
//! 5. Per segment and metric, build the sample, enforce the size floor and
//!    run the detector for every member with a value
//!
//! With `window_days` set, step 5 samples the segment's filings from the
//! trailing window instead of only the members' current values.
//!
//! Segments are evaluated in parallel; results are sorted afterwards so the
//! output is identical for identical inputs.

use crate::detector::{DetectorConfig, DetectorFn, DetectorRegistry};
use crate::segment::Segment;
use crate::segmentation::{SegmentKey, SegmentationFn, SegmentationRegistry};
use rayon::prelude::*;
use ronda_data::{DEFAULT_REPORTING_DELAY_DAYS, MetricDef, PointInTimeDataset};
use ronda_traits::stats::Distribution;
use ronda_traits::{CompanyProfile, Date, OutlierVerdict, Polarity, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::sync::Arc;
use tracing::{debug, info};

/// Screening configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningConfig {
    /// Days between a filing's availability and its use.
    pub reporting_delay_days: i64,
    /// Segments with fewer values than this for a metric produce no results
    /// for that metric.
    pub min_segment_size: usize,
    /// Thresholds for the built-in detectors.
    pub detectors: DetectorConfig,
    /// Sample each segment from every filing that became knowable this many
    /// days before the cutoff, rather than from current values only.
    pub window_days: Option<i64>,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            reporting_delay_days: DEFAULT_REPORTING_DELAY_DAYS,
            min_segment_size: 5,
            detectors: DetectorConfig::default(),
            window_days: None,
        }
    }
}

/// Market-capitalization range, bounds inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapFilter {
    /// Lower bound in dollars.
    pub min: Option<f64>,
    /// Upper bound in dollars.
    pub max: Option<f64>,
}

impl CapFilter {
    /// A range filter.
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Whether the filter accepts everything.
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Whether a company with this market cap passes. An unknown cap only
    /// passes an unbounded filter.
    pub fn admits(&self, market_cap: Option<f64>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(cap) = market_cap.filter(|c| c.is_finite()) else {
            return false;
        };
        self.min.is_none_or(|min| cap >= min) && self.max.is_none_or(|max| cap <= max)
    }
}

/// Parameters of one screening pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRequest {
    /// The as-of date.
    pub as_of: Date,
    /// Registered segmentation name.
    pub segmentation: String,
    /// Registered detector name.
    pub detector: String,
    /// Metric names; empty means the whole catalog.
    pub metrics: Vec<String>,
    /// Sectors to keep (case-insensitive); empty keeps all.
    pub sector_filter: Vec<String>,
    /// Market-cap range to keep.
    pub cap_filter: CapFilter,
}

impl ScreenRequest {
    /// A request with sector segmentation, the sigma detector and every metric.
    pub fn new(as_of: Date) -> Self {
        Self {
            as_of,
            segmentation: "sector".to_string(),
            detector: "sigma".to_string(),
            metrics: Vec::new(),
            sector_filter: Vec::new(),
            cap_filter: CapFilter::default(),
        }
    }

    /// Set the segmentation.
    #[must_use]
    pub fn with_segmentation(mut self, name: impl Into<String>) -> Self {
        self.segmentation = name.into();
        self
    }

    /// Set the detector.
    #[must_use]
    pub fn with_detector(mut self, name: impl Into<String>) -> Self {
        self.detector = name.into();
        self
    }

    /// Restrict the metrics.
    #[must_use]
    pub fn with_metrics<S: Into<String>>(mut self, metrics: impl IntoIterator<Item = S>) -> Self {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the sectors.
    #[must_use]
    pub fn with_sectors<S: Into<String>>(mut self, sectors: impl IntoIterator<Item = S>) -> Self {
        self.sector_filter = sectors.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the market-cap range.
    #[must_use]
    pub const fn with_cap_filter(mut self, cap_filter: CapFilter) -> Self {
        self.cap_filter = cap_filter;
        self
    }

    /// The same request bound to another date.
    #[must_use]
    pub fn at(&self, as_of: Date) -> Self {
        Self {
            as_of,
            ..self.clone()
        }
    }

    fn admits_sector(&self, sector: Option<&str>) -> bool {
        self.sector_filter.is_empty()
            || sector.is_some_and(|s| self.sector_filter.iter().any(|f| f.eq_ignore_ascii_case(s)))
    }
}

/// One (company, metric, as-of date) evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenResult {
    /// The company as seen at the as-of date.
    pub profile: Arc<CompanyProfile>,
    /// The peer group it was compared against.
    pub segment: SegmentKey,
    /// Metric name.
    pub metric: String,
    /// Whether high or low values of the metric are desirable.
    pub polarity: Polarity,
    /// The company's metric value.
    pub value: f64,
    /// Statistics of the sample the value was compared against.
    pub segment_stats: Option<Distribution>,
    /// Detector output.
    pub verdict: OutlierVerdict,
    /// Forward returns by horizon label; `None` for a missing price. Empty
    /// until a backtest fills it.
    pub forward_returns: BTreeMap<String, Option<f64>>,
}

impl ScreenResult {
    /// Ticker of the screened company.
    pub fn ticker(&self) -> &str {
        self.profile.ticker()
    }

    /// The as-of date.
    pub fn as_of(&self) -> Date {
        self.profile.as_of()
    }
}

/// Why companies produced no result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionReport {
    /// Companies with no knowable (or only stale) record at the cutoff.
    pub missing_data: usize,
    /// Companies removed by the sector or market-cap prefilter.
    pub filtered_out: usize,
    /// Companies the segmentation could not classify.
    pub unresolved_segment: usize,
    /// (company, metric) pairs in segments below the size floor.
    pub small_segment: usize,
    /// (company, metric) pairs without an admissible value.
    pub missing_metric: usize,
}

impl AddAssign for ExclusionReport {
    fn add_assign(&mut self, rhs: Self) {
        self.missing_data += rhs.missing_data;
        self.filtered_out += rhs.filtered_out;
        self.unresolved_segment += rhs.unresolved_segment;
        self.small_segment += rhs.small_segment;
        self.missing_metric += rhs.missing_metric;
    }
}

/// Output of one screening pass.
#[derive(Debug, Clone)]
pub struct ScreenOutcome {
    /// The as-of date.
    pub as_of: Date,
    /// The availability cutoff the snapshot used.
    pub cutoff: Date,
    /// Every evaluation, ordered by metric, magnitude (descending), ticker.
    pub results: Vec<ScreenResult>,
    /// Companies that reached a segment, ordered by ticker.
    pub evaluated: Vec<Arc<CompanyProfile>>,
    /// Number of segments formed.
    pub segments: usize,
    /// Exclusion counts by reason.
    pub exclusions: ExclusionReport,
}

impl ScreenOutcome {
    /// Flagged results only, in result order.
    pub fn flagged(&self) -> impl Iterator<Item = &ScreenResult> {
        self.results.iter().filter(|r| r.verdict.flagged)
    }

    /// Number of flagged results.
    pub fn flagged_count(&self) -> usize {
        self.flagged().count()
    }
}

/// Deterministic result order: metric asc, magnitude desc, ticker asc.
pub fn sort_results(results: &mut [ScreenResult]) {
    results.sort_by(|a, b| {
        a.metric
            .cmp(&b.metric)
            .then_with(|| b.verdict.magnitude.total_cmp(&a.verdict.magnitude))
            .then_with(|| a.ticker().cmp(b.ticker()))
    });
}

/// Composes a dataset with segmentation and detector registries.
#[derive(Debug)]
pub struct ScreeningEngine<'a> {
    dataset: &'a PointInTimeDataset,
    segmentations: SegmentationRegistry,
    detectors: DetectorRegistry,
    config: ScreeningConfig,
}

impl<'a> ScreeningEngine<'a> {
    /// An engine with the built-in registries.
    pub fn new(dataset: &'a PointInTimeDataset, config: ScreeningConfig) -> Self {
        Self {
            dataset,
            segmentations: SegmentationRegistry::with_defaults(),
            detectors: DetectorRegistry::with_defaults(&config.detectors),
            config,
        }
    }

    /// Replace the segmentation registry.
    #[must_use]
    pub fn with_segmentations(mut self, segmentations: SegmentationRegistry) -> Self {
        self.segmentations = segmentations;
        self
    }

    /// Replace the detector registry.
    #[must_use]
    pub fn with_detectors(mut self, detectors: DetectorRegistry) -> Self {
        self.detectors = detectors;
        self
    }

    /// The dataset being screened.
    pub const fn dataset(&self) -> &'a PointInTimeDataset {
        self.dataset
    }

    /// The configuration.
    pub const fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// The segmentation registry.
    pub const fn segmentations(&self) -> &SegmentationRegistry {
        &self.segmentations
    }

    /// The detector registry.
    pub const fn detectors(&self) -> &DetectorRegistry {
        &self.detectors
    }

    fn resolve_metrics(&self, names: &[String]) -> Result<Vec<MetricDef>> {
        let catalog = self.dataset.catalog();
        if names.is_empty() {
            return Ok(catalog.iter().copied().collect());
        }
        let mut defs: Vec<MetricDef> = names
            .iter()
            .map(|n| catalog.require(n).copied())
            .collect::<Result<_>>()?;
        defs.sort_by_key(|d| d.name);
        defs.dedup_by_key(|d| d.name);
        Ok(defs)
    }

    /// Run one screening pass.
    ///
    /// # Errors
    ///
    /// Unknown registry or metric names fail before any work.
    /// [`ronda_traits::RondaError::DataUnavailable`] when nothing is knowable
    /// at the as-of date. Per-company problems become exclusions.
    pub fn screen(&self, request: &ScreenRequest) -> Result<ScreenOutcome> {
        let segmentation = self.segmentations.require(&request.segmentation)?;
        let detector = self.detectors.require(&request.detector)?;
        let metrics = self.resolve_metrics(&request.metrics)?;

        let snapshot = self
            .dataset
            .snapshot(request.as_of, self.config.reporting_delay_days)?;

        let mut exclusions = ExclusionReport {
            missing_data: snapshot.exclusions.total(),
            ..Default::default()
        };

        let mut groups: BTreeMap<SegmentKey, Vec<Arc<CompanyProfile>>> = BTreeMap::new();
        for profile in snapshot.profiles {
            if !request.admits_sector(profile.sector())
                || !request.cap_filter.admits(profile.market_cap())
            {
                exclusions.filtered_out += 1;
                continue;
            }
            match segmentation(profile.as_ref()) {
                Ok(key) => groups.entry(key).or_default().push(profile),
                Err(e) if e.is_exclusion() => {
                    debug!(error = %e, "company excluded from segmentation");
                    exclusions.unresolved_segment += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let mut evaluated: Vec<Arc<CompanyProfile>> = groups.values().flatten().cloned().collect();
        evaluated.sort_by(|a, b| a.ticker().cmp(b.ticker()));

        let mut pools = match self.config.window_days {
            Some(window) => Some(self.pools(request, window, &segmentation)?),
            None => None,
        };
        let segments: Vec<Segment> = groups
            .into_iter()
            .map(|(key, members)| {
                let pool = pools.as_mut().map(|p| p.remove(&key).unwrap_or_default());
                let segment = Segment::new(key, members, &metrics);
                match pool {
                    Some(pool) => segment.with_pool(pool),
                    None => segment,
                }
            })
            .collect();
        let segment_count = segments.len();

        let per_segment: Vec<(Vec<ScreenResult>, ExclusionReport)> = segments
            .par_iter()
            .map(|segment| self.evaluate(segment, &metrics, &detector))
            .collect();

        let mut results = Vec::new();
        for (rows, counts) in per_segment {
            results.extend(rows);
            exclusions += counts;
        }
        sort_results(&mut results);

        info!(
            as_of = %request.as_of,
            segmentation = %request.segmentation,
            detector = %request.detector,
            companies = evaluated.len(),
            segments = segment_count,
            results = results.len(),
            flagged = results.iter().filter(|r| r.verdict.flagged).count(),
            "screen complete"
        );

        Ok(ScreenOutcome {
            as_of: request.as_of,
            cutoff: snapshot.cutoff,
            results,
            evaluated,
            segments: segment_count,
            exclusions,
        })
    }

    /// Trailing-window profiles bucketed like the members.
    ///
    /// Profiles the prefilters reject or the segmentation cannot place are
    /// left out of every pool.
    fn pools(
        &self,
        request: &ScreenRequest,
        window_days: i64,
        segmentation: &SegmentationFn,
    ) -> Result<BTreeMap<SegmentKey, Vec<Arc<CompanyProfile>>>> {
        let profiles = self.dataset.window_profiles(
            request.as_of,
            self.config.reporting_delay_days,
            window_days,
        )?;
        let mut pools: BTreeMap<SegmentKey, Vec<Arc<CompanyProfile>>> = BTreeMap::new();
        for profile in profiles {
            if !request.admits_sector(profile.sector())
                || !request.cap_filter.admits(profile.market_cap())
            {
                continue;
            }
            match segmentation(profile.as_ref()) {
                Ok(key) => pools.entry(key).or_default().push(profile),
                Err(e) if e.is_exclusion() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(pools)
    }

    fn evaluate(
        &self,
        segment: &Segment,
        metrics: &[MetricDef],
        detector: &DetectorFn,
    ) -> (Vec<ScreenResult>, ExclusionReport) {
        let mut results = Vec::new();
        let mut counts = ExclusionReport::default();

        for def in metrics {
            let Some(sample) = segment.sample(def.name) else {
                continue;
            };
            let valued: Vec<(&Arc<CompanyProfile>, f64)> = segment
                .members()
                .iter()
                .filter_map(|p| Segment::value_of(def, p).map(|v| (p, v)))
                .collect();
            counts.missing_metric += segment.len() - valued.len();
            if sample.len() < self.config.min_segment_size {
                counts.small_segment += valued.len();
                continue;
            }
            let segment_stats = sample.distribution().copied();
            for (profile, value) in valued {
                results.push(ScreenResult {
                    profile: Arc::clone(profile),
                    segment: segment.key().clone(),
                    metric: def.name.to_string(),
                    polarity: def.polarity,
                    value,
                    segment_stats,
                    verdict: detector(sample, value, def.polarity),
                    forward_returns: BTreeMap::new(),
                });
            }
        }
        (results, counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ronda_data::{FundamentalTable, PriceTable, TickerTable};
    use ronda_traits::{Dimension, FundamentalRecord, PricePoint, RondaError, TickerInfo};

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    /// Technology: five companies with EPS 1, 1, 1, 1, 10 at price 10 (PE 10,
    /// 10, 10, 10, 1). Energy: three companies.
    fn dataset() -> PointInTimeDataset {
        let mut records = Vec::new();
        let mut prices = Vec::new();
        let mut infos = Vec::new();
        let companies = [
            ("T1", "Technology", 1.0),
            ("T2", "Technology", 1.0),
            ("T3", "Technology", 1.0),
            ("T4", "Technology", 1.0),
            ("T5", "Technology", 10.0),
            ("E1", "Energy", 1.0),
            ("E2", "Energy", 2.0),
            ("E3", "Energy", 3.0),
            ("X1", "", 1.0),
        ];
        for (ticker, sector, eps) in companies {
            let mut items = BTreeMap::new();
            items.insert("epsdil".to_string(), eps);
            items.insert("sharesbas".to_string(), 1e6);
            records.push(
                FundamentalRecord::new(
                    ticker,
                    d(2020, 3, 31),
                    d(2020, 3, 31),
                    d(2020, 5, 1),
                    Dimension::Mrq,
                    items,
                )
                .unwrap(),
            );
            prices.push((ticker, PricePoint::from_close(d(2020, 6, 30), 10.0)));
            let sector = (!sector.is_empty()).then(|| sector.to_string());
            infos.push(TickerInfo::new(ticker, sector, None));
        }
        PointInTimeDataset::new(
            FundamentalTable::from_records(records),
            PriceTable::from_points(prices),
            TickerTable::from_infos(infos),
        )
    }

    fn request() -> ScreenRequest {
        ScreenRequest::new(d(2020, 6, 30)).with_metrics(["pe_ratio"])
    }

    #[test]
    fn test_screen_flags_outlier_and_skips_small_segment() {
        let ds = dataset();
        let config = ScreeningConfig {
            detectors: DetectorConfig {
                sigma_threshold: 1.9,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = ScreeningEngine::new(&ds, config);
        let outcome = engine.screen(&request()).unwrap();

        // Only the Technology segment meets the floor of five.
        assert_eq!(outcome.results.len(), 5);
        assert!(outcome.results.iter().all(|r| r.segment.as_str() == "Technology"));
        assert_eq!(outcome.exclusions.small_segment, 3);
        assert_eq!(outcome.exclusions.unresolved_segment, 1);

        let flagged: Vec<&ScreenResult> = outcome.flagged().collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].ticker(), "T5");
        // Low PE is favorable.
        assert!(flagged[0].verdict.is_favorable());
        // Highest magnitude first.
        assert_eq!(outcome.results[0].ticker(), "T5");
    }

    #[test]
    fn test_screen_is_deterministic() {
        let ds = dataset();
        let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
        let req = ScreenRequest::new(d(2020, 6, 30)).with_segmentation("universe");
        let a = engine.screen(&req).unwrap();
        let b = engine.screen(&req).unwrap();
        assert_eq!(a.results, b.results);
        assert_eq!(a.evaluated.len(), 9);

        // Ties on magnitude fall back to ticker order.
        let tied: Vec<&str> = a
            .results
            .iter()
            .filter(|r| r.metric == "pe_ratio" && r.value == 10.0)
            .map(ScreenResult::ticker)
            .collect();
        let mut sorted = tied.clone();
        sorted.sort_unstable();
        assert_eq!(tied, sorted);
    }

    #[test]
    fn test_prefilters() {
        let ds = dataset();
        let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
        let req = request().with_sectors(["energy"]).with_segmentation("universe");
        let outcome = engine.screen(&req).unwrap();
        assert_eq!(outcome.exclusions.filtered_out, 6);
        assert_eq!(outcome.evaluated.len(), 3);
        // Three companies fall below the floor.
        assert!(outcome.results.is_empty());

        // Every company has a 10M market cap.
        let req = request()
            .with_segmentation("universe")
            .with_cap_filter(CapFilter::new(Some(20e6), None));
        let outcome = engine.screen(&req).unwrap();
        assert_eq!(outcome.exclusions.filtered_out, 9);
    }

    #[test]
    fn test_unknown_names_fail_before_work() {
        let ds = dataset();
        let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
        // The date has no data, but name resolution fails first.
        let early = d(1990, 1, 1);
        assert!(matches!(
            engine.screen(&ScreenRequest::new(early).with_segmentation("nope")),
            Err(RondaError::UnknownSegmentation(_))
        ));
        assert!(matches!(
            engine.screen(&ScreenRequest::new(early).with_detector("nope")),
            Err(RondaError::UnknownDetector(_))
        ));
        assert!(matches!(
            engine.screen(&ScreenRequest::new(early).with_metrics(["nope"])),
            Err(RondaError::UnknownMetric(_))
        ));
        assert!(matches!(
            engine.screen(&ScreenRequest::new(early)),
            Err(RondaError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_cap_filter() {
        let filter = CapFilter::new(Some(1e9), Some(5e9));
        assert!(filter.admits(Some(1e9)));
        assert!(filter.admits(Some(5e9)));
        assert!(!filter.admits(Some(6e9)));
        assert!(!filter.admits(None));
        assert!(CapFilter::default().admits(None));
    }

    /// Six Technology companies with two quarters each. In the latest quarter
    /// T6 earns 30% on equity against 10% for the rest; a quarter earlier
    /// every company earned 30%.
    fn roe_dataset() -> PointInTimeDataset {
        let mut records = Vec::new();
        let mut prices = Vec::new();
        let mut infos = Vec::new();
        for ticker in ["T1", "T2", "T3", "T4", "T5", "T6"] {
            let quarters = [
                (d(2019, 12, 31), d(2020, 2, 1), 30.0),
                (d(2020, 3, 31), d(2020, 5, 1), if ticker == "T6" { 30.0 } else { 10.0 }),
            ];
            for (period, available, income) in quarters {
                let mut items = BTreeMap::new();
                items.insert("netinccmn".to_string(), income);
                items.insert("equity".to_string(), 100.0);
                records.push(
                    FundamentalRecord::new(ticker, period, period, available, Dimension::Mrq, items)
                        .unwrap(),
                );
            }
            prices.push((ticker, PricePoint::from_close(d(2020, 6, 30), 10.0)));
            infos.push(TickerInfo::new(ticker, Some("Technology".to_string()), None));
        }
        PointInTimeDataset::new(
            FundamentalTable::from_records(records),
            PriceTable::from_points(prices),
            TickerTable::from_infos(infos),
        )
    }

    #[test]
    fn test_window_pools_recent_filings() {
        let ds = roe_dataset();
        let req = ScreenRequest::new(d(2020, 6, 30)).with_metrics(["roe_calculated"]);

        let current = ScreeningEngine::new(&ds, ScreeningConfig::default());
        let outcome = current.screen(&req).unwrap();
        let flagged: Vec<&str> = outcome.flagged().map(ScreenResult::ticker).collect();
        assert_eq!(flagged, vec!["T6"]);
        assert_eq!(outcome.results[0].segment_stats.unwrap().count, 6);

        // Cutoff 2020-05-16; 180 days back also reaches the 30% quarter.
        let pooled = ScreeningEngine::new(
            &ds,
            ScreeningConfig {
                window_days: Some(180),
                ..Default::default()
            },
        );
        let outcome = pooled.screen(&req).unwrap();
        assert_eq!(outcome.results.len(), 6);
        assert_eq!(outcome.flagged_count(), 0);
        let stats = outcome.results[0].segment_stats.unwrap();
        assert_eq!(stats.count, 12);
        assert_relative_eq!(stats.mean, 2.6 / 12.0, epsilon = 1e-12);

        // A short window sees only the latest quarter.
        let short = ScreeningEngine::new(
            &ds,
            ScreeningConfig {
                window_days: Some(60),
                ..Default::default()
            },
        );
        assert_eq!(short.screen(&req).unwrap().flagged_count(), 1);
    }
}
