//! Per-metric breakdown of screening results.
//!
//! Turns the result stream into one row per company and metric, carrying the
//! raw value, the detector score and the statistics of the sample it was
//! compared against. Used to explain why a company was or was not flagged.

use crate::engine::ScreenResult;
use crate::segmentation::SegmentKey;
use ronda_traits::{Date, Direction, Polarity};
use serde::{Deserialize, Serialize};

/// One company's standing on one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierDetail {
    /// Company ticker.
    pub ticker: String,
    /// As-of date of the screen.
    pub as_of: Date,
    /// Peer group the value was compared against.
    pub segment: SegmentKey,
    /// Metric name.
    pub metric: String,
    /// Whether high or low values are desirable.
    pub polarity: Polarity,
    /// Raw metric value.
    pub value: f64,
    /// Detector score.
    pub score: f64,
    /// Detector ranking key.
    pub magnitude: f64,
    /// Sample mean.
    pub segment_mean: Option<f64>,
    /// Sample population standard deviation.
    pub segment_std: Option<f64>,
    /// Sample median.
    pub segment_median: Option<f64>,
    /// Sample size.
    pub segment_size: Option<usize>,
    /// Whether the detector flagged the value.
    pub is_outlier: bool,
    /// Side of the flag, when flagged.
    pub direction: Option<Direction>,
}

impl From<&ScreenResult> for OutlierDetail {
    fn from(result: &ScreenResult) -> Self {
        let stats = result.segment_stats.as_ref();
        Self {
            ticker: result.ticker().to_string(),
            as_of: result.as_of(),
            segment: result.segment.clone(),
            metric: result.metric.clone(),
            polarity: result.polarity,
            value: result.value,
            score: result.verdict.score,
            magnitude: result.verdict.magnitude,
            segment_mean: stats.map(|d| d.mean),
            segment_std: stats.map(|d| d.std),
            segment_median: stats.map(|d| d.median),
            segment_size: stats.map(|d| d.count),
            is_outlier: result.verdict.flagged,
            direction: result.verdict.direction,
        }
    }
}

/// Every metric row, optionally for one ticker, ordered by ticker, date and metric.
pub fn outlier_details(results: &[ScreenResult], ticker: Option<&str>) -> Vec<OutlierDetail> {
    let mut details: Vec<OutlierDetail> = results
        .iter()
        .filter(|r| ticker.is_none_or(|t| r.ticker() == t))
        .map(OutlierDetail::from)
        .collect();
    details.sort_by(|a, b| {
        a.ticker
            .cmp(&b.ticker)
            .then_with(|| a.as_of.cmp(&b.as_of))
            .then_with(|| a.metric.cmp(&b.metric))
    });
    details
}

/// Flagged rows only, most extreme first.
pub fn outlier_summary(
    results: &[ScreenResult],
    ticker: Option<&str>,
    direction: Option<Direction>,
) -> Vec<OutlierDetail> {
    let mut details: Vec<OutlierDetail> = outlier_details(results, ticker)
        .into_iter()
        .filter(|d| d.is_outlier && direction.is_none_or(|dir| d.direction == Some(dir)))
        .collect();
    details.sort_by(|a, b| {
        b.magnitude
            .total_cmp(&a.magnitude)
            .then_with(|| a.ticker.cmp(&b.ticker))
            .then_with(|| a.metric.cmp(&b.metric))
    });
    details
}

/// Companies flagged on `metric`, most extreme first.
///
/// When fewer than `min_rows` are flagged, the metric's rows are instead
/// ranked toward `direction` (most favorable first for
/// [`Direction::Favorable`]) and the first `min_rows` are returned, so a
/// caller always gets candidates to inspect.
pub fn metric_outliers(
    results: &[ScreenResult],
    metric: &str,
    direction: Option<Direction>,
    min_rows: usize,
) -> Vec<OutlierDetail> {
    let flagged: Vec<OutlierDetail> = outlier_summary(results, None, direction)
        .into_iter()
        .filter(|d| d.metric == metric)
        .collect();
    if flagged.len() >= min_rows {
        return flagged;
    }

    let mut rows: Vec<(f64, OutlierDetail)> = results
        .iter()
        .filter(|r| r.metric == metric)
        .map(|r| (favorability(r), OutlierDetail::from(r)))
        .collect();
    rows.sort_by(|(fa, a), (fb, b)| {
        let key = match direction {
            Some(Direction::Favorable) => fb.total_cmp(fa),
            Some(Direction::Unfavorable) => fa.total_cmp(fb),
            None => b.magnitude.total_cmp(&a.magnitude),
        };
        key.then_with(|| a.ticker.cmp(&b.ticker))
    });
    rows.into_iter().take(min_rows).map(|(_, d)| d).collect()
}

/// Magnitude signed so that larger is better for the metric.
fn favorability(result: &ScreenResult) -> f64 {
    let magnitude = result.verdict.magnitude;
    match result.polarity.classify(result.verdict.above) {
        Direction::Favorable => magnitude,
        Direction::Unfavorable => -magnitude,
    }
}
