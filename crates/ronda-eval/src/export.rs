//! Flat exports of screens, counts and backtests.
//!
//! Every export is one row per result, as a serde row type and as a polars
//! DataFrame. Dates are rendered `YYYY-MM-DD`.

use crate::backtest::{BacktestResult, SkippedDate};
use crate::summary::HorizonSummary;
use polars::prelude::*;
use ronda_screen::{
    ExclusionReport, FamilyCount, OutlierDetail, ScreenResult, SignalCount, SignalFamily,
};
use ronda_traits::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One screen result, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRow {
    /// As-of date.
    pub as_of: String,
    /// Company ticker.
    pub ticker: String,
    /// Sector.
    pub sector: Option<String>,
    /// Industry.
    pub industry: Option<String>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Segment key.
    pub segment: String,
    /// Metric name.
    pub metric: String,
    /// Metric value.
    pub value: f64,
    /// Whether the value was flagged.
    pub flagged: bool,
    /// `favorable` or `unfavorable` when flagged.
    pub direction: Option<String>,
    /// Signed deviation score.
    pub score: f64,
    /// Ranking magnitude.
    pub magnitude: f64,
    /// Mean of the segment sample.
    pub segment_mean: Option<f64>,
    /// Population standard deviation of the segment sample.
    pub segment_std: Option<f64>,
    /// Forward returns by horizon label.
    pub forward_returns: BTreeMap<String, Option<f64>>,
}

impl From<&ScreenResult> for ScreenRow {
    fn from(r: &ScreenResult) -> Self {
        Self {
            as_of: r.as_of().to_string(),
            ticker: r.ticker().to_string(),
            sector: r.profile.sector().map(str::to_string),
            industry: r.profile.industry().map(str::to_string),
            market_cap: r.profile.market_cap(),
            segment: r.segment.to_string(),
            metric: r.metric.clone(),
            value: r.value,
            flagged: r.verdict.flagged,
            direction: r.verdict.direction.map(|d| d.as_str().to_string()),
            score: r.verdict.score,
            magnitude: r.verdict.magnitude,
            segment_mean: r.segment_stats.map(|d| d.mean),
            segment_std: r.segment_stats.map(|d| d.std),
            forward_returns: r.forward_returns.clone(),
        }
    }
}

/// Flatten results into rows.
pub fn screen_rows<'r>(results: impl IntoIterator<Item = &'r ScreenResult>) -> Vec<ScreenRow> {
    results.into_iter().map(ScreenRow::from).collect()
}

/// Screen rows as a DataFrame, with one `fwd_<label>` column per horizon
/// present in any row.
///
/// # Errors
///
/// Returns an error if the frame cannot be assembled.
pub fn screen_rows_to_frame(rows: &[ScreenRow]) -> Result<DataFrame> {
    let mut df = df!(
        "as_of" => rows.iter().map(|r| r.as_of.as_str()).collect::<Vec<_>>(),
        "ticker" => rows.iter().map(|r| r.ticker.as_str()).collect::<Vec<_>>(),
        "sector" => rows.iter().map(|r| r.sector.as_deref()).collect::<Vec<_>>(),
        "industry" => rows.iter().map(|r| r.industry.as_deref()).collect::<Vec<_>>(),
        "market_cap" => rows.iter().map(|r| r.market_cap).collect::<Vec<_>>(),
        "segment" => rows.iter().map(|r| r.segment.as_str()).collect::<Vec<_>>(),
        "metric" => rows.iter().map(|r| r.metric.as_str()).collect::<Vec<_>>(),
        "value" => rows.iter().map(|r| r.value).collect::<Vec<_>>(),
        "flagged" => rows.iter().map(|r| r.flagged).collect::<Vec<_>>(),
        "direction" => rows.iter().map(|r| r.direction.as_deref()).collect::<Vec<_>>(),
        "score" => rows.iter().map(|r| r.score).collect::<Vec<_>>(),
        "magnitude" => rows.iter().map(|r| r.magnitude).collect::<Vec<_>>(),
        "segment_mean" => rows.iter().map(|r| r.segment_mean).collect::<Vec<_>>(),
        "segment_std" => rows.iter().map(|r| r.segment_std).collect::<Vec<_>>()
    )?;

    let mut labels: Vec<&str> = rows
        .iter()
        .flat_map(|r| r.forward_returns.keys().map(String::as_str))
        .collect();
    labels.sort_unstable();
    labels.dedup();
    for label in labels {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|r| r.forward_returns.get(label).copied().flatten())
            .collect();
        df.with_column(Column::new(format!("fwd_{label}").into(), values))?;
    }
    Ok(df)
}

/// Screen results as a DataFrame.
///
/// # Errors
///
/// Returns an error if the frame cannot be assembled.
pub fn screen_results_to_frame(results: &[ScreenResult]) -> Result<DataFrame> {
    screen_rows_to_frame(&screen_rows(results))
}

/// Signal counts as a DataFrame, with `<family>_count`, `<family>_available`
/// and `<family>_ratio` columns for the undervaluation and quality families.
///
/// # Errors
///
/// Returns an error if the frame cannot be assembled.
pub fn signal_counts_to_frame(counts: &[SignalCount]) -> Result<DataFrame> {
    let column = |f: fn(&SignalCount) -> u64| counts.iter().map(f).collect::<Vec<_>>();
    let joined = |f: fn(&SignalCount) -> &[String]| {
        counts.iter().map(|c| f(c).join(",")).collect::<Vec<_>>()
    };
    let mut df = df!(
        "ticker" => counts.iter().map(|c| c.ticker.as_str()).collect::<Vec<_>>(),
        "sector" => counts.iter().map(|c| c.sector.as_deref()).collect::<Vec<_>>(),
        "favorable_count" => column(|c| c.favorable as u64),
        "unfavorable_count" => column(|c| c.unfavorable as u64),
        "total_signal_count" => column(|c| c.total() as u64),
        "net_signal" => counts.iter().map(SignalCount::net).collect::<Vec<_>>(),
        "metrics_available" => column(|c| c.metrics_available as u64),
        "favorable_metrics" => joined(|c| c.favorable_metrics.as_slice()),
        "unfavorable_metrics" => joined(|c| c.unfavorable_metrics.as_slice())
    )?;

    for family in SignalFamily::ALL {
        let prefix = family.as_str();
        let tally: Vec<&FamilyCount> = counts.iter().map(|c| c.family(family)).collect();
        let count: Vec<u64> = tally.iter().map(|f| f.count as u64).collect();
        let available: Vec<u64> = tally.iter().map(|f| f.available as u64).collect();
        let ratio: Vec<Option<f64>> = tally.iter().map(|f| f.ratio).collect();
        df.with_column(Column::new(format!("{prefix}_count").into(), count))?;
        df.with_column(Column::new(format!("{prefix}_available").into(), available))?;
        df.with_column(Column::new(format!("{prefix}_ratio").into(), ratio))?;
    }
    Ok(df)
}

/// Outlier details as a DataFrame, one row per company and metric.
///
/// # Errors
///
/// Returns an error if the frame cannot be assembled.
pub fn outlier_details_to_frame(details: &[OutlierDetail]) -> Result<DataFrame> {
    Ok(df!(
        "ticker" => details.iter().map(|d| d.ticker.as_str()).collect::<Vec<_>>(),
        "as_of" => details.iter().map(|d| d.as_of.to_string()).collect::<Vec<_>>(),
        "segment" => details.iter().map(|d| d.segment.as_str()).collect::<Vec<_>>(),
        "metric" => details.iter().map(|d| d.metric.as_str()).collect::<Vec<_>>(),
        "value" => details.iter().map(|d| d.value).collect::<Vec<_>>(),
        "score" => details.iter().map(|d| d.score).collect::<Vec<_>>(),
        "segment_mean" => details.iter().map(|d| d.segment_mean).collect::<Vec<_>>(),
        "segment_std" => details.iter().map(|d| d.segment_std).collect::<Vec<_>>(),
        "segment_median" => details.iter().map(|d| d.segment_median).collect::<Vec<_>>(),
        "segment_size" => details
            .iter()
            .map(|d| d.segment_size.map(|n| n as u64))
            .collect::<Vec<_>>(),
        "is_outlier" => details.iter().map(|d| d.is_outlier).collect::<Vec<_>>(),
        "direction" => details
            .iter()
            .map(|d| d.direction.map(|dir| dir.as_str()))
            .collect::<Vec<_>>()
    )?)
}

/// Backtest summaries as a DataFrame.
///
/// # Errors
///
/// Returns an error if the frame cannot be assembled.
pub fn summaries_to_frame(summaries: &[HorizonSummary]) -> Result<DataFrame> {
    Ok(df!(
        "horizon" => summaries.iter().map(|s| s.horizon.as_str()).collect::<Vec<_>>(),
        "group" => summaries.iter().map(|s| s.group.as_str()).collect::<Vec<_>>(),
        "count" => summaries.iter().map(|s| s.count as u64).collect::<Vec<_>>(),
        "missing" => summaries.iter().map(|s| s.missing as u64).collect::<Vec<_>>(),
        "mean" => summaries.iter().map(|s| s.mean).collect::<Vec<_>>(),
        "median" => summaries.iter().map(|s| s.median).collect::<Vec<_>>(),
        "hit_rate" => summaries.iter().map(|s| s.hit_rate).collect::<Vec<_>>(),
        "excess_mean" => summaries.iter().map(|s| s.excess_mean).collect::<Vec<_>>()
    )?)
}

/// A backtest reduced to its serializable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Horizon labels.
    pub horizons: Vec<String>,
    /// Completed date count.
    pub completed: usize,
    /// Skipped dates with reasons.
    pub skipped: Vec<SkippedDate>,
    /// Dates not started because of cancellation.
    pub cancelled: Vec<String>,
    /// Exclusions summed over completed dates.
    pub exclusions: ExclusionReport,
    /// Summaries per horizon and group.
    pub summaries: Vec<HorizonSummary>,
    /// Every flagged result with its forward returns.
    pub flagged: Vec<ScreenRow>,
}

impl From<&BacktestResult> for BacktestReport {
    fn from(result: &BacktestResult) -> Self {
        let mut exclusions = ExclusionReport::default();
        for period in &result.periods {
            exclusions += period.outcome.exclusions;
        }
        Self {
            horizons: result.horizons.clone(),
            completed: result.completed(),
            skipped: result.skipped.clone(),
            cancelled: result.cancelled.iter().map(ToString::to_string).collect(),
            exclusions,
            summaries: result.summaries.clone(),
            flagged: screen_rows(result.periods.iter().flat_map(|p| p.outcome.flagged())),
        }
    }
}
