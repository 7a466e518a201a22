//! Count-based ranking: favorable and unfavorable flags per company.
//!
//! This is a reduction over the screening result stream. Screening every
//! catalog metric and counting flags per company ranks companies by how many
//! of their metrics are outliers, and in which direction.
//!
//! Two fixed families are tallied alongside the overall counts:
//! undervaluation (low valuation multiples) and quality (high returns and
//! liquidity, low leverage). Each reports how many of its metrics flagged
//! favorably, how many could be evaluated, and the ratio of the two.

use crate::engine::ScreenResult;
use ronda_traits::{Direction, RondaError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A fixed group of metrics whose favorable flags are counted together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalFamily {
    /// Valuation multiples below the segment.
    Undervaluation,
    /// Returns and liquidity above the segment, leverage below it.
    Quality,
}

impl SignalFamily {
    /// Both families.
    pub const ALL: [Self; 2] = [Self::Undervaluation, Self::Quality];

    /// Metrics in the family.
    pub const fn metrics(self) -> &'static [&'static str] {
        match self {
            Self::Undervaluation => {
                &["pe_ratio", "pb_ratio", "ps_ratio", "pc_ratio", "ev_ebitda_ratio"]
            }
            Self::Quality => &[
                "roe_calculated",
                "roic_calculated",
                "current_ratio",
                "interest_coverage",
                "debt_to_equity",
                "debt_to_assets",
            ],
        }
    }

    /// Column prefix such as `undervaluation`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undervaluation => "undervaluation",
            Self::Quality => "quality",
        }
    }

    /// Whether `metric` belongs to the family.
    pub fn contains(self, metric: &str) -> bool {
        self.metrics().contains(&metric)
    }
}

/// Favorable flags within one [`SignalFamily`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyCount {
    /// Family metrics flagged favorably.
    pub count: usize,
    /// Family metrics evaluated.
    pub available: usize,
    /// `count / available`; `None` when nothing was evaluated.
    pub ratio: Option<f64>,
}

impl FamilyCount {
    fn record(&mut self, favorable: bool) {
        self.available += 1;
        if favorable {
            self.count += 1;
        }
        self.ratio = Some(self.count as f64 / self.available as f64);
    }
}

/// Per-company signal tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCount {
    /// Company ticker.
    pub ticker: String,
    /// Company sector, if known.
    pub sector: Option<String>,
    /// Metrics flagged in the favorable direction.
    pub favorable: usize,
    /// Metrics flagged in the unfavorable direction.
    pub unfavorable: usize,
    /// Metrics evaluated for this company.
    pub metrics_available: usize,
    /// Names of the favorable metrics, sorted.
    pub favorable_metrics: Vec<String>,
    /// Names of the unfavorable metrics, sorted.
    pub unfavorable_metrics: Vec<String>,
    /// Low valuation multiples.
    pub undervaluation: FamilyCount,
    /// Strong returns, liquidity and balance sheet.
    pub quality: FamilyCount,
}

impl SignalCount {
    fn new(result: &ScreenResult) -> Self {
        Self {
            ticker: result.ticker().to_string(),
            sector: result.profile.sector().map(str::to_string),
            favorable: 0,
            unfavorable: 0,
            metrics_available: 0,
            favorable_metrics: Vec::new(),
            unfavorable_metrics: Vec::new(),
            undervaluation: FamilyCount::default(),
            quality: FamilyCount::default(),
        }
    }

    /// The tally for one family.
    pub const fn family(&self, family: SignalFamily) -> &FamilyCount {
        match family {
            SignalFamily::Undervaluation => &self.undervaluation,
            SignalFamily::Quality => &self.quality,
        }
    }

    const fn family_mut(&mut self, family: SignalFamily) -> &mut FamilyCount {
        match family {
            SignalFamily::Undervaluation => &mut self.undervaluation,
            SignalFamily::Quality => &mut self.quality,
        }
    }

    /// `favorable + unfavorable`.
    pub const fn total(&self) -> usize {
        self.favorable + self.unfavorable
    }

    /// `favorable - unfavorable`.
    pub const fn net(&self) -> i64 {
        self.favorable as i64 - self.unfavorable as i64
    }
}

/// Ranking key for [`count_signals_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSortKey {
    /// Net signal.
    #[default]
    Net,
    /// Favorable count.
    Favorable,
    /// Unfavorable count.
    Unfavorable,
    /// Total signal count.
    Total,
    /// Undervaluation family count.
    Undervaluation,
    /// Quality family count.
    Quality,
}

impl CountSortKey {
    fn value(self, count: &SignalCount) -> i64 {
        match self {
            Self::Net => count.net(),
            Self::Favorable => count.favorable as i64,
            Self::Unfavorable => count.unfavorable as i64,
            Self::Total => count.total() as i64,
            Self::Undervaluation => count.undervaluation.count as i64,
            Self::Quality => count.quality.count as i64,
        }
    }
}

impl fmt::Display for CountSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Net => "net",
            Self::Favorable => "favorable",
            Self::Unfavorable => "unfavorable",
            Self::Total => "total",
            Self::Undervaluation => "undervaluation",
            Self::Quality => "quality",
        })
    }
}

impl FromStr for CountSortKey {
    type Err = RondaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "net" | "net_signal" => Ok(Self::Net),
            "favorable" | "favorable_count" => Ok(Self::Favorable),
            "unfavorable" | "unfavorable_count" => Ok(Self::Unfavorable),
            "total" | "total_signal_count" => Ok(Self::Total),
            "undervaluation" | "undervaluation_count" => Ok(Self::Undervaluation),
            "quality" | "quality_count" => Ok(Self::Quality),
            other => Err(RondaError::InvalidData(format!("unknown sort key '{other}'"))),
        }
    }
}

/// Filtering and ordering of signal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountOptions {
    /// Drop companies with fewer total signals.
    pub min_signals: usize,
    /// Drop companies with more total signals.
    pub max_signals: Option<usize>,
    /// Primary ranking key.
    pub sort_by: CountSortKey,
    /// Rank ascending instead of descending.
    pub ascending: bool,
}

impl Default for CountOptions {
    fn default() -> Self {
        Self {
            min_signals: 0,
            max_signals: None,
            sort_by: CountSortKey::Net,
            ascending: false,
        }
    }
}

/// Tally flags per company, ordered by net desc, favorable desc, ticker.
pub fn count_signals(results: &[ScreenResult]) -> Vec<SignalCount> {
    let mut counts = tally(results);
    counts.sort_by(default_order);
    counts
}

/// Tally flags per company with filtering and a chosen ranking key.
///
/// Ties on the key fall back to favorable count (descending) and ticker.
pub fn count_signals_with(results: &[ScreenResult], options: &CountOptions) -> Vec<SignalCount> {
    let mut counts: Vec<SignalCount> = tally(results)
        .into_iter()
        .filter(|c| {
            c.total() >= options.min_signals
                && options.max_signals.is_none_or(|max| c.total() <= max)
        })
        .collect();

    counts.sort_by(|a, b| {
        let key = options.sort_by.value(a).cmp(&options.sort_by.value(b));
        let key = if options.ascending { key } else { key.reverse() };
        key.then_with(|| b.favorable.cmp(&a.favorable))
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    counts
}

fn tally(results: &[ScreenResult]) -> Vec<SignalCount> {
    let mut by_ticker: BTreeMap<&str, SignalCount> = BTreeMap::new();
    for result in results {
        let entry = by_ticker
            .entry(result.ticker())
            .or_insert_with(|| SignalCount::new(result));
        entry.metrics_available += 1;
        match result.verdict.direction {
            Some(Direction::Favorable) => {
                entry.favorable += 1;
                entry.favorable_metrics.push(result.metric.clone());
            }
            Some(Direction::Unfavorable) => {
                entry.unfavorable += 1;
                entry.unfavorable_metrics.push(result.metric.clone());
            }
            None => {}
        }
        for family in SignalFamily::ALL {
            if family.contains(&result.metric) {
                entry
                    .family_mut(family)
                    .record(result.verdict.is_favorable());
            }
        }
    }

    by_ticker
        .into_values()
        .map(|mut c| {
            c.favorable_metrics.sort();
            c.unfavorable_metrics.sort();
            c
        })
        .collect()
}

fn default_order(a: &SignalCount, b: &SignalCount) -> Ordering {
    b.net()
        .cmp(&a.net())
        .then_with(|| b.favorable.cmp(&a.favorable))
        .then_with(|| a.ticker.cmp(&b.ticker))
}
