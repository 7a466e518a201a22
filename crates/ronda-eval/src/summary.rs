//! Cross-date forward-return summaries.

use ronda_traits::stats;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which companies a summary covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    /// Companies flagged in the favorable direction.
    Favorable,
    /// Companies flagged in the unfavorable direction.
    Unfavorable,
    /// Every evaluated company (baseline).
    Universe,
}

impl Group {
    /// All groups in report order.
    pub const ALL: [Self; 3] = [Self::Favorable, Self::Unfavorable, Self::Universe];

    /// Lowercase label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Unfavorable => "unfavorable",
            Self::Universe => "universe",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward-return statistics for one horizon and group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonSummary {
    /// Horizon label such as `3M`.
    pub horizon: String,
    /// Covered group.
    pub group: Group,
    /// Observations with both prices.
    pub count: usize,
    /// Observations dropped for a missing price.
    pub missing: usize,
    /// Mean forward return.
    pub mean: Option<f64>,
    /// Median forward return.
    pub median: Option<f64>,
    /// Share of positive returns.
    pub hit_rate: Option<f64>,
    /// Mean minus the universe mean; `None` for the universe itself.
    pub excess_mean: Option<f64>,
}

impl HorizonSummary {
    /// Summarize observations; `None` entries count as missing, never as zero.
    pub fn from_observations(
        horizon: impl Into<String>,
        group: Group,
        observations: &[Option<f64>],
        universe_mean: Option<f64>,
    ) -> Self {
        let returns: Vec<f64> = observations
            .iter()
            .flatten()
            .copied()
            .filter(|r| r.is_finite())
            .collect();
        let count = returns.len();
        let mean = stats::mean(&returns);
        let hit_rate =
            (count > 0).then(|| returns.iter().filter(|r| **r > 0.0).count() as f64 / count as f64);
        let excess_mean = match group {
            Group::Universe => None,
            _ => mean.zip(universe_mean).map(|(m, u)| m - u),
        };
        Self {
            horizon: horizon.into(),
            group,
            count,
            missing: observations.len() - count,
            mean,
            median: stats::median(&returns),
            hit_rate,
            excess_mean,
        }
    }
}
