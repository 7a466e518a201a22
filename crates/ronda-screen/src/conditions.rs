//! Multi-metric screens.
//!
//! A [`MetricCondition`] asks for a company to sit on one side of its
//! segment on one metric. Conditions are combined with [`MatchMode::All`]
//! (every condition holds) or [`MatchMode::Any`] (at least one holds).
//! Conditions are written `metric:side[:threshold]` on the command line,
//! e.g. `pe_ratio:lower:1.5`.

use crate::engine::ScreenResult;
use ronda_traits::{Date, Result, RondaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Side of the segment a condition asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Below the segment center.
    Lower,
    /// Above the segment center.
    Higher,
    /// Either side.
    Both,
}

impl Side {
    const fn admits(self, above: bool) -> bool {
        match self {
            Self::Lower => !above,
            Self::Higher => above,
            Self::Both => true,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lower => "lower",
            Self::Higher => "higher",
            Self::Both => "both",
        })
    }
}

impl FromStr for Side {
    type Err = RondaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lower" | "low" => Ok(Self::Lower),
            "higher" | "high" => Ok(Self::Higher),
            "both" => Ok(Self::Both),
            other => Err(RondaError::InvalidData(format!("unknown side '{other}'"))),
        }
    }
}

/// One metric's requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCondition {
    /// Metric name.
    pub metric: String,
    /// Required side of the segment.
    pub side: Side,
    /// Minimum detector magnitude; the detector's own flag when `None`.
    pub threshold: Option<f64>,
}

impl MetricCondition {
    /// A condition that defers to the detector's flag.
    pub fn new(metric: impl Into<String>, side: Side) -> Self {
        Self {
            metric: metric.into(),
            side,
            threshold: None,
        }
    }

    /// Require a magnitude above `threshold` instead of the detector's flag.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Whether `result` satisfies the condition.
    pub fn holds(&self, result: &ScreenResult) -> bool {
        let verdict = &result.verdict;
        result.metric == self.metric
            && self.threshold.map_or(verdict.flagged, |k| verdict.magnitude > k)
            && self.side.admits(verdict.above)
    }
}

impl FromStr for MetricCondition {
    type Err = RondaError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RondaError::InvalidData(format!("invalid condition '{s}'"));
        let mut parts = s.split(':').map(str::trim);
        let metric = parts.next().filter(|m| !m.is_empty()).ok_or_else(invalid)?;
        let side = parts.next().ok_or_else(invalid)?.parse()?;
        let mut condition = Self::new(metric, side);
        if let Some(threshold) = parts.next() {
            let k: f64 = threshold.parse().map_err(|_| invalid())?;
            if !k.is_finite() || k < 0.0 {
                return Err(invalid());
            }
            condition = condition.with_threshold(k);
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(condition)
    }
}

/// How conditions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every condition must hold.
    #[default]
    All,
    /// At least one condition must hold.
    Any,
}

/// A company that passed a multi-metric screen.
#[derive(Debug, Clone)]
pub struct ConditionMatch {
    /// Company ticker.
    pub ticker: String,
    /// As-of date of the screen.
    pub as_of: Date,
    /// Sector, when known.
    pub sector: Option<String>,
    /// Metrics whose condition held, in condition order.
    pub satisfied: Vec<String>,
    /// The company's results on the conditioned metrics, in condition order.
    pub results: Vec<ScreenResult>,
}

/// Companies meeting `conditions` under `mode`.
///
/// Ordered by number of satisfied conditions (descending), then date and
/// ticker. A company without a result on some metric fails that condition.
pub fn match_conditions(
    results: &[ScreenResult],
    conditions: &[MetricCondition],
    mode: MatchMode,
) -> Result<Vec<ConditionMatch>> {
    if conditions.is_empty() {
        return Err(RondaError::InvalidData("no conditions given".to_string()));
    }

    let mut by_company: BTreeMap<(Date, &str), Vec<&ScreenResult>> = BTreeMap::new();
    for result in results {
        by_company
            .entry((result.as_of(), result.ticker()))
            .or_default()
            .push(result);
    }

    let mut matches: Vec<ConditionMatch> = by_company
        .into_iter()
        .filter_map(|((as_of, ticker), rows)| {
            let mut satisfied = Vec::new();
            let mut kept = Vec::new();
            for condition in conditions {
                let Some(row) = rows.iter().find(|r| r.metric == condition.metric) else {
                    continue;
                };
                kept.push((*row).clone());
                if condition.holds(row) {
                    satisfied.push(condition.metric.clone());
                }
            }
            let passed = match mode {
                MatchMode::All => satisfied.len() == conditions.len(),
                MatchMode::Any => !satisfied.is_empty(),
            };
            passed.then(|| ConditionMatch {
                ticker: ticker.to_string(),
                as_of,
                sector: rows[0].profile.sector().map(str::to_string),
                satisfied,
                results: kept,
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.satisfied
            .len()
            .cmp(&a.satisfied.len())
            .then_with(|| a.as_of.cmp(&b.as_of))
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::SegmentKey;
    use chrono::NaiveDate;
    use ronda_traits::{CompanyProfile, OutlierVerdict, Polarity};
    use std::sync::Arc;

    fn result(ticker: &str, metric: &str, polarity: Polarity, z: f64) -> ScreenResult {
        let as_of = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        let profile = CompanyProfile::builder(ticker, as_of)
            .sector(Some("Industrials".to_string()))
            .build();
        ScreenResult {
            profile: Arc::new(profile),
            segment: SegmentKey::new("Industrials"),
            metric: metric.to_string(),
            polarity,
            value: z,
            segment_stats: None,
            verdict: OutlierVerdict::new(z, z.abs(), z.abs() > 2.0, z > 0.0, polarity),
            forward_returns: BTreeMap::new(),
        }
    }

    fn fixture() -> Vec<ScreenResult> {
        let low = Polarity::LowerIsBetter;
        let high = Polarity::HigherIsBetter;
        vec![
            result("AAA", "pe_ratio", low, -2.5),
            result("AAA", "roe_calculated", high, 2.1),
            result("BBB", "pe_ratio", low, -3.0),
            result("BBB", "roe_calculated", high, 1.2),
            result("CCC", "pe_ratio", low, 2.4),
            result("DDD", "roe_calculated", high, 2.8),
        ]
    }

    fn conditions() -> Vec<MetricCondition> {
        vec![
            "pe_ratio:lower".parse().unwrap(),
            "roe_calculated:higher".parse().unwrap(),
        ]
    }

    #[test]
    fn test_parse_condition() {
        let c: MetricCondition = "pe_ratio:low:1.5".parse().unwrap();
        assert_eq!(c, MetricCondition::new("pe_ratio", Side::Lower).with_threshold(1.5));
        assert_eq!("roe:both".parse::<MetricCondition>().unwrap().threshold, None);
        assert!("pe_ratio".parse::<MetricCondition>().is_err());
        assert!("pe_ratio:sideways".parse::<MetricCondition>().is_err());
        assert!("pe_ratio:lower:-1".parse::<MetricCondition>().is_err());
        assert!("pe_ratio:lower:1:2".parse::<MetricCondition>().is_err());
    }

    #[test]
    fn test_all_requires_every_condition() {
        let matches = match_conditions(&fixture(), &conditions(), MatchMode::All).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].ticker, "AAA");
        assert_eq!(matches[0].satisfied, vec!["pe_ratio", "roe_calculated"]);
        assert_eq!(matches[0].results.len(), 2);
        assert_eq!(matches[0].sector.as_deref(), Some("Industrials"));
    }

    #[test]
    fn test_any_requires_one_condition() {
        let matches = match_conditions(&fixture(), &conditions(), MatchMode::Any).unwrap();
        let tickers: Vec<&str> = matches.iter().map(|m| m.ticker.as_str()).collect();
        // CCC is flagged on P/E but on the high side.
        assert_eq!(tickers, vec!["AAA", "BBB", "DDD"]);
    }

    #[test]
    fn test_threshold_overrides_flag() {
        let strict = vec![
            MetricCondition::new("pe_ratio", Side::Lower).with_threshold(2.8),
            MetricCondition::new("roe_calculated", Side::Both).with_threshold(1.0),
        ];
        let matches = match_conditions(&fixture(), &strict, MatchMode::All).unwrap();
        let tickers: Vec<&str> = matches.iter().map(|m| m.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["BBB"]);

        assert!(match_conditions(&fixture(), &[], MatchMode::Any).is_err());
    }
}
