//! Common types used throughout the Ronda framework.

use crate::RondaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export date type from chrono
pub use chrono::NaiveDate as Date;

/// A company ticker symbol such as "AAPL".
pub type Ticker = String;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
///
/// Polars stores dates as days since the Unix epoch; chrono counts from the
/// common era.
pub const CE_TO_UNIX_EPOCH_DAYS: i32 = 719_163;

/// Whether high or low values of a metric are desirable.
///
/// Polarity is a property of the metric, never of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// High values are good (profitability, liquidity).
    HigherIsBetter,
    /// Low values are good (valuation multiples, leverage).
    LowerIsBetter,
}

impl Polarity {
    /// Direction label for a deviation with the given sign.
    ///
    /// `above` is true when the subject sits above the segment center.
    pub const fn classify(self, above: bool) -> Direction {
        match (self, above) {
            (Self::HigherIsBetter, true) | (Self::LowerIsBetter, false) => Direction::Favorable,
            _ => Direction::Unfavorable,
        }
    }
}

/// Direction of a flagged outlier relative to what is desirable for the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The outlier is on the desirable side.
    Favorable,
    /// The outlier is on the undesirable side.
    Unfavorable,
}

impl Direction {
    /// Lowercase label used in tables.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Unfavorable => "unfavorable",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = RondaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "favorable" => Ok(Self::Favorable),
            "unfavorable" => Ok(Self::Unfavorable),
            other => Err(RondaError::InvalidData(format!("unknown direction '{other}'"))),
        }
    }
}

/// Reporting dimension of a fundamental record.
///
/// `As-reported` dimensions (ARQ, ARY, ART) exclude restatements; `most-recent`
/// dimensions (MRQ, MRY, MRT) carry the latest restated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    /// Most recent, quarterly.
    Mrq,
    /// As reported, quarterly.
    Arq,
    /// Most recent, annual.
    Mry,
    /// As reported, annual.
    Ary,
    /// Most recent, trailing twelve months.
    Mrt,
    /// As reported, trailing twelve months.
    Art,
}

impl Dimension {
    /// Uppercase code used by the data provider.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mrq => "MRQ",
            Self::Arq => "ARQ",
            Self::Mry => "MRY",
            Self::Ary => "ARY",
            Self::Mrt => "MRT",
            Self::Art => "ART",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = RondaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MRQ" => Ok(Self::Mrq),
            "ARQ" => Ok(Self::Arq),
            "MRY" => Ok(Self::Mry),
            "ARY" => Ok(Self::Ary),
            "MRT" => Ok(Self::Mrt),
            "ART" => Ok(Self::Art),
            other => Err(RondaError::InvalidData(format!("unknown dimension '{other}'"))),
        }
    }
}

/// Result of applying one detector to one company's metric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierVerdict {
    /// Whether the value is an outlier within its segment.
    pub flagged: bool,
    /// Favorable or unfavorable; only set when flagged.
    pub direction: Option<Direction>,
    /// Signed deviation score (sigma distance, ratio to mean, ...).
    pub score: f64,
    /// Non-negative ranking key; larger means more extreme.
    pub magnitude: f64,
    /// Whether the value lies above the segment center.
    #[serde(default)]
    pub above: bool,
}

impl OutlierVerdict {
    /// A verdict that flags nothing, used for degenerate distributions.
    pub const fn unflagged(score: f64) -> Self {
        Self {
            flagged: false,
            direction: None,
            score,
            magnitude: 0.0,
            above: false,
        }
    }

    /// Build a verdict from a score, its magnitude and the flag decision.
    ///
    /// `above` tells whether the subject lies above the segment center.
    pub const fn new(
        score: f64,
        magnitude: f64,
        flagged: bool,
        above: bool,
        polarity: Polarity,
    ) -> Self {
        Self {
            flagged,
            direction: if flagged {
                Some(polarity.classify(above))
            } else {
                None
            },
            score,
            magnitude,
            above,
        }
    }

    /// Whether this verdict is a favorable outlier.
    pub fn is_favorable(&self) -> bool {
        self.direction == Some(Direction::Favorable)
    }

    /// Whether this verdict is an unfavorable outlier.
    pub fn is_unfavorable(&self) -> bool {
        self.direction == Some(Direction::Unfavorable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_classification() {
        assert_eq!(Polarity::HigherIsBetter.classify(true), Direction::Favorable);
        assert_eq!(Polarity::HigherIsBetter.classify(false), Direction::Unfavorable);
        assert_eq!(Polarity::LowerIsBetter.classify(true), Direction::Unfavorable);
        assert_eq!(Polarity::LowerIsBetter.classify(false), Direction::Favorable);
    }

    #[test]
    fn test_verdict_direction_only_when_flagged() {
        let v = OutlierVerdict::new(2.5, 2.5, true, true, Polarity::LowerIsBetter);
        assert!(v.is_unfavorable());
        assert!(v.above);

        let v = OutlierVerdict::new(0.5, 0.5, false, true, Polarity::LowerIsBetter);
        assert_eq!(v.direction, None);
        assert!(!v.is_favorable() && !v.is_unfavorable());
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!("mrq".parse::<Dimension>().unwrap(), Dimension::Mrq);
        assert_eq!("ARQ".parse::<Dimension>().unwrap(), Dimension::Arq);
        assert!("XYZ".parse::<Dimension>().is_err());
        assert_eq!(Dimension::Mrt.to_string(), "MRT");
    }

    #[test]
    fn test_direction_serde() {
        let json = serde_json::to_string(&Direction::Favorable).unwrap();
        assert_eq!(json, "\"favorable\"");
        assert_eq!("Unfavorable".parse::<Direction>().unwrap(), Direction::Unfavorable);
    }

    #[test]
    fn test_date_type() {
        use chrono::Datelike;
        let date: Date = Date::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.num_days_from_ce() - CE_TO_UNIX_EPOCH_DAYS, 19_723);
    }
}
