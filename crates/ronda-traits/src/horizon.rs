//! Calendar horizons such as `3M` or `1Y`.
//!
//! Horizons drive both forward-return windows and backtest rebalance
//! frequencies. They resolve by calendar-month arithmetic, never by a fixed
//! day count: `2020-01-31 + 1M` is `2020-02-29`.

use crate::{Date, Result, RondaError};
use chrono::Months;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Unit of a [`Horizon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HorizonUnit {
    /// Calendar months.
    Months,
    /// Calendar years.
    Years,
}

/// A calendar offset of `<count><unit>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Horizon {
    count: u32,
    unit: HorizonUnit,
}

impl Horizon {
    /// One calendar month.
    pub const ONE_MONTH: Self = Self {
        count: 1,
        unit: HorizonUnit::Months,
    };
    /// Three calendar months.
    pub const THREE_MONTHS: Self = Self {
        count: 3,
        unit: HorizonUnit::Months,
    };
    /// Six calendar months.
    pub const SIX_MONTHS: Self = Self {
        count: 6,
        unit: HorizonUnit::Months,
    };
    /// One calendar year.
    pub const ONE_YEAR: Self = Self {
        count: 1,
        unit: HorizonUnit::Years,
    };

    /// Create a horizon. `count` must be positive and its length in months
    /// must fit in a `u32`.
    pub fn new(count: u32, unit: HorizonUnit) -> Result<Self> {
        let horizon = Self { count, unit };
        if count == 0 || horizon.total_months().is_none() {
            return Err(RondaError::InvalidHorizon(horizon.to_string()));
        }
        Ok(horizon)
    }

    /// `n` calendar months.
    pub fn months(n: u32) -> Result<Self> {
        Self::new(n, HorizonUnit::Months)
    }

    /// `n` calendar years.
    pub fn years(n: u32) -> Result<Self> {
        Self::new(n, HorizonUnit::Years)
    }

    /// Number of units.
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// The unit.
    pub const fn unit(&self) -> HorizonUnit {
        self.unit
    }

    /// Total length in calendar months, `None` on overflow.
    pub const fn total_months(&self) -> Option<u32> {
        match self.unit {
            HorizonUnit::Months => Some(self.count),
            HorizonUnit::Years => self.count.checked_mul(12),
        }
    }

    /// Label such as `3M`, used as a map key in results.
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// The date `steps` horizons after `date`, clamped to month end.
    ///
    /// Computing from the origin each time keeps month-end dates from drifting
    /// (`Jan 31 + 2M` is `Mar 31`, not `Feb 29 + 1M`).
    pub fn advance_by(&self, date: Date, steps: u32) -> Option<Date> {
        let months = self.total_months()?.checked_mul(steps)?;
        date.checked_add_months(Months::new(months))
    }

    /// The date one horizon after `date`.
    pub fn advance(&self, date: Date) -> Option<Date> {
        self.advance_by(date, 1)
    }

    /// Parse a comma-separated list such as `"1M,3M,1Y"`.
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

const fn unit_char(unit: HorizonUnit) -> char {
    match unit {
        HorizonUnit::Months => 'M',
        HorizonUnit::Years => 'Y',
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, unit_char(self.unit))
    }
}

impl FromStr for Horizon {
    type Err = RondaError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || RondaError::InvalidHorizon(s.to_string());

        let unit = match trimmed.chars().last() {
            Some('M' | 'm') => HorizonUnit::Months,
            Some('Y' | 'y') => HorizonUnit::Years,
            _ => return Err(invalid()),
        };
        let digits = &trimmed[..trimmed.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let count: u32 = digits.parse().map_err(|_| invalid())?;
        Self::new(count, unit).map_err(|_| invalid())
    }
}

impl Serialize for Horizon {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Horizon {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse() {
        let h: Horizon = "3M".parse().unwrap();
        assert_eq!(h.count(), 3);
        assert_eq!(h.unit(), HorizonUnit::Months);
        assert_eq!(h.label(), "3M");

        let h: Horizon = " 2y ".parse().unwrap();
        assert_eq!(h.total_months(), Some(24));
        assert_eq!(h.to_string(), "2Y");
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "M", "3", "3D", "-1M", "0M", "1.5Y", "M3"] {
            assert!(bad.parse::<Horizon>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_parse_list() {
        let hs = Horizon::parse_list("1M, 3M,1Y").unwrap();
        assert_eq!(hs.len(), 3);
        assert_eq!(hs[2], Horizon::years(1).unwrap());
        assert!(Horizon::parse_list("1M,bad").is_err());
    }

    #[test]
    fn test_calendar_arithmetic() {
        let three = Horizon::months(3).unwrap();
        assert_eq!(three.advance(d(2020, 1, 15)), Some(d(2020, 4, 15)));

        let one = Horizon::months(1).unwrap();
        assert_eq!(one.advance(d(2020, 1, 31)), Some(d(2020, 2, 29)));
        assert_eq!(one.advance_by(d(2020, 1, 31), 2), Some(d(2020, 3, 31)));

        let year = Horizon::years(1).unwrap();
        assert_eq!(year.advance(d(2020, 2, 29)), Some(d(2021, 2, 28)));
    }

    #[test]
    fn test_oversized_horizons() {
        // 400000000 years does not fit in u32 months.
        assert!(matches!(
            "400000000Y".parse::<Horizon>(),
            Err(RondaError::InvalidHorizon(_))
        ));
        assert!(Horizon::years(u32::MAX).is_err());

        // Fits in u32 months but lands far outside the calendar.
        let huge: Horizon = "357913941Y".parse().unwrap();
        assert_eq!(huge.total_months(), Some(4_294_967_292));
        assert_eq!(huge.advance(d(2020, 1, 1)), None);
        assert_eq!(Horizon::ONE_YEAR.advance_by(d(2020, 1, 1), u32::MAX), None);
    }

    #[test]
    fn test_serde_roundtrip_as_string() {
        let h = Horizon::months(6).unwrap();
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "\"6M\"");
        let back: Horizon = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
