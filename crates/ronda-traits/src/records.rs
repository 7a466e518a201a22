//! Raw ingested records: filed fundamentals, daily prices and ticker metadata.
//!
//! Records are immutable after construction. Restatements arrive as new
//! [`FundamentalRecord`]s with a later availability date.

use crate::{Date, Dimension, Result, RondaError, Ticker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw filed data for one company and one fiscal period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRecord {
    ticker: Ticker,
    period_end: Date,
    normalized_period: Date,
    available_on: Date,
    dimension: Dimension,
    items: BTreeMap<String, f64>,
}

impl FundamentalRecord {
    /// Create a record, enforcing `available_on >= normalized_period`.
    ///
    /// # Errors
    ///
    /// Returns [`RondaError::InvalidData`] when the record claims to be known
    /// before the period it describes.
    pub fn new(
        ticker: impl Into<Ticker>,
        period_end: Date,
        normalized_period: Date,
        available_on: Date,
        dimension: Dimension,
        items: BTreeMap<String, f64>,
    ) -> Result<Self> {
        let ticker = ticker.into();
        if available_on < normalized_period {
            return Err(RondaError::InvalidData(format!(
                "{ticker}: availability date {available_on} precedes normalized period \
                 {normalized_period}"
            )));
        }
        Ok(Self {
            ticker,
            period_end,
            normalized_period,
            available_on,
            dimension,
            items,
        })
    }

    /// Company identifier.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Fiscal period end on the company's own calendar.
    pub const fn period_end(&self) -> Date {
        self.period_end
    }

    /// Calendar-quarter aligned period date.
    pub const fn normalized_period(&self) -> Date {
        self.normalized_period
    }

    /// Date the record became knowable externally.
    pub const fn available_on(&self) -> Date {
        self.available_on
    }

    /// Reporting dimension.
    pub const fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Days between fiscal period end and public availability.
    pub fn filing_lag_days(&self) -> i64 {
        (self.available_on - self.period_end).num_days()
    }

    /// A raw line item, if reported and finite.
    pub fn item(&self, name: &str) -> Option<f64> {
        self.items.get(name).copied().filter(|v| v.is_finite())
    }

    /// All raw line items.
    pub const fn items(&self) -> &BTreeMap<String, f64> {
        &self.items
    }
}

/// One company on one trading date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date.
    pub date: Date,
    /// Opening price.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Split-adjusted close.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
    /// Dividend-adjusted close, used for returns.
    pub close_adj: f64,
}

impl PricePoint {
    /// A point where every price field equals `close_adj`.
    ///
    /// Handy for fixtures and for sources that only publish adjusted closes.
    pub const fn from_close(date: Date, close_adj: f64) -> Self {
        Self {
            date,
            open: close_adj,
            high: close_adj,
            low: close_adj,
            close: close_adj,
            volume: 0.0,
            close_adj,
        }
    }
}

/// Static ticker metadata used for classification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickerInfo {
    /// Company identifier.
    pub ticker: Ticker,
    /// Sector classification, if known.
    pub sector: Option<String>,
    /// Industry (sub-sector) classification, if known.
    pub industry: Option<String>,
}

impl TickerInfo {
    /// Create metadata for a ticker.
    pub fn new(
        ticker: impl Into<Ticker>,
        sector: Option<String>,
        industry: Option<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            sector,
            industry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_record_rejects_early_availability() {
        let result = FundamentalRecord::new(
            "AAPL",
            d(2020, 3, 28),
            d(2020, 3, 31),
            d(2020, 3, 30),
            Dimension::Mrq,
            BTreeMap::new(),
        );
        assert!(matches!(result, Err(RondaError::InvalidData(_))));
    }

    #[test]
    fn test_record_accessors() {
        let mut items = BTreeMap::new();
        items.insert("equity".to_string(), 100.0);
        items.insert("debt".to_string(), f64::NAN);

        let record = FundamentalRecord::new(
            "AAPL",
            d(2020, 3, 28),
            d(2020, 3, 31),
            d(2020, 5, 1),
            Dimension::Mrq,
            items,
        )
        .unwrap();

        assert_eq!(record.ticker(), "AAPL");
        assert_eq!(record.item("equity"), Some(100.0));
        assert_eq!(record.item("debt"), None);
        assert_eq!(record.item("revenue"), None);
        assert_eq!(record.filing_lag_days(), 34);
    }

    #[test]
    fn test_price_from_close() {
        let p = PricePoint::from_close(d(2020, 1, 15), 100.0);
        assert_eq!(p.close_adj, 100.0);
        assert_eq!(p.close, 100.0);
    }
}
