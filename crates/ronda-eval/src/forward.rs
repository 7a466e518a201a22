//! Forward returns over calendar horizons.
//!
//! The entry is the dividend-adjusted close at the as-of date, or the latest
//! one shortly before it when the as-of date is not a trading day. The exit is
//! the first close at or after `as_of + horizon`, never before, read through
//! [`ronda_data::ForwardPrices`] so it always lies strictly after the as-of
//! date.

use ronda_data::PointInTimeDataset;
use ronda_traits::{Date, Horizon, PricePoint, Result, RondaError};
use serde::{Deserialize, Serialize};

/// Price tolerances for forward returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardReturnConfig {
    /// How far past the target date the exit price may lie.
    pub max_exit_gap_days: i64,
    /// How far before the as-of date the entry price may lie.
    pub max_entry_staleness_days: i64,
}

impl Default for ForwardReturnConfig {
    fn default() -> Self {
        Self {
            max_exit_gap_days: 10,
            max_entry_staleness_days: 7,
        }
    }
}

/// Computes realized forward returns from a dataset.
#[derive(Debug, Clone, Copy)]
pub struct ForwardReturnCalculator<'a> {
    dataset: &'a PointInTimeDataset,
    config: ForwardReturnConfig,
}

impl<'a> ForwardReturnCalculator<'a> {
    /// Create a calculator.
    pub const fn new(dataset: &'a PointInTimeDataset, config: ForwardReturnConfig) -> Self {
        Self { dataset, config }
    }

    /// The tolerances in use.
    pub const fn config(&self) -> &ForwardReturnConfig {
        &self.config
    }

    /// Entry price at `as_of`.
    ///
    /// # Errors
    ///
    /// [`RondaError::MissingPrice`] when no usable close exists.
    pub fn entry(&self, ticker: &str, as_of: Date) -> Result<&'a PricePoint> {
        self.dataset
            .price_history(as_of)
            .latest_within(ticker, self.config.max_entry_staleness_days)
            .filter(|p| p.close_adj > 0.0)
            .ok_or_else(|| RondaError::MissingPrice {
                ticker: ticker.to_string(),
                date: as_of,
            })
    }

    /// Exit price for `horizon` from `as_of`.
    ///
    /// # Errors
    ///
    /// [`RondaError::MissingPrice`] when nothing trades within the gap after
    /// the target date, [`RondaError::InvalidDate`] when the target leaves
    /// the calendar.
    pub fn exit(&self, ticker: &str, as_of: Date, horizon: Horizon) -> Result<&'a PricePoint> {
        let target = horizon.advance(as_of).ok_or_else(|| {
            RondaError::InvalidDate(format!("{as_of} + {horizon} is out of range"))
        })?;
        self.dataset
            .forward_prices(as_of)
            .first_on_or_after(ticker, target, self.config.max_exit_gap_days)
            .ok_or_else(|| RondaError::MissingPrice {
                ticker: ticker.to_string(),
                date: target,
            })
    }

    /// `exit / entry - 1` on dividend-adjusted closes.
    ///
    /// # Errors
    ///
    /// [`RondaError::MissingPrice`] when either endpoint is unavailable. A
    /// missing price is never a zero return.
    pub fn forward_return(&self, ticker: &str, as_of: Date, horizon: Horizon) -> Result<f64> {
        let start = self.entry(ticker, as_of)?;
        let end = self.exit(ticker, as_of, horizon)?;
        Ok(end.close_adj / start.close_adj - 1.0)
    }

    /// Forward returns for several horizons; soft failures become `None`.
    ///
    /// # Errors
    ///
    /// Propagates errors other than [`RondaError::MissingPrice`].
    pub fn forward_returns(
        &self,
        ticker: &str,
        as_of: Date,
        horizons: &[Horizon],
    ) -> Result<Vec<Option<f64>>> {
        horizons
            .iter()
            .map(|&h| match self.forward_return(ticker, as_of, h) {
                Ok(r) => Ok(Some(r)),
                Err(e) if e.is_exclusion() => Ok(None),
                Err(e) => Err(e),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ronda_data::{FundamentalTable, PriceTable, TickerTable};

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd_opt(y, m, day).unwrap()
    }

    fn dataset(points: &[(Date, f64)]) -> PointInTimeDataset {
        let prices = PriceTable::from_points(
            points
                .iter()
                .map(|&(date, close)| ("T", PricePoint::from_close(date, close))),
        );
        PointInTimeDataset::new(FundamentalTable::new(), prices, TickerTable::default())
    }

    #[test]
    fn test_three_month_return() {
        let ds = dataset(&[(d(2020, 1, 15), 100.0), (d(2020, 4, 15), 110.0)]);
        let calc = ForwardReturnCalculator::new(&ds, ForwardReturnConfig::default());
        let r = calc
            .forward_return("T", d(2020, 1, 15), Horizon::THREE_MONTHS)
            .unwrap();
        assert_relative_eq!(r, 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_end_is_missing_price() {
        let ds = dataset(&[(d(2020, 1, 15), 100.0)]);
        let calc = ForwardReturnCalculator::new(&ds, ForwardReturnConfig::default());
        let err = calc
            .forward_return("T", d(2020, 1, 15), Horizon::THREE_MONTHS)
            .unwrap_err();
        assert!(matches!(err, RondaError::MissingPrice { date, .. } if date == d(2020, 4, 15)));

        let returns = calc
            .forward_returns("T", d(2020, 1, 15), &[Horizon::ONE_MONTH])
            .unwrap();
        assert_eq!(returns, vec![None]);
    }

    #[test]
    fn test_exit_never_before_target() {
        // A price just before the target must not be used.
        let ds = dataset(&[
            (d(2020, 1, 15), 100.0),
            (d(2020, 4, 14), 90.0),
            (d(2020, 4, 17), 120.0),
        ]);
        let calc = ForwardReturnCalculator::new(&ds, ForwardReturnConfig::default());
        let r = calc
            .forward_return("T", d(2020, 1, 15), Horizon::THREE_MONTHS)
            .unwrap();
        assert_relative_eq!(r, 0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_entry_on_non_trading_day() {
        // Saturday as-of uses Friday's close.
        let ds = dataset(&[(d(2020, 1, 17), 50.0), (d(2020, 2, 18), 55.0)]);
        let calc = ForwardReturnCalculator::new(&ds, ForwardReturnConfig::default());
        let r = calc
            .forward_return("T", d(2020, 1, 18), Horizon::ONE_MONTH)
            .unwrap();
        assert_relative_eq!(r, 0.10, epsilon = 1e-12);

        let strict = ForwardReturnCalculator::new(
            &ds,
            ForwardReturnConfig {
                max_entry_staleness_days: 0,
                ..Default::default()
            },
        );
        assert!(strict.entry("T", d(2020, 1, 18)).is_err());
    }

    #[test]
    fn test_exit_gap_limit() {
        let ds = dataset(&[(d(2020, 1, 15), 100.0), (d(2020, 5, 15), 130.0)]);
        let calc = ForwardReturnCalculator::new(&ds, ForwardReturnConfig::default());
        assert!(calc
            .forward_return("T", d(2020, 1, 15), Horizon::THREE_MONTHS)
            .is_err());
    }
}
