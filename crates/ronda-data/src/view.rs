//! Price views on either side of an as-of boundary.
//!
//! [`PriceHistory`] only reaches prices dated on or before the as-of date and
//! is what ratio computation sees. [`ForwardPrices`] only reaches prices dated
//! strictly after it and is what forward returns use for exits. They are
//! distinct types from distinct constructors, so a screen cannot read a future
//! price by accident.

use crate::tables::PriceTable;
use chrono::Duration;
use ronda_traits::{Date, PricePoint};

/// Prices dated on or before an as-of date.
#[derive(Debug, Clone, Copy)]
pub struct PriceHistory<'a> {
    table: &'a PriceTable,
    as_of: Date,
}

impl<'a> PriceHistory<'a> {
    pub(crate) const fn new(table: &'a PriceTable, as_of: Date) -> Self {
        Self { table, as_of }
    }

    /// The boundary date (inclusive).
    pub const fn as_of(&self) -> Date {
        self.as_of
    }

    /// The last price on or before the as-of date.
    pub fn latest(&self, ticker: &str) -> Option<&'a PricePoint> {
        self.table.range(ticker, Date::MIN, self.as_of).last()
    }

    /// The last price on or before the as-of date, if no older than
    /// `max_staleness_days`.
    pub fn latest_within(&self, ticker: &str, max_staleness_days: i64) -> Option<&'a PricePoint> {
        let earliest = self
            .as_of
            .checked_sub_signed(Duration::days(max_staleness_days.max(0)))
            .unwrap_or(Date::MIN);
        self.table.range(ticker, earliest, self.as_of).last()
    }

    /// Prices from `from` up to the as-of date.
    pub fn range(&self, ticker: &str, from: Date) -> &'a [PricePoint] {
        self.table.range(ticker, from, self.as_of)
    }
}

/// Prices dated strictly after an as-of date.
#[derive(Debug, Clone, Copy)]
pub struct ForwardPrices<'a> {
    table: &'a PriceTable,
    as_of: Date,
}

impl<'a> ForwardPrices<'a> {
    pub(crate) const fn new(table: &'a PriceTable, as_of: Date) -> Self {
        Self { table, as_of }
    }

    /// The boundary date (exclusive).
    pub const fn as_of(&self) -> Date {
        self.as_of
    }

    fn first_day(&self) -> Option<Date> {
        self.as_of.succ_opt()
    }

    /// The first price on or after `target`, never earlier, and never on or
    /// before the as-of date. `max_gap_days` bounds how far past `target` the
    /// price may lie.
    pub fn first_on_or_after(
        &self,
        ticker: &str,
        target: Date,
        max_gap_days: i64,
    ) -> Option<&'a PricePoint> {
        let start = target.max(self.first_day()?);
        let end = target
            .checked_add_signed(Duration::days(max_gap_days.max(0)))
            .unwrap_or(Date::MAX);
        self.table.range(ticker, start, end).first()
    }

    /// Prices after the as-of date up to `to`.
    pub fn range(&self, ticker: &str, to: Date) -> &'a [PricePoint] {
        match self.first_day() {
            Some(start) => self.table.range(ticker, start, to),
            None => &[],
        }
    }
}
