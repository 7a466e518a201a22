//! Company profiles: one company as seen at one as-of date.

use crate::{Date, Ticker};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One company at one point-in-time snapshot.
///
/// A profile is immutable. Recomputing fundamentals at another as-of date
/// produces a new profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    ticker: Ticker,
    sector: Option<String>,
    industry: Option<String>,
    market_cap: Option<f64>,
    metrics: BTreeMap<String, Option<f64>>,
    as_of: Date,
    normalized_period: Date,
    available_on: Date,
    price: Option<f64>,
}

impl CompanyProfile {
    /// Start building a profile for `ticker` at `as_of`.
    pub fn builder(ticker: impl Into<Ticker>, as_of: Date) -> CompanyProfileBuilder {
        CompanyProfileBuilder {
            profile: Self {
                ticker: ticker.into(),
                sector: None,
                industry: None,
                market_cap: None,
                metrics: BTreeMap::new(),
                as_of,
                normalized_period: as_of,
                available_on: as_of,
                price: None,
            },
        }
    }

    /// Company identifier.
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Sector classification.
    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    /// Industry classification.
    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    /// Market capitalization at the as-of date.
    pub const fn market_cap(&self) -> Option<f64> {
        self.market_cap
    }

    /// A computed ratio. `None` when missing or non-finite.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .get(name)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    /// All computed ratios, including missing ones.
    pub const fn metrics(&self) -> &BTreeMap<String, Option<f64>> {
        &self.metrics
    }

    /// The as-of date this profile was built for.
    pub const fn as_of(&self) -> Date {
        self.as_of
    }

    /// Normalized period of the fundamental record behind this profile.
    pub const fn normalized_period(&self) -> Date {
        self.normalized_period
    }

    /// Availability date of the fundamental record behind this profile.
    pub const fn available_on(&self) -> Date {
        self.available_on
    }

    /// Price used for price-based ratios.
    pub const fn price(&self) -> Option<f64> {
        self.price
    }
}

/// Builder for [`CompanyProfile`].
#[derive(Debug, Clone)]
pub struct CompanyProfileBuilder {
    profile: CompanyProfile,
}

impl CompanyProfileBuilder {
    /// Set the sector.
    pub fn sector(mut self, sector: Option<String>) -> Self {
        self.profile.sector = sector;
        self
    }

    /// Set the industry.
    pub fn industry(mut self, industry: Option<String>) -> Self {
        self.profile.industry = industry;
        self
    }

    /// Set the market capitalization.
    pub fn market_cap(mut self, market_cap: Option<f64>) -> Self {
        self.profile.market_cap = market_cap;
        self
    }

    /// Record the period and availability of the source record.
    pub fn source(mut self, normalized_period: Date, available_on: Date) -> Self {
        self.profile.normalized_period = normalized_period;
        self.profile.available_on = available_on;
        self
    }

    /// Set the price used for ratios.
    pub fn price(mut self, price: Option<f64>) -> Self {
        self.profile.price = price;
        self
    }

    /// Add or replace one metric.
    pub fn metric(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.profile.metrics.insert(name.into(), value);
        self
    }

    /// Finish the profile.
    pub fn build(self) -> CompanyProfile {
        self.profile
    }
}
