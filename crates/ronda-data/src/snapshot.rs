//! Point-in-time dataset and snapshots.
//!
//! A snapshot answers one question: what did the world look like on the
//! as-of date, given that filings only become usable `reporting_delay_days`
//! after they are published? For every company it selects the most recent
//! knowable version of the most recent knowable period and derives the ratio
//! profile from it, using prices no later than the as-of date. Growth metrics
//! compare against the latest knowable versions of the periods one quarter
//! and one year earlier.

use crate::metrics::{MetricCatalog, MetricInputs};
use crate::tables::{FundamentalTable, PriceTable, TickerTable};
use crate::view::{ForwardPrices, PriceHistory};
use chrono::{Duration, Months};
use rayon::prelude::*;
use ronda_traits::{CompanyProfile, Date, Dimension, FundamentalRecord, Result, RondaError};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Conventional lag between period end and usable filings.
pub const DEFAULT_REPORTING_DELAY_DAYS: i64 = 45;

/// How far a prior period's end may sit from the expected date.
pub const PRIOR_PERIOD_TOLERANCE_DAYS: i64 = 20;

/// Which filed records are eligible for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PointInTimePolicy {
    /// Only records of this reporting dimension are eligible (None: any).
    pub dimension: Option<Dimension>,
    /// Ignore records filed more than this many days after period end.
    pub max_filing_lag_days: Option<i64>,
    /// Exclude a company whose selected record became available longer ago
    /// than this, relative to the as-of date.
    pub max_record_age_days: Option<i64>,
    /// Oldest price (in calendar days) usable for ratio computation.
    pub max_price_staleness_days: i64,
}

impl Default for PointInTimePolicy {
    fn default() -> Self {
        Self {
            dimension: Some(Dimension::Mrq),
            max_filing_lag_days: None,
            max_record_age_days: Some(365),
            max_price_staleness_days: 10,
        }
    }
}

/// Why companies were left out of a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotExclusions {
    /// Companies with no eligible record at the cutoff.
    pub no_record: usize,
    /// Companies whose selected record is older than the age limit.
    pub stale_record: usize,
}

impl SnapshotExclusions {
    /// Total companies excluded for missing data.
    pub const fn total(&self) -> usize {
        self.no_record + self.stale_record
    }
}

/// Everything knowable at one as-of date.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    /// The as-of date.
    pub as_of: Date,
    /// `as_of - reporting_delay_days`; no record behind this snapshot became
    /// available after it.
    pub cutoff: Date,
    /// One profile per included company, ordered by ticker.
    pub profiles: Vec<Arc<CompanyProfile>>,
    /// Prices usable for ratios (dated on or before `as_of`).
    pub prices: PriceHistory<'a>,
    /// Exclusion counts.
    pub exclusions: SnapshotExclusions,
}

/// The authoritative, read-only fundamental and price tables.
#[derive(Debug, Clone)]
pub struct PointInTimeDataset {
    fundamentals: FundamentalTable,
    prices: PriceTable,
    tickers: TickerTable,
    catalog: MetricCatalog,
    policy: PointInTimePolicy,
}

impl PointInTimeDataset {
    /// Create a dataset with the default metric catalog and policy.
    pub fn new(fundamentals: FundamentalTable, prices: PriceTable, tickers: TickerTable) -> Self {
        Self {
            fundamentals,
            prices,
            tickers,
            catalog: MetricCatalog::with_defaults(),
            policy: PointInTimePolicy::default(),
        }
    }

    /// Replace the selection policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PointInTimePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the metric catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: MetricCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// The metric catalog profiles are built with.
    pub const fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// The selection policy.
    pub const fn policy(&self) -> &PointInTimePolicy {
        &self.policy
    }

    /// Ticker metadata.
    pub const fn tickers(&self) -> &TickerTable {
        &self.tickers
    }

    /// Number of ingested fundamental records.
    pub const fn record_count(&self) -> usize {
        self.fundamentals.len()
    }

    /// Earliest and latest dates any table covers.
    pub fn coverage(&self) -> Option<(Date, Date)> {
        let start = self.fundamentals.earliest_available()?.max(self.prices.earliest_date()?);
        let end = self.prices.latest_date()?;
        Some((start, end))
    }

    /// The availability cutoff for an as-of date.
    ///
    /// # Errors
    ///
    /// [`RondaError::InvalidDate`] when the subtraction leaves the calendar.
    pub fn cutoff(as_of: Date, reporting_delay_days: i64) -> Result<Date> {
        as_of
            .checked_sub_signed(Duration::days(reporting_delay_days))
            .ok_or_else(|| {
                RondaError::InvalidDate(format!(
                    "{as_of} minus {reporting_delay_days} days is out of range"
                ))
            })
    }

    /// Price view for ratio computation: dates on or before `as_of` only.
    pub const fn price_history(&self, as_of: Date) -> PriceHistory<'_> {
        PriceHistory::new(&self.prices, as_of)
    }

    /// Price view for forward returns: dates strictly after `as_of` only.
    pub const fn forward_prices(&self, as_of: Date) -> ForwardPrices<'_> {
        ForwardPrices::new(&self.prices, as_of)
    }

    fn is_eligible(&self, record: &FundamentalRecord) -> bool {
        if let Some(dimension) = self.policy.dimension
            && record.dimension() != dimension
        {
            return false;
        }
        if let Some(max_lag) = self.policy.max_filing_lag_days
            && record.filing_lag_days() > max_lag
        {
            return false;
        }
        true
    }

    /// The most recent knowable version of the most recent knowable period.
    ///
    /// `candidates` must already be restricted to records available by the
    /// cutoff.
    fn select<'r>(&self, candidates: &'r [FundamentalRecord]) -> Option<&'r FundamentalRecord> {
        candidates
            .iter()
            .filter(|r| self.is_eligible(r))
            .max_by_key(|r| (r.normalized_period(), r.available_on()))
    }

    /// The latest knowable version of the period `months` before `current`.
    ///
    /// Periods within [`PRIOR_PERIOD_TOLERANCE_DAYS`] of the expected end
    /// qualify; the closest wins.
    fn prior<'r>(
        &self,
        candidates: &'r [FundamentalRecord],
        current: &FundamentalRecord,
        months: u32,
    ) -> Option<&'r FundamentalRecord> {
        let target = current
            .normalized_period()
            .checked_sub_months(Months::new(months))?;
        candidates
            .iter()
            .filter(|r| self.is_eligible(r) && r.dimension() == current.dimension())
            .filter(|r| r.normalized_period() < current.normalized_period())
            .map(|r| ((r.normalized_period() - target).num_days().abs(), r))
            .filter(|(distance, _)| *distance <= PRIOR_PERIOD_TOLERANCE_DAYS)
            .max_by_key(|(distance, r)| (Reverse(*distance), r.available_on()))
            .map(|(_, r)| r)
    }

    fn unavailable(&self, as_of: Date, cutoff: Date) -> RondaError {
        let reason = match self.fundamentals.earliest_available() {
            None => "no fundamental records ingested".to_string(),
            Some(first) => format!(
                "no eligible record available by cutoff {cutoff} (earliest availability {first})"
            ),
        };
        RondaError::DataUnavailable { as_of, reason }
    }

    /// Build the snapshot for `as_of`.
    ///
    /// # Errors
    ///
    /// [`RondaError::DataUnavailable`] when no record is knowable at the
    /// cutoff or no price exists on or before `as_of`. A company without a
    /// knowable record is excluded and counted, never defaulted.
    pub fn snapshot(&self, as_of: Date, reporting_delay_days: i64) -> Result<Snapshot<'_>> {
        let cutoff = Self::cutoff(as_of, reporting_delay_days)?;

        match self.prices.earliest_date() {
            Some(first) if first <= as_of => {}
            Some(first) => {
                return Err(RondaError::DataUnavailable {
                    as_of,
                    reason: format!("prices start at {first}"),
                });
            }
            None => {
                return Err(RondaError::DataUnavailable {
                    as_of,
                    reason: "no prices ingested".to_string(),
                });
            }
        }

        let mut exclusions = SnapshotExclusions::default();
        let mut selected = Vec::new();
        for (_, records) in self.fundamentals.all_available_by(cutoff) {
            match self.select(records) {
                Some(record) => selected.push((record, records)),
                None => exclusions.no_record += 1,
            }
        }
        // Tickers known only through metadata have nothing knowable either.
        exclusions.no_record += self
            .tickers
            .tickers()
            .filter(|t| self.fundamentals.available_by(t, Date::MAX).is_empty())
            .count();

        if selected.is_empty() {
            return Err(self.unavailable(as_of, cutoff));
        }

        let oldest_allowed = self
            .policy
            .max_record_age_days
            .and_then(|days| as_of.checked_sub_signed(Duration::days(days)));
        if let Some(oldest) = oldest_allowed {
            let before = selected.len();
            selected.retain(|(r, _)| r.available_on() >= oldest);
            exclusions.stale_record += before - selected.len();
        }

        let history = self.price_history(as_of);
        let profiles: Vec<Arc<CompanyProfile>> = selected
            .par_iter()
            .map(|(record, candidates)| Arc::new(self.profile(record, candidates, &history)))
            .collect();

        debug!(
            %as_of,
            %cutoff,
            profiles = profiles.len(),
            no_record = exclusions.no_record,
            stale_record = exclusions.stale_record,
            "built point-in-time snapshot"
        );

        Ok(Snapshot {
            as_of,
            cutoff,
            profiles,
            prices: history,
            exclusions,
        })
    }

    /// Profiles for every period that became knowable in the `window_days`
    /// before the cutoff, each as it looked on its own availability date.
    ///
    /// Only the latest version of each period knowable at the cutoff is kept.
    /// These pool a segment's recent history for rolling statistics.
    ///
    /// # Errors
    ///
    /// [`RondaError::InvalidDate`] when the cutoff leaves the calendar.
    pub fn window_profiles(
        &self,
        as_of: Date,
        reporting_delay_days: i64,
        window_days: i64,
    ) -> Result<Vec<Arc<CompanyProfile>>> {
        let cutoff = Self::cutoff(as_of, reporting_delay_days)?;
        let start = cutoff
            .checked_sub_signed(Duration::days(window_days.max(0)))
            .unwrap_or(Date::MIN);

        let mut picked: Vec<&FundamentalRecord> = Vec::new();
        for (_, records) in self.fundamentals.all_available_by(cutoff) {
            // Availability order, so later versions replace earlier ones.
            let mut latest: BTreeMap<Date, &FundamentalRecord> = BTreeMap::new();
            for record in records.iter().filter(|r| self.is_eligible(r)) {
                latest.insert(record.normalized_period(), record);
            }
            picked.extend(latest.into_values().filter(|r| r.available_on() >= start));
        }

        let profiles: Vec<Arc<CompanyProfile>> = picked
            .par_iter()
            .map(|record| {
                let seen = record.available_on();
                let candidates = self.fundamentals.available_by(record.ticker(), seen);
                Arc::new(self.profile(record, candidates, &self.price_history(seen)))
            })
            .collect();

        debug!(%as_of, %cutoff, window_days, profiles = profiles.len(), "built window profiles");
        Ok(profiles)
    }

    fn profile(
        &self,
        record: &FundamentalRecord,
        candidates: &[FundamentalRecord],
        history: &PriceHistory<'_>,
    ) -> CompanyProfile {
        let ticker = record.ticker();
        let latest = history.latest_within(ticker, self.policy.max_price_staleness_days);
        let price = latest.map(|p| p.close);
        let market_cap = match (price, record.item("sharesbas")) {
            (Some(price), Some(shares)) => Some(price * shares),
            _ => record.item("marketcap"),
        };
        // A stale price disqualifies the trailing statistics as well.
        let series = match latest {
            Some(_) => history.range(ticker, Date::MIN),
            None => &[],
        };

        let inputs = MetricInputs::new(record, price, market_cap)
            .with_priors(
                self.prior(candidates, record, 3),
                self.prior(candidates, record, 12),
            )
            .with_history(series);
        let info = self.tickers.get(ticker);

        let mut builder = CompanyProfile::builder(ticker, history.as_of())
            .sector(info.and_then(|i| i.sector.clone()))
            .industry(info.and_then(|i| i.industry.clone()))
            .market_cap(market_cap)
            .price(price)
            .source(record.normalized_period(), record.available_on());
        for def in self.catalog.iter() {
            builder = builder.metric(def.name, def.compute(&inputs));
        }
        builder.build()
    }
}
