//! Backtesting screens over a sequence of rebalance dates.
//!
//! Each rebalance date is screened on its own, bound to that date only. Forward
//! returns are then computed for every evaluated company, which gives both the
//! flagged groups and the universe baseline. Dates run in parallel and are
//! aggregated only after all of them finish.

use crate::forward::{ForwardReturnCalculator, ForwardReturnConfig};
use crate::summary::{Group, HorizonSummary};
use rayon::prelude::*;
use ronda_screen::{ScreenOutcome, ScreenRequest, ScreeningEngine};
use ronda_traits::{Date, Direction, Horizon, Result, RondaError, stats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Backtesting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// First rebalance date.
    pub start_date: Date,
    /// Last date a rebalance may fall on.
    pub end_date: Date,
    /// Step between rebalance dates.
    pub rebalance_frequency: Horizon,
    /// Forward-return horizons.
    pub horizons: Vec<Horizon>,
    /// Screen to run at each date; its own as-of date is ignored.
    pub request: ScreenRequest,
    /// Forward-return price tolerances.
    #[serde(default)]
    pub forward: ForwardReturnConfig,
}

impl BacktestConfig {
    /// Monthly rebalancing with 1M, 3M, 6M and 1Y horizons.
    pub fn new(start_date: Date, end_date: Date, request: ScreenRequest) -> Self {
        Self {
            start_date,
            end_date,
            rebalance_frequency: Horizon::ONE_MONTH,
            horizons: vec![
                Horizon::ONE_MONTH,
                Horizon::THREE_MONTHS,
                Horizon::SIX_MONTHS,
                Horizon::ONE_YEAR,
            ],
            request,
            forward: ForwardReturnConfig::default(),
        }
    }

    /// Set the rebalance frequency.
    #[must_use]
    pub const fn with_frequency(mut self, frequency: Horizon) -> Self {
        self.rebalance_frequency = frequency;
        self
    }

    /// Set the forward-return horizons.
    #[must_use]
    pub fn with_horizons(mut self, horizons: Vec<Horizon>) -> Self {
        self.horizons = horizons;
        self
    }

    /// `start + k * frequency` for k = 0, 1, ... while not after the end.
    ///
    /// # Errors
    ///
    /// [`RondaError::InvalidDate`] when the end precedes the start.
    pub fn rebalance_dates(&self) -> Result<Vec<Date>> {
        if self.end_date < self.start_date {
            return Err(RondaError::InvalidDate(format!(
                "backtest end {} precedes start {}",
                self.end_date, self.start_date
            )));
        }
        let mut dates = Vec::new();
        for k in 0.. {
            match self.rebalance_frequency.advance_by(self.start_date, k) {
                Some(date) if date <= self.end_date => dates.push(date),
                _ => break,
            }
        }
        Ok(dates)
    }
}

/// Cooperative cancellation shared between a backtest and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Dates already running finish; later ones do not
    /// start.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Forward returns of one company at one rebalance date, in horizon order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyReturns {
    /// Company ticker.
    pub ticker: String,
    /// One entry per configured horizon; `None` for a missing price.
    pub returns: Vec<Option<f64>>,
}

/// One completed rebalance date.
#[derive(Debug, Clone)]
pub struct RebalancePeriod {
    /// The rebalance date.
    pub as_of: Date,
    /// The screen, with forward returns filled in on flagged results.
    pub outcome: ScreenOutcome,
    /// Forward returns of every evaluated company, ordered by ticker.
    pub universe: Vec<CompanyReturns>,
}

impl RebalancePeriod {
    /// Tickers flagged in `direction` on at least one metric.
    pub fn flagged_tickers(&self, direction: Direction) -> BTreeSet<&str> {
        self.outcome
            .flagged()
            .filter(|r| r.verdict.direction == Some(direction))
            .map(|r| r.ticker())
            .collect()
    }

    /// Observations for horizon index `h` in `group`, one per company.
    fn observations(&self, group: Group, h: usize) -> Vec<Option<f64>> {
        let direction = match group {
            Group::Favorable => Some(Direction::Favorable),
            Group::Unfavorable => Some(Direction::Unfavorable),
            Group::Universe => None,
        };
        match direction {
            None => self.universe.iter().map(|c| c.returns[h]).collect(),
            Some(direction) => {
                let tickers = self.flagged_tickers(direction);
                self.universe
                    .iter()
                    .filter(|c| tickers.contains(c.ticker.as_str()))
                    .map(|c| c.returns[h])
                    .collect()
            }
        }
    }
}

/// A rebalance date skipped for lack of data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDate {
    /// The rebalance date.
    pub as_of: Date,
    /// Why no snapshot could be built.
    pub reason: String,
}

/// Output of a backtest.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Horizon labels, in configuration order.
    pub horizons: Vec<String>,
    /// Completed rebalance dates in date order.
    pub periods: Vec<RebalancePeriod>,
    /// Dates skipped with `DataUnavailable`.
    pub skipped: Vec<SkippedDate>,
    /// Dates not started because of cancellation.
    pub cancelled: Vec<Date>,
    /// Summaries per horizon and group.
    pub summaries: Vec<HorizonSummary>,
}

impl BacktestResult {
    /// Number of completed dates.
    pub fn completed(&self) -> usize {
        self.periods.len()
    }

    /// Number of skipped dates.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Whether the run was cut short.
    pub fn was_cancelled(&self) -> bool {
        !self.cancelled.is_empty()
    }

    /// Summary for one horizon label and group.
    pub fn summary(&self, horizon: &str, group: Group) -> Option<&HorizonSummary> {
        self.summaries
            .iter()
            .find(|s| s.horizon == horizon && s.group == group)
    }
}

enum DateOutcome {
    Completed(Box<RebalancePeriod>),
    Skipped(String),
    Cancelled,
}

/// Backtesting engine.
#[derive(Debug)]
pub struct Backtest<'a> {
    engine: &'a ScreeningEngine<'a>,
    forward: ForwardReturnCalculator<'a>,
    config: BacktestConfig,
}

impl<'a> Backtest<'a> {
    /// Create a backtest over an engine's dataset.
    pub fn new(engine: &'a ScreeningEngine<'a>, config: BacktestConfig) -> Self {
        Self {
            engine,
            forward: ForwardReturnCalculator::new(engine.dataset(), config.forward),
            config,
        }
    }

    /// The configuration.
    pub const fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Screen one date and attach forward returns.
    ///
    /// # Errors
    ///
    /// Whatever the screen raises, plus non-soft forward-return errors.
    pub fn evaluate_date(&self, as_of: Date) -> Result<RebalancePeriod> {
        let mut outcome = self.engine.screen(&self.config.request.at(as_of))?;
        let horizons = &self.config.horizons;

        let universe: Vec<CompanyReturns> = outcome
            .evaluated
            .iter()
            .map(|profile| {
                Ok(CompanyReturns {
                    ticker: profile.ticker().to_string(),
                    returns: self.forward.forward_returns(profile.ticker(), as_of, horizons)?,
                })
            })
            .collect::<Result<_>>()?;

        let by_ticker: BTreeMap<&str, &CompanyReturns> =
            universe.iter().map(|c| (c.ticker.as_str(), c)).collect();
        for result in outcome.results.iter_mut().filter(|r| r.verdict.flagged) {
            if let Some(company) = by_ticker.get(result.profile.ticker()) {
                result.forward_returns = horizons
                    .iter()
                    .zip(&company.returns)
                    .map(|(h, r)| (h.label(), *r))
                    .collect();
            }
        }

        info!(
            %as_of,
            evaluated = universe.len(),
            flagged = outcome.flagged_count(),
            "rebalance date complete"
        );
        Ok(RebalancePeriod {
            as_of,
            outcome,
            universe,
        })
    }

    /// Run over every rebalance date.
    ///
    /// # Errors
    ///
    /// Errors other than [`RondaError::DataUnavailable`] at any date abort the
    /// run. `DataUnavailable` dates are skipped and reported.
    pub fn run(&self, cancel: &CancellationToken) -> Result<BacktestResult> {
        let dates = self.config.rebalance_dates()?;
        info!(
            start = %self.config.start_date,
            end = %self.config.end_date,
            dates = dates.len(),
            frequency = %self.config.rebalance_frequency,
            "starting backtest"
        );

        let outcomes: Vec<(Date, DateOutcome)> = dates
            .par_iter()
            .map(|&as_of| {
                if cancel.is_cancelled() {
                    return Ok((as_of, DateOutcome::Cancelled));
                }
                match self.evaluate_date(as_of) {
                    Ok(period) => Ok((as_of, DateOutcome::Completed(Box::new(period)))),
                    Err(RondaError::DataUnavailable { reason, .. }) => {
                        warn!(%as_of, %reason, "skipping rebalance date");
                        Ok((as_of, DateOutcome::Skipped(reason)))
                    }
                    Err(e) => Err(e),
                }
            })
            .collect::<Result<_>>()?;

        let mut periods = Vec::new();
        let mut skipped = Vec::new();
        let mut cancelled = Vec::new();
        for (as_of, outcome) in outcomes {
            match outcome {
                DateOutcome::Completed(period) => periods.push(*period),
                DateOutcome::Skipped(reason) => skipped.push(SkippedDate { as_of, reason }),
                DateOutcome::Cancelled => cancelled.push(as_of),
            }
        }
        if !cancelled.is_empty() {
            warn!(not_started = cancelled.len(), "backtest cancelled");
        }

        let summaries = self.summarize(&periods);
        info!(
            completed = periods.len(),
            skipped = skipped.len(),
            cancelled = cancelled.len(),
            "backtest complete"
        );

        Ok(BacktestResult {
            horizons: self.config.horizons.iter().map(Horizon::label).collect(),
            periods,
            skipped,
            cancelled,
            summaries,
        })
    }

    fn summarize(&self, periods: &[RebalancePeriod]) -> Vec<HorizonSummary> {
        let mut summaries = Vec::new();
        for (h, horizon) in self.config.horizons.iter().enumerate() {
            let label = horizon.label();
            let pooled = |group: Group| -> Vec<Option<f64>> {
                periods
                    .iter()
                    .flat_map(|p| p.observations(group, h))
                    .collect()
            };
            let universe = pooled(Group::Universe);
            let universe_returns: Vec<f64> = universe.iter().flatten().copied().collect();
            let universe_mean = stats::mean(&universe_returns);
            for group in Group::ALL {
                let observations = match group {
                    Group::Universe => universe.clone(),
                    _ => pooled(group),
                };
                summaries.push(HorizonSummary::from_observations(
                    label.clone(),
                    group,
                    &observations,
                    universe_mean,
                ));
            }
        }
        summaries
    }
}
