#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # ronda
//!
//! Point-in-time fundamental outlier screening for equities.
//!
//! ronda is an umbrella crate that re-exports all ronda sub-crates for
//! convenience. It screens a universe of companies for metric values that
//! deviate from their peers, using only data that was knowable on the as-of
//! date, and measures whether those screens predicted forward returns.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ronda::prelude::*;
//!
//! # fn main() -> Result<()> {
//! use ronda::data::{fundamentals_from_frame, prices_from_frame, read_csv, tickers_from_frame};
//!
//! let fundamentals = fundamentals_from_frame(&read_csv("fundamentals.csv")?)?;
//! let prices = prices_from_frame(&read_csv("prices.csv")?)?;
//! let tickers = tickers_from_frame(&read_csv("tickers.csv")?)?;
//! let dataset = PointInTimeDataset::new(fundamentals, prices, tickers);
//!
//! let engine = ScreeningEngine::new(&dataset, ScreeningConfig::default());
//! let request = ScreenRequest::new(Date::from_ymd_opt(2023, 6, 30).unwrap())
//!     .with_metrics(["pe_ratio", "roe_calculated"]);
//! let outcome = engine.screen(&request)?;
//!
//! for result in outcome.flagged() {
//!     println!("{} {} {:.2}", result.ticker(), result.metric, result.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate Organization
//!
//! - [`traits`] - Core types, errors and statistics
//! - [`data`] - Tables, point-in-time snapshots and the metric catalog
//! - [`screen`] - Segmentations, detectors and the screening engine
//! - [`eval`] - Forward returns, backtests and exports
//!
//! ## Architecture
//!
//! 1. **Datasets** hold every filing and price, append-only
//! 2. **Snapshots** select what was knowable at an as-of date
//! 3. **Segmentations** group companies into peer segments
//! 4. **Detectors** flag values that deviate from their segment
//! 5. **Backtests** repeat the screen over rebalance dates and compare the
//!    forward returns of flagged companies with the universe

/// Version information for the ronda crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Core Types
// ============================================================================

/// Core types shared by every ronda crate.
///
/// - [`CompanyProfile`] - One company's derived metrics at an as-of date
/// - [`OutlierVerdict`] - A detector's judgement of one value
/// - [`Horizon`] - Calendar horizons such as `3M` and `1Y`
/// - [`Distribution`] - Summary statistics of a sample
pub mod traits {
    pub use ronda_traits::*;
}

// Re-export error types
pub use ronda_traits::{Result, RondaError};

// Re-export common types
pub use ronda_traits::{
    CompanyProfile, Date, Dimension, Direction, Horizon, OutlierVerdict, Polarity, Ticker,
};

// ============================================================================
// Data
// ============================================================================

/// Point-in-time data access.
///
/// Fundamentals are selected by availability date, never by period end, so a
/// filing published after the cutoff cannot leak into a snapshot. Prices are
/// split into a history view (on or before the as-of date) and a forward view
/// (strictly after it).
///
/// # Example
///
/// ```ignore
/// use ronda::data::PointInTimeDataset;
///
/// # fn example(dataset: &PointInTimeDataset, as_of: ronda::Date) -> ronda::Result<()> {
/// let snapshot = dataset.snapshot(as_of, 45)?;
/// println!("{} profiles, {} excluded", snapshot.profiles.len(), snapshot.exclusions.total());
/// # Ok(())
/// # }
/// ```
pub mod data {
    pub use ronda_data::*;
}

// ============================================================================
// Screening
// ============================================================================

/// Peer-group outlier screening.
///
/// ## Segmentations
///
/// - **universe**: every company in one segment
/// - **sector**, **industry**: classification from ticker metadata
/// - **cap_bucket**: market capitalization bands
/// - **sector_cap**: sector crossed with cap bucket
///
/// ## Detectors
///
/// - **sigma**: z-score against the segment mean
/// - **ratio_to_mean**: multiple of the segment mean
/// - **mad**: modified z-score on the median absolute deviation
/// - **percentile**: rank within the segment
///
/// ## Reductions
///
/// - [`count_signals`](ronda_screen::count_signals): flags per company, with
///   undervaluation and quality families
/// - [`match_conditions`](ronda_screen::match_conditions): AND/OR screens
///   across metrics
/// - [`outlier_details`](ronda_screen::outlier_details): why a company was
///   flagged
pub mod screen {
    pub use ronda_screen::*;
}

// ============================================================================
// Evaluation
// ============================================================================

/// Forward returns and backtesting.
///
/// ```text
/// forward_return = close_adj(first trading day >= as_of + horizon) / close_adj(as_of) - 1
/// ```
///
/// A missing price is reported as missing, never as a zero return.
pub mod eval {
    pub use ronda_eval::*;
}

// ============================================================================
// Prelude
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use ronda::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CompanyProfile, Date, Direction, Horizon, OutlierVerdict, Polarity};
    pub use crate::{Result, RondaError};
    pub use ronda_data::{PointInTimeDataset, PointInTimePolicy};
    pub use ronda_eval::{Backtest, BacktestConfig, CancellationToken, Group};
    pub use ronda_screen::{
        MatchMode, MetricCondition, ScreenRequest, ScreeningConfig, ScreeningEngine,
        count_signals, match_conditions,
    };
}

// ============================================================================
// Tests
// ============================================================================
