#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Screen evaluation for Ronda.
//!
//! This crate measures whether screens predict anything. It computes
//! realized forward returns strictly after each as-of date, runs screens over
//! a sequence of rebalance dates, and pools the returns of flagged companies
//! against the universe baseline.
//!
//! ## Modules
//!
//! - [`forward`] - Forward returns over calendar horizons
//! - [`backtest`] - Rebalance loop, skips and cancellation
//! - [`summary`] - Per-horizon, per-group statistics
//! - [`export`] - Flat rows and DataFrames for reporting

/// The version of the ronda-eval crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod backtest;
pub mod export;
pub mod forward;
pub mod summary;

// Re-exports
pub use backtest::{
    Backtest, BacktestConfig, BacktestResult, CancellationToken, CompanyReturns, RebalancePeriod,
    SkippedDate,
};
pub use export::{
    BacktestReport, ScreenRow, outlier_details_to_frame, screen_results_to_frame, screen_rows,
    screen_rows_to_frame, signal_counts_to_frame, summaries_to_frame,
};
pub use forward::{ForwardReturnCalculator, ForwardReturnConfig};
pub use summary::{Group, HorizonSummary};
