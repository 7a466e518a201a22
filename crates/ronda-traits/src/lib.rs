#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core types for the Ronda fundamental screening framework.
//!
//! This crate holds the vocabulary shared by every other Ronda crate: raw
//! records, company profiles, outlier verdicts, calendar horizons, distribution
//! statistics and the common error type.

/// The version of the ronda-traits crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod error;
pub mod horizon;
pub mod profile;
pub mod records;
pub mod stats;
pub mod types;

// Re-exports
pub use error::{Result, RondaError};
pub use horizon::{Horizon, HorizonUnit};
pub use profile::{CompanyProfile, CompanyProfileBuilder};
pub use records::{FundamentalRecord, PricePoint, TickerInfo};
pub use stats::Distribution;
pub use types::{
    CE_TO_UNIX_EPOCH_DAYS, Date, Dimension, Direction, OutlierVerdict, Polarity, Ticker,
};
