#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Point-in-time data layer for Ronda.
//!
//! Raw fundamentals and prices are loaded once into append-only tables. A
//! [`PointInTimeDataset`] then answers "what was knowable on this date" by
//! building [`Snapshot`]s: one [`ronda_traits::CompanyProfile`] per company,
//! computed only from filings available by the cutoff and prices dated on or
//! before the as-of date.
//!
//! ## Modules
//!
//! - [`tables`] - Append-only record, price and metadata tables
//! - [`view`] - Price views on either side of an as-of boundary
//! - [`metrics`] - Ratio, growth and price metric definitions and the catalog
//! - [`price_metrics`] - Trailing return, drawdown and volatility statistics
//! - [`snapshot`] - Point-in-time record selection and profile building
//! - [`frame`] - Loading tables from polars DataFrames and CSV files

/// The version of the ronda-data crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod frame;
pub mod metrics;
pub mod price_metrics;
pub mod snapshot;
pub mod tables;
pub mod view;

// Re-exports
pub use frame::{fundamentals_from_frame, prices_from_frame, read_csv, tickers_from_frame};
pub use metrics::{MetricCatalog, MetricCategory, MetricDef, MetricInputs};
pub use snapshot::{
    DEFAULT_REPORTING_DELAY_DAYS, PointInTimeDataset, PointInTimePolicy, Snapshot,
    SnapshotExclusions,
};
pub use tables::{FundamentalTable, PriceTable, TickerTable};
pub use view::{ForwardPrices, PriceHistory};
