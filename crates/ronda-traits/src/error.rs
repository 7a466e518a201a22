//! Error types for the Ronda framework.
//!
//! One error enum covers the whole pipeline. Some variants are soft: the
//! screening engine and backtest runner turn them into exclusions instead of
//! aborting. See [`RondaError::is_exclusion`].

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for Ronda operations.
#[derive(Debug, Error)]
pub enum RondaError {
    /// No snapshot source covers the requested as-of date.
    #[error("Data unavailable for {as_of}: {reason}")]
    DataUnavailable {
        /// The requested as-of date.
        as_of: NaiveDate,
        /// Why nothing could be served.
        reason: String,
    },

    /// A segmentation function could not classify a company.
    #[error("Segmentation '{segmentation}' unresolvable for {ticker}: missing {attribute}")]
    SegmentationUnresolvable {
        /// Name of the segmentation strategy.
        segmentation: String,
        /// Company that could not be classified.
        ticker: String,
        /// The attribute the strategy needed.
        attribute: String,
    },

    /// A strategy name was registered twice.
    #[error("Duplicate registration: '{0}' is already registered")]
    DuplicateRegistration(String),

    /// A price needed for a forward return is not available.
    #[error("Missing price for {ticker} near {date}")]
    MissingPrice {
        /// Company whose price is missing.
        ticker: String,
        /// The date the price was needed for.
        date: NaiveDate,
    },

    /// No segmentation registered under this name.
    #[error("Unknown segmentation: {0}")]
    UnknownSegmentation(String),

    /// No detector registered under this name.
    #[error("Unknown detector: {0}")]
    UnknownDetector(String),

    /// Metric not present in the metric catalog.
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Horizon or frequency string could not be parsed.
    #[error("Invalid horizon '{0}': expected <integer><M|Y>")]
    InvalidHorizon(String),

    /// Error due to invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error when a required column is missing from a frame.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Error when a date is out of range or invalid.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Error from Polars operations.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl RondaError {
    /// Whether the error only excludes one company (or one company-horizon)
    /// from an analysis instead of failing it.
    pub const fn is_exclusion(&self) -> bool {
        matches!(
            self,
            Self::SegmentationUnresolvable { .. } | Self::MissingPrice { .. }
        )
    }
}

/// A specialized Result type for Ronda operations.
pub type Result<T> = std::result::Result<T, RondaError>;
