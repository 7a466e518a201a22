#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ronda/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Peer-group outlier screening for Ronda.
//!
//! Segmentations and detectors are plain functions held in name-keyed
//! registries, populated once before a run and only borrowed afterwards. The
//! [`ScreeningEngine`] composes them with a point-in-time snapshot into
//! deterministically ordered [`ScreenResult`]s.
//!
//! ## Modules
//!
//! - [`segmentation`] - Segmentation strategies and their registry
//! - [`detector`] - Outlier detectors and their registry
//! - [`segment`] - Peer groups with lazily cached metric distributions
//! - [`engine`] - The screening pass
//! - [`counts`] - Count-based multi-signal ranking
//! - [`conditions`] - AND/OR screens across several metrics
//! - [`explain`] - Per-metric breakdown of results

/// The version of the ronda-screen crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Module declarations
pub mod conditions;
pub mod counts;
pub mod detector;
pub mod engine;
pub mod explain;
pub mod segment;
pub mod segmentation;

// Re-exports
pub use conditions::{ConditionMatch, MatchMode, MetricCondition, Side, match_conditions};
pub use counts::{
    CountOptions, CountSortKey, FamilyCount, SignalCount, SignalFamily, count_signals,
    count_signals_with,
};
pub use detector::{DetectorConfig, DetectorFn, DetectorInfo, DetectorRegistry};
pub use engine::{
    CapFilter, ExclusionReport, ScreenOutcome, ScreenRequest, ScreenResult, ScreeningConfig,
    ScreeningEngine, sort_results,
};
pub use explain::{OutlierDetail, metric_outliers, outlier_details, outlier_summary};
pub use segment::{MetricSample, Segment};
pub use segmentation::{
    CapBucket, SegmentKey, SegmentationFn, SegmentationInfo, SegmentationRegistry,
};
