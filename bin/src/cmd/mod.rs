//! CLI subcommand modules.
//!
//! This module contains the implementations for all ronda CLI subcommands
//! and the arguments they share.

pub(crate) mod backtest;
pub(crate) mod counts;
pub(crate) mod explain;
pub(crate) mod list;
pub(crate) mod multi;
pub(crate) mod screen;

use crate::config::CliConfig;
use crate::data;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use polars::prelude::DataFrame;
use ronda_data::PointInTimeDataset;
use ronda_screen::{CapFilter, ScreenRequest, ScreeningConfig};
use serde::Serialize;
use std::path::PathBuf;

/// Options shared by every command that runs a screen.
#[derive(Args, Debug, Clone)]
pub(crate) struct ScreenArgs {
    /// Segmentation strategy
    #[arg(short, long, default_value = "sector")]
    pub(crate) segmentation: String,

    /// Outlier detector
    #[arg(short, long, default_value = "sigma")]
    pub(crate) detector: String,

    /// Metrics to screen (comma-separated, defaults to all)
    #[arg(short, long, value_delimiter = ',')]
    pub(crate) metrics: Vec<String>,

    /// Keep only these sectors (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub(crate) sectors: Vec<String>,

    /// Minimum market cap in dollars
    #[arg(long)]
    pub(crate) min_cap: Option<f64>,

    /// Maximum market cap in dollars
    #[arg(long)]
    pub(crate) max_cap: Option<f64>,

    /// Days between filing availability and use (overrides the config file)
    #[arg(long)]
    pub(crate) delay: Option<i64>,

    /// Sigma detector threshold (overrides the config file)
    #[arg(long)]
    pub(crate) sigma: Option<f64>,

    /// Compare against every filing of the last N days instead of the latest
    #[arg(long)]
    pub(crate) window_days: Option<i64>,
}

impl ScreenArgs {
    /// The request these arguments describe, at `as_of`.
    pub(crate) fn request(&self, as_of: NaiveDate) -> ScreenRequest {
        ScreenRequest::new(as_of)
            .with_segmentation(&self.segmentation)
            .with_detector(&self.detector)
            .with_metrics(&self.metrics)
            .with_sectors(&self.sectors)
            .with_cap_filter(CapFilter::new(self.min_cap, self.max_cap))
    }
}

/// Where and how to write results.
#[derive(Args, Debug, Clone)]
pub(crate) struct OutputArgs {
    /// Output format (text or json)
    #[arg(long, default_value = "text")]
    pub(crate) format: String,

    /// Also write results to this CSV file
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,
}

impl OutputArgs {
    /// Whether JSON output was requested.
    pub(crate) fn is_json(&self) -> Result<bool> {
        match self.format.to_lowercase().as_str() {
            "text" => Ok(false),
            "json" => Ok(true),
            other => bail!("Unknown format '{other}'. Use text or json."),
        }
    }

    /// Write the frame to `--output` when given.
    pub(crate) fn write(&self, mut df: DataFrame) -> Result<()> {
        if let Some(path) = &self.output {
            data::write_csv(&mut df, path)?;
            println!("Wrote {} rows to {}", df.height(), path.display());
        }
        Ok(())
    }
}

/// State every command starts from.
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) data_dir: PathBuf,
    pub(crate) config: CliConfig,
}

impl Context {
    /// Load the dataset under the configured policy.
    pub(crate) fn dataset(&self) -> Result<PointInTimeDataset> {
        data::load_dataset(&self.data_dir, self.config.policy.clone())
    }

    /// Screening configuration with command-line overrides applied.
    pub(crate) fn screening(&self, args: &ScreenArgs) -> ScreeningConfig {
        let mut config = self.config.screening;
        if let Some(delay) = args.delay {
            config.reporting_delay_days = delay;
        }
        if let Some(sigma) = args.sigma {
            config.detectors.sigma_threshold = sigma;
        }
        if args.window_days.is_some() {
            config.window_days = args.window_days;
        }
        config
    }
}

/// Print a boxed section title.
pub(crate) fn print_header(title: &str) {
    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║{title:^62}║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");
}

/// Print a value as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format an optional number, `-` when absent.
pub(crate) fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

/// Format an optional fraction as a percentage.
pub(crate) fn fmt_pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:+.2}%", v * 100.0))
}
