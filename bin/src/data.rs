//! Data loading utilities for the Ronda CLI.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use ronda_data::{
    PointInTimeDataset, PointInTimePolicy, TickerTable, fundamentals_from_frame,
    prices_from_frame, read_csv, tickers_from_frame,
};
use ronda_traits::RondaError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the default data directory.
pub(crate) const DATA_DIR_ENV: &str = "RONDA_DATA_DIR";

/// The flag value, else `RONDA_DATA_DIR`, else `./data`.
pub(crate) fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Load `fundamentals.csv`, `prices.csv` and (if present) `tickers.csv`.
pub(crate) fn load_dataset(dir: &Path, policy: PointInTimePolicy) -> Result<PointInTimeDataset> {
    let fundamentals_path = dir.join("fundamentals.csv");
    let fundamentals = read_csv(&fundamentals_path)
        .and_then(|df| fundamentals_from_frame(&df))
        .with_context(|| format!("loading {}", fundamentals_path.display()))?;

    let prices_path = dir.join("prices.csv");
    let prices = read_csv(&prices_path)
        .and_then(|df| prices_from_frame(&df))
        .with_context(|| format!("loading {}", prices_path.display()))?;

    let tickers_path = dir.join("tickers.csv");
    let tickers = if tickers_path.exists() {
        read_csv(&tickers_path)
            .and_then(|df| tickers_from_frame(&df))
            .with_context(|| format!("loading {}", tickers_path.display()))?
    } else {
        warn!(
            path = %tickers_path.display(),
            "no ticker metadata; sector segmentations will not resolve"
        );
        TickerTable::default()
    };

    info!(
        records = fundamentals.len(),
        price_tickers = prices.ticker_count(),
        companies = tickers.len(),
        "loaded dataset"
    );
    Ok(PointInTimeDataset::new(fundamentals, prices, tickers).with_policy(policy))
}

/// Parse a date string in YYYY-MM-DD format.
pub(crate) fn parse_date(date_str: &str) -> Result<NaiveDate, RondaError> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|e| RondaError::InvalidDate(format!("Invalid date format '{date_str}': {e}")))
}

/// Write a frame as CSV with a header row.
pub(crate) fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), rows = df.height(), "wrote csv");
    Ok(())
}
