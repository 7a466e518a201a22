//! Loading tables from polars DataFrames.
//!
//! Column names follow the Sharadar layout: `SF1` for fundamentals, `SEP` for
//! prices and `TICKERS` for metadata. Date columns may be typed `Date` or hold
//! `YYYY-MM-DD` strings.

use crate::tables::{FundamentalTable, PriceTable, TickerTable};
use polars::prelude::*;
use ronda_traits::{
    CE_TO_UNIX_EPOCH_DAYS, Date, Dimension, FundamentalRecord, PricePoint, Result, RondaError,
    TickerInfo,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Fundamental columns that are keys rather than line items.
const FUNDAMENTAL_KEYS: [&str; 5] =
    ["ticker", "dimension", "reportperiod", "calendardate", "datekey"];

/// Read a CSV file with a header row into a DataFrame.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!(path = %path.display(), rows = df.height(), "read csv");
    Ok(df)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| RondaError::MissingColumn(name.to_string()))
}

fn parse_date(s: &str) -> Result<Date> {
    let s = s.trim();
    let day = s.get(..10).unwrap_or(s);
    Date::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| RondaError::InvalidDate(format!("'{s}': {e}")))
}

fn date_values(column: &Column) -> Result<Vec<Option<Date>>> {
    let series = column.as_materialized_series();
    if series.dtype() == &DataType::Date {
        return Ok(series
            .date()?
            .into_iter()
            .map(|d: Option<i32>| {
                d.and_then(|d| Date::from_num_days_from_ce_opt(d + CE_TO_UNIX_EPOCH_DAYS))
            })
            .collect());
    }
    let strings = series.cast(&DataType::String)?;
    strings
        .str()?
        .into_iter()
        .map(|s: Option<&str>| match s {
            Some(s) if !s.trim().is_empty() => parse_date(s).map(Some),
            _ => Ok(None),
        })
        .collect()
}

fn f64_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn str_values(column: &Column) -> Result<Vec<Option<String>>> {
    let series = column.as_materialized_series().cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect())
}

/// Build a [`FundamentalTable`] from an SF1-style frame.
///
/// Required columns: `ticker`, `reportperiod`, `calendardate`, `datekey`.
/// `dimension` defaults to MRQ when absent. Every other numeric column is a
/// line item; nulls are simply not recorded. Rows with missing keys, unknown
/// dimensions, or an availability date before their period are skipped.
///
/// # Errors
///
/// [`RondaError::MissingColumn`] for a missing required column and
/// [`RondaError::InvalidDate`] for an unparseable date.
pub fn fundamentals_from_frame(df: &DataFrame) -> Result<FundamentalTable> {
    let tickers = str_values(column(df, "ticker")?)?;
    let period_end = date_values(column(df, "reportperiod")?)?;
    let normalized = date_values(column(df, "calendardate")?)?;
    let available = date_values(column(df, "datekey")?)?;
    let dimensions = match df.column("dimension") {
        Ok(c) => str_values(c)?,
        Err(_) => vec![Some(Dimension::Mrq.to_string()); df.height()],
    };

    let mut items: Vec<(String, Vec<Option<f64>>)> = Vec::new();
    for c in df.get_columns() {
        let name = c.name().as_str();
        if FUNDAMENTAL_KEYS.contains(&name)
            || matches!(c.dtype(), DataType::String | DataType::Date)
        {
            continue;
        }
        items.push((name.to_string(), f64_values(c)?));
    }

    let mut table = FundamentalTable::new();
    let mut skipped = 0usize;
    for row in 0..df.height() {
        let (Some(ticker), Some(period_end), Some(normalized), Some(available), Some(dimension)) = (
            &tickers[row],
            period_end[row],
            normalized[row],
            available[row],
            &dimensions[row],
        ) else {
            skipped += 1;
            continue;
        };
        let Ok(dimension) = dimension.parse::<Dimension>() else {
            skipped += 1;
            continue;
        };
        let values: BTreeMap<String, f64> = items
            .iter()
            .filter_map(|(name, values)| values[row].map(|v| (name.clone(), v)))
            .collect();
        let record = FundamentalRecord::new(
            ticker.as_str(),
            period_end,
            normalized,
            available,
            dimension,
            values,
        );
        match record {
            Ok(record) => table.append(record),
            Err(e) => {
                warn!(error = %e, "skipping fundamental row");
                skipped += 1;
            }
        }
    }

    debug!(records = table.len(), skipped, line_items = items.len(), "loaded fundamentals");
    Ok(table)
}

/// Build a [`PriceTable`] from an SEP-style frame.
///
/// Required columns: `ticker`, `date`, `close`. `open`, `high` and `low`
/// default to `close`, `closeadj` defaults to `close` and `volume` to zero.
///
/// # Errors
///
/// [`RondaError::MissingColumn`] for a missing required column and
/// [`RondaError::InvalidDate`] for an unparseable date.
pub fn prices_from_frame(df: &DataFrame) -> Result<PriceTable> {
    let tickers = str_values(column(df, "ticker")?)?;
    let dates = date_values(column(df, "date")?)?;
    let close = f64_values(column(df, "close")?)?;
    let optional = |name: &str| -> Result<Option<Vec<Option<f64>>>> {
        df.column(name).ok().map(f64_values).transpose()
    };
    let open = optional("open")?;
    let high = optional("high")?;
    let low = optional("low")?;
    let volume = optional("volume")?;
    let close_adj = optional("closeadj")?;
    let pick = |values: &Option<Vec<Option<f64>>>, row: usize, fallback: f64| {
        values.as_ref().and_then(|v| v[row]).unwrap_or(fallback)
    };

    let mut table = PriceTable::new();
    let mut skipped = 0usize;
    for row in 0..df.height() {
        let (Some(ticker), Some(date), Some(c)) = (&tickers[row], dates[row], close[row]) else {
            skipped += 1;
            continue;
        };
        let point = PricePoint {
            date,
            open: pick(&open, row, c),
            high: pick(&high, row, c),
            low: pick(&low, row, c),
            close: c,
            volume: pick(&volume, row, 0.0),
            close_adj: pick(&close_adj, row, c),
        };
        table.insert(ticker.as_str(), point);
    }

    debug!(tickers = table.ticker_count(), skipped, "loaded prices");
    Ok(table)
}

/// Build a [`TickerTable`] from a TICKERS-style frame.
///
/// Requires `ticker`; `sector` and `industry` are optional.
///
/// # Errors
///
/// [`RondaError::MissingColumn`] when `ticker` is absent.
pub fn tickers_from_frame(df: &DataFrame) -> Result<TickerTable> {
    let tickers = str_values(column(df, "ticker")?)?;
    let optional = |name: &str| -> Result<Vec<Option<String>>> {
        match df.column(name) {
            Ok(c) => str_values(c),
            Err(_) => Ok(vec![None; df.height()]),
        }
    };
    let sectors = optional("sector")?;
    let industries = optional("industry")?;

    let table = TickerTable::from_infos(tickers.into_iter().enumerate().filter_map(|(row, t)| {
        t.map(|t| TickerInfo::new(t, sectors[row].clone(), industries[row].clone()))
    }));
    debug!(tickers = table.len(), "loaded ticker metadata");
    Ok(table)
}
