//! Append-only in-memory tables of records, prices and ticker metadata.
//!
//! These tables are the storage seam: whatever materializes data on disk
//! loads it into them once, and the point-in-time layer only ever reads
//! through range queries.

use ronda_traits::{Date, FundamentalRecord, PricePoint, TickerInfo};
use std::collections::BTreeMap;

/// Fundamental records keyed by ticker, each list ordered by availability date.
#[derive(Debug, Clone, Default)]
pub struct FundamentalTable {
    by_ticker: BTreeMap<String, Vec<FundamentalRecord>>,
    len: usize,
}

impl FundamentalTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records in any order.
    pub fn from_records(records: impl IntoIterator<Item = FundamentalRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.append(record);
        }
        table
    }

    /// Append one record. Existing records are never modified; a restatement
    /// is simply another record for the same normalized period.
    pub fn append(&mut self, record: FundamentalRecord) {
        let records = self.by_ticker.entry(record.ticker().to_string()).or_default();
        // Keep availability order; equal dates keep insertion order.
        let at = records.partition_point(|r| r.available_on() <= record.available_on());
        records.insert(at, record);
        self.len += 1;
    }

    /// Records for one ticker whose availability date is at or before `cutoff`.
    pub fn available_by(&self, ticker: &str, cutoff: Date) -> &[FundamentalRecord] {
        let Some(records) = self.by_ticker.get(ticker) else {
            return &[];
        };
        let end = records.partition_point(|r| r.available_on() <= cutoff);
        &records[..end]
    }

    /// Every ticker with its records available at or before `cutoff`.
    ///
    /// Tickers with nothing available yet are still yielded, with an empty
    /// slice, so callers can count them.
    pub fn all_available_by(
        &self,
        cutoff: Date,
    ) -> impl Iterator<Item = (&str, &[FundamentalRecord])> + '_ {
        self.by_ticker.iter().map(move |(ticker, records)| {
            let end = records.partition_point(|r| r.available_on() <= cutoff);
            (ticker.as_str(), &records[..end])
        })
    }

    /// Earliest availability date across the table.
    pub fn earliest_available(&self) -> Option<Date> {
        self.by_ticker
            .values()
            .filter_map(|records| records.first().map(FundamentalRecord::available_on))
            .min()
    }

    /// Tickers present in the table.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.by_ticker.keys().map(String::as_str)
    }

    /// Total number of records.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the table holds no records.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Daily prices keyed by ticker, each list ordered by date.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    by_ticker: BTreeMap<String, Vec<PricePoint>>,
}

impl PriceTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(ticker, point)` pairs in any order.
    ///
    /// A second point for the same ticker and date replaces the first.
    pub fn from_points<S: Into<String>>(points: impl IntoIterator<Item = (S, PricePoint)>) -> Self {
        let mut table = Self::new();
        for (ticker, point) in points {
            table.insert(ticker, point);
        }
        table
    }

    /// Insert one price point.
    pub fn insert(&mut self, ticker: impl Into<String>, point: PricePoint) {
        let series = self.by_ticker.entry(ticker.into()).or_default();
        match series.binary_search_by(|p| p.date.cmp(&point.date)) {
            Ok(i) => series[i] = point,
            Err(i) => series.insert(i, point),
        }
    }

    /// Prices for `ticker` with `from <= date <= to`.
    pub fn range(&self, ticker: &str, from: Date, to: Date) -> &[PricePoint] {
        if from > to {
            return &[];
        }
        let Some(series) = self.by_ticker.get(ticker) else {
            return &[];
        };
        let start = series.partition_point(|p| p.date < from);
        let end = series.partition_point(|p| p.date <= to);
        &series[start..end]
    }

    /// Earliest trading date across all tickers.
    pub fn earliest_date(&self) -> Option<Date> {
        self.by_ticker
            .values()
            .filter_map(|series| series.first().map(|p| p.date))
            .min()
    }

    /// Latest trading date across all tickers.
    pub fn latest_date(&self) -> Option<Date> {
        self.by_ticker
            .values()
            .filter_map(|series| series.last().map(|p| p.date))
            .max()
    }

    /// Number of tickers with prices.
    pub fn ticker_count(&self) -> usize {
        self.by_ticker.len()
    }

    /// Whether the table holds no prices.
    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }
}

/// Ticker metadata keyed by ticker.
#[derive(Debug, Clone, Default)]
pub struct TickerTable {
    by_ticker: BTreeMap<String, TickerInfo>,
}

impl TickerTable {
    /// Build from metadata rows; later rows replace earlier ones.
    pub fn from_infos(infos: impl IntoIterator<Item = TickerInfo>) -> Self {
        Self {
            by_ticker: infos
                .into_iter()
                .map(|info| (info.ticker.clone(), info))
                .collect(),
        }
    }

    /// Metadata for one ticker.
    pub fn get(&self, ticker: &str) -> Option<&TickerInfo> {
        self.by_ticker.get(ticker)
    }

    /// Tickers with metadata.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.by_ticker.keys().map(String::as_str)
    }

    /// Number of tickers.
    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    /// Whether there is no metadata.
    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }
}
