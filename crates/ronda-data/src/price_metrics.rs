//! Trailing price statistics over split-adjusted closes.
//!
//! Windows are counted in trading rows, not calendar days: a year is
//! [`TRADING_DAYS_PER_YEAR`] rows and five years is five times that. Every
//! function takes a ticker's history ordered oldest first and ending at the
//! as-of date, and returns `None` when the history is too short.

use ronda_traits::PricePoint;
use std::collections::VecDeque;

/// Trading rows per year.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Trading rows in five years.
pub const TRADING_DAYS_5Y: usize = 5 * TRADING_DAYS_PER_YEAR;

/// Rows in the long simple moving average.
pub const SMA_LONG_DAYS: usize = 200;

/// Fewest daily returns a volatility estimate is built from.
pub const MIN_VOLATILITY_SAMPLES: usize = 20;

fn close(points: &[PricePoint], i: usize) -> Option<f64> {
    points
        .get(i)
        .map(|p| p.close_adj)
        .filter(|c| c.is_finite() && *c > 0.0)
}

fn last_close(points: &[PricePoint]) -> Option<f64> {
    close(points, points.len().checked_sub(1)?)
}

fn tail(points: &[PricePoint], rows: usize) -> &[PricePoint] {
    &points[points.len().saturating_sub(rows)..]
}

/// Return over exactly `rows` trading rows.
pub fn trailing_return(points: &[PricePoint], rows: usize) -> Option<f64> {
    let last = points.len().checked_sub(1)?;
    let base = close(points, last.checked_sub(rows)?)?;
    Some(last_close(points)? / base - 1.0)
}

/// Return over five years, or over the whole history when it is shorter.
pub fn return_5y_or_longest(points: &[PricePoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    trailing_return(points, TRADING_DAYS_5Y)
        .or_else(|| Some(last_close(points)? / close(points, 0)? - 1.0))
}

/// Worst drawdown over the last `window` rows.
///
/// Each row's drawdown is measured against the running maximum of the
/// `window` rows ending at it, so the peak may predate the window itself.
pub fn max_drawdown(points: &[PricePoint], window: usize) -> Option<f64> {
    if points.is_empty() || window == 0 {
        return None;
    }
    let first = points.len().saturating_sub(window);
    let mut peaks: VecDeque<(usize, f64)> = VecDeque::new();
    let mut worst: Option<f64> = None;

    for (i, point) in points.iter().enumerate().skip(first.saturating_sub(window - 1)) {
        let price = point.close_adj;
        if !price.is_finite() || price <= 0.0 {
            continue;
        }
        while peaks.back().is_some_and(|(_, p)| *p <= price) {
            peaks.pop_back();
        }
        peaks.push_back((i, price));
        while peaks.front().is_some_and(|(j, _)| j + window <= i) {
            peaks.pop_front();
        }
        if i < first {
            continue;
        }
        let Some(&(_, peak)) = peaks.front() else {
            continue;
        };
        let drawdown = price / peak - 1.0;
        worst = Some(worst.map_or(drawdown, |w: f64| w.min(drawdown)));
    }
    worst
}

/// Annualized sample volatility of daily returns over the last year.
pub fn volatility_1y(points: &[PricePoint]) -> Option<f64> {
    let window = tail(points, TRADING_DAYS_PER_YEAR + 1);
    let returns: Vec<f64> = window
        .windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (pair[0].close_adj, pair[1].close_adj);
            (prev > 0.0 && cur.is_finite()).then(|| cur / prev - 1.0)
        })
        .filter(|r| r.is_finite())
        .collect();
    if returns.len() < MIN_VOLATILITY_SAMPLES {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt() * (TRADING_DAYS_PER_YEAR as f64).sqrt())
}

/// Distance of the last close from the highest close of the last five years.
pub fn pct_from_high_5y(points: &[PricePoint]) -> Option<f64> {
    let high = tail(points, TRADING_DAYS_5Y)
        .iter()
        .map(|p| p.close_adj)
        .filter(|c| c.is_finite() && *c > 0.0)
        .reduce(f64::max)?;
    Some(last_close(points)? / high - 1.0)
}

/// Distance of the last close from the lowest close of the last five years.
pub fn pct_from_low_5y(points: &[PricePoint]) -> Option<f64> {
    let low = tail(points, TRADING_DAYS_5Y)
        .iter()
        .map(|p| p.close_adj)
        .filter(|c| c.is_finite() && *c > 0.0)
        .reduce(f64::min)?;
    Some(last_close(points)? / low - 1.0)
}

/// Distance of the last close from its 200-row simple moving average.
///
/// Needs a full 200 rows.
pub fn pct_from_sma_200(points: &[PricePoint]) -> Option<f64> {
    if points.len() < SMA_LONG_DAYS {
        return None;
    }
    let window = tail(points, SMA_LONG_DAYS);
    let sma = window.iter().map(|p| p.close_adj).sum::<f64>() / SMA_LONG_DAYS as f64;
    if !(sma > 0.0) {
        return None;
    }
    Some(last_close(points)? / sma - 1.0)
}
