//! Explain command implementation.

use crate::cmd::{Context, OutputArgs, ScreenArgs, fmt_opt, print_header, print_json};
use crate::data;
use anyhow::Result;
use ronda_eval::outlier_details_to_frame;
use ronda_screen::{
    OutlierDetail, ScreenResult, ScreeningEngine, metric_outliers, outlier_details,
    outlier_summary,
};
use ronda_traits::Direction;

/// What to explain.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExplainQuery {
    /// Restrict to one company.
    pub(crate) ticker: Option<String>,
    /// Rank companies on one metric instead.
    pub(crate) metric: Option<String>,
    /// Only this side of the flag.
    pub(crate) direction: Option<Direction>,
    /// Only flagged rows.
    pub(crate) outliers_only: bool,
    /// Fewest rows a metric ranking returns.
    pub(crate) min_rows: usize,
}

impl ExplainQuery {
    /// Select the rows this query asks for.
    pub(crate) fn select(&self, results: &[ScreenResult]) -> Vec<OutlierDetail> {
        let ticker = self.ticker.as_deref();
        match &self.metric {
            Some(metric) => {
                let mut rows = metric_outliers(results, metric, self.direction, self.min_rows);
                rows.retain(|d| ticker.is_none_or(|t| d.ticker == t));
                rows
            }
            None if self.outliers_only || self.direction.is_some() => {
                outlier_summary(results, ticker, self.direction)
            }
            None => outlier_details(results, ticker),
        }
    }
}

/// Screen at one date and show the per-metric breakdown.
pub(crate) fn run_explain(
    ctx: &Context,
    date: &str,
    args: &ScreenArgs,
    query: &ExplainQuery,
    limit: usize,
    output: &OutputArgs,
) -> Result<()> {
    let as_of = data::parse_date(date)?;
    let json = output.is_json()?;
    let dataset = ctx.dataset()?;
    let engine = ScreeningEngine::new(&dataset, ctx.screening(args));
    let outcome = engine.screen(&args.request(as_of))?;
    let details = query.select(&outcome.results);

    if json {
        print_json(&details)?;
    } else {
        print_header("Outlier Details");
        println!("As of:    {} (filings available by {})", outcome.as_of, outcome.cutoff);
        println!("Detector: {} on {} segmentation", args.detector, args.segmentation);
        println!("Rows:     {}", details.len());
        println!();
        print_details(&details, limit);
    }
    output.write(outlier_details_to_frame(&details)?)
}

fn print_details(details: &[OutlierDetail], limit: usize) {
    if details.is_empty() {
        println!("Nothing to explain.");
        return;
    }
    println!(
        "{:<8} {:<22} {:>12} {:>8} {:>12} {:>10} {:>5}  Direction",
        "Ticker", "Metric", "Value", "Score", "Seg mean", "Seg std", "N"
    );
    println!("{}", "-".repeat(96));
    for d in details.iter().take(limit) {
        println!(
            "{:<8} {:<22} {:>12} {:>8.2} {:>12} {:>10} {:>5}  {}",
            d.ticker,
            d.metric,
            fmt_opt(Some(d.value), 2),
            d.score,
            fmt_opt(d.segment_mean, 2),
            fmt_opt(d.segment_std, 2),
            d.segment_size.map_or_else(|| "-".to_string(), |n| n.to_string()),
            d.direction.map_or("-", |dir| dir.as_str())
        );
    }
    if details.len() > limit {
        println!("... {} more", details.len() - limit);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_results_explain_nothing() {
        let query = ExplainQuery {
            metric: Some("pe_ratio".to_string()),
            min_rows: 10,
            ..Default::default()
        };
        assert!(query.select(&[]).is_empty());
        assert!(ExplainQuery::default().select(&[]).is_empty());
    }
}
