//! Signal count command implementation.

use crate::cmd::{Context, OutputArgs, ScreenArgs, print_header, print_json};
use crate::data;
use anyhow::Result;
use ronda_eval::signal_counts_to_frame;
use ronda_screen::{
    CountOptions, CountSortKey, FamilyCount, ScreeningEngine, SignalCount, count_signals_with,
};

/// Build count options from command-line values.
pub(crate) fn count_options(
    min_signals: usize,
    max_signals: Option<usize>,
    sort_by: &str,
    ascending: bool,
) -> Result<CountOptions> {
    Ok(CountOptions {
        min_signals,
        max_signals,
        sort_by: sort_by.parse::<CountSortKey>()?,
        ascending,
    })
}

/// Screen every metric and rank companies by their flag counts.
pub(crate) fn run_counts(
    ctx: &Context,
    date: &str,
    args: &ScreenArgs,
    options: &CountOptions,
    limit: usize,
    output: &OutputArgs,
) -> Result<()> {
    let as_of = data::parse_date(date)?;
    let json = output.is_json()?;
    let dataset = ctx.dataset()?;
    let engine = ScreeningEngine::new(&dataset, ctx.screening(args));
    let outcome = engine.screen(&args.request(as_of))?;
    let counts = count_signals_with(&outcome.results, options);

    if json {
        print_json(&counts)?;
    } else {
        print_header("Signal Counts");
        println!("As of:     {} (filings available by {})", outcome.as_of, outcome.cutoff);
        println!("Detector:  {} on {} segmentation", args.detector, args.segmentation);
        let order = if options.ascending { "ascending" } else { "descending" };
        println!("Ranked by: {} ({order})", options.sort_by);
        println!("Companies: {}", counts.len());
        println!();
        print_counts(&counts, limit);
    }
    output.write(signal_counts_to_frame(&counts)?)
}

fn print_counts(counts: &[SignalCount], limit: usize) {
    if counts.is_empty() {
        println!("No companies meet the signal criteria.");
        return;
    }
    println!(
        "{:<8} {:<24} {:>5} {:>5} {:>5} {:>6} {:>7} {:>7}  Metrics",
        "Ticker", "Sector", "Fav", "Unfav", "Net", "Avail", "Value", "Quality"
    );
    println!("{}", "-".repeat(100));
    for c in counts.iter().take(limit) {
        let mut metrics: Vec<String> =
            c.favorable_metrics.iter().map(|m| format!("+{m}")).collect();
        metrics.extend(c.unfavorable_metrics.iter().map(|m| format!("-{m}")));
        println!(
            "{:<8} {:<24} {:>5} {:>5} {:>+5} {:>6} {:>7} {:>7}  {}",
            c.ticker,
            c.sector.as_deref().unwrap_or("-"),
            c.favorable,
            c.unfavorable,
            c.net(),
            c.metrics_available,
            family(&c.undervaluation),
            family(&c.quality),
            metrics.join(" ")
        );
    }
    if counts.len() > limit {
        println!("... {} more", counts.len() - limit);
    }
    println!();
}

/// `count/available`, or `-` when nothing was evaluated.
fn family(count: &FamilyCount) -> String {
    if count.available == 0 {
        "-".to_string()
    } else {
        format!("{}/{}", count.count, count.available)
    }
}
