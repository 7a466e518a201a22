//! Screen command implementation.

use crate::cmd::{Context, OutputArgs, ScreenArgs, fmt_opt, print_header, print_json};
use crate::data;
use anyhow::Result;
use ronda_eval::{screen_results_to_frame, screen_rows};
use ronda_screen::{ScreenOutcome, ScreenResult, ScreeningEngine};

/// Screen the universe at one date.
pub(crate) fn run_screen(
    ctx: &Context,
    date: &str,
    args: &ScreenArgs,
    all: bool,
    limit: usize,
    output: &OutputArgs,
) -> Result<()> {
    let as_of = data::parse_date(date)?;
    let json = output.is_json()?;
    let dataset = ctx.dataset()?;
    let engine = ScreeningEngine::new(&dataset, ctx.screening(args));
    let outcome = engine.screen(&args.request(as_of))?;

    let shown: Vec<ScreenResult> = if all {
        outcome.results.clone()
    } else {
        outcome.flagged().cloned().collect()
    };

    if json {
        print_json(&screen_rows(&shown))?;
    } else {
        print_outcome(&outcome, args, &shown, limit);
    }
    output.write(screen_results_to_frame(&shown)?)
}

fn print_outcome(outcome: &ScreenOutcome, args: &ScreenArgs, shown: &[ScreenResult], limit: usize) {
    print_header("Outlier Screen");

    println!("As of:        {} (filings available by {})", outcome.as_of, outcome.cutoff);
    println!("Segmentation: {}", args.segmentation);
    println!("Detector:     {}", args.detector);
    println!(
        "Evaluated:    {} companies in {} segments",
        outcome.evaluated.len(),
        outcome.segments
    );
    println!(
        "Flagged:      {} of {} evaluations",
        outcome.flagged_count(),
        outcome.results.len()
    );

    let ex = &outcome.exclusions;
    println!(
        "Excluded:     {} missing data, {} filtered, {} unresolved",
        ex.missing_data, ex.filtered_out, ex.unresolved_segment
    );
    println!(
        "              {} small segment, {} missing metric",
        ex.small_segment, ex.missing_metric
    );
    println!();

    if shown.is_empty() {
        println!("No outliers found.");
        return;
    }

    println!(
        "{:<8} {:<22} {:<18} {:>12} {:>8} {:>8}  Direction",
        "Ticker", "Segment", "Metric", "Value", "Score", "Mag"
    );
    println!("{}", "-".repeat(92));
    for r in shown.iter().take(limit) {
        let direction = r.verdict.direction.map_or("-", |d| d.as_str());
        println!(
            "{:<8} {:<22} {:<18} {:>12} {:>8.2} {:>8.2}  {}",
            r.ticker(),
            truncate(r.segment.as_str(), 22),
            r.metric,
            fmt_opt(Some(r.value), 2),
            r.verdict.score,
            r.verdict.magnitude,
            direction
        );
    }
    if shown.len() > limit {
        println!("... {} more (use --limit or --output)", shown.len() - limit);
    }
    println!();
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
