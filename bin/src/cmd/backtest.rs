//! Backtest command implementation.

use crate::cmd::{Context, OutputArgs, ScreenArgs, fmt_pct, print_header, print_json};
use crate::data;
use anyhow::Result;
use ronda_eval::{
    Backtest, BacktestConfig, BacktestReport, BacktestResult, CancellationToken, Group,
    screen_rows_to_frame,
};
use ronda_screen::ScreeningEngine;
use ronda_traits::Horizon;

/// Run a screen over every rebalance date and summarize forward returns.
pub(crate) fn run_backtest(
    ctx: &Context,
    start: &str,
    end: &str,
    frequency: &str,
    horizons: &str,
    args: &ScreenArgs,
    output: &OutputArgs,
) -> Result<()> {
    let start_date = data::parse_date(start)?;
    let end_date = data::parse_date(end)?;
    let json = output.is_json()?;

    let mut config = BacktestConfig::new(start_date, end_date, args.request(start_date))
        .with_frequency(frequency.parse::<Horizon>()?)
        .with_horizons(Horizon::parse_list(horizons)?);
    config.forward = ctx.config.forward;

    let dataset = ctx.dataset()?;
    let engine = ScreeningEngine::new(&dataset, ctx.screening(args));
    let result = Backtest::new(&engine, config).run(&CancellationToken::new())?;
    let report = BacktestReport::from(&result);

    if json {
        print_json(&report)?;
    } else {
        print_header("Backtesting");
        println!("Period:       {start_date} to {end_date} every {frequency}");
        println!("Segmentation: {}", args.segmentation);
        println!("Detector:     {}", args.detector);
        println!(
            "Dates:        {} completed, {} skipped",
            result.completed(),
            result.skipped_count()
        );
        for skipped in &result.skipped {
            println!("  skipped {}: {}", skipped.as_of, skipped.reason);
        }
        println!();
        print_summaries(&result);
    }
    output.write(screen_rows_to_frame(&report.flagged)?)
}

fn print_summaries(result: &BacktestResult) {
    if result.completed() == 0 {
        println!("No rebalance date could be screened.");
        return;
    }
    println!(
        "{:<8} {:<12} {:>7} {:>7} {:>10} {:>10} {:>9} {:>10}",
        "Horizon", "Group", "Count", "Missing", "Mean", "Median", "Hit rate", "Excess"
    );
    println!("{}", "-".repeat(80));
    for label in &result.horizons {
        for group in Group::ALL {
            let Some(s) = result.summary(label, group) else {
                continue;
            };
            println!(
                "{:<8} {:<12} {:>7} {:>7} {:>10} {:>10} {:>9} {:>10}",
                s.horizon,
                s.group.as_str(),
                s.count,
                s.missing,
                fmt_pct(s.mean),
                fmt_pct(s.median),
                s.hit_rate
                    .map_or_else(|| "-".to_string(), |h| format!("{:.1}%", h * 100.0)),
                fmt_pct(s.excess_mean)
            );
        }
        println!();
    }

    println!("Interpretation:");
    println!("  Excess is the group mean minus the universe mean over the same dates.");
    println!("  Missing counts companies without a usable entry or exit price.");
    println!();
}
