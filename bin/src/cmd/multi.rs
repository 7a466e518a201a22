//! Multi-metric screen command implementation.

use crate::cmd::{Context, OutputArgs, ScreenArgs, print_header, print_json};
use crate::data;
use anyhow::{Result, bail};
use ronda_eval::{screen_results_to_frame, screen_rows};
use ronda_screen::{
    ConditionMatch, MatchMode, MetricCondition, ScreenResult, ScreeningEngine, match_conditions,
};

/// Parse `metric:side[:threshold]` conditions.
pub(crate) fn parse_conditions(raw: &[String]) -> Result<Vec<MetricCondition>> {
    if raw.is_empty() {
        bail!("At least one --condition is required.");
    }
    let conditions = raw
        .iter()
        .map(|c| c.parse())
        .collect::<ronda_traits::Result<Vec<MetricCondition>>>()?;
    Ok(conditions)
}

/// Screen the condition metrics and keep companies meeting them.
pub(crate) fn run_multi(
    ctx: &Context,
    date: &str,
    args: &ScreenArgs,
    conditions: &[MetricCondition],
    mode: MatchMode,
    output: &OutputArgs,
) -> Result<()> {
    let as_of = data::parse_date(date)?;
    let json = output.is_json()?;
    let dataset = ctx.dataset()?;
    let engine = ScreeningEngine::new(&dataset, ctx.screening(args));
    let request = args
        .request(as_of)
        .with_metrics(conditions.iter().map(|c| c.metric.clone()));
    let outcome = engine.screen(&request)?;
    let matches = match_conditions(&outcome.results, conditions, mode)?;
    let results: Vec<ScreenResult> = matches.iter().flat_map(|m| m.results.clone()).collect();

    if json {
        print_json(&screen_rows(&results))?;
    } else {
        print_header("Multi-Metric Screen");
        println!("As of:      {} (filings available by {})", outcome.as_of, outcome.cutoff);
        println!("Mode:       {}", if mode == MatchMode::All { "all (AND)" } else { "any (OR)" });
        for c in conditions {
            let threshold = c.threshold.map_or_else(|| "flag".to_string(), |k| format!("> {k}"));
            println!("Condition:  {} {} ({threshold})", c.metric, c.side);
        }
        println!("Matches:    {}", matches.len());
        println!();
        print_matches(&matches);
    }
    output.write(screen_results_to_frame(&results)?)
}

fn print_matches(matches: &[ConditionMatch]) {
    if matches.is_empty() {
        println!("No companies meet the conditions.");
        return;
    }
    println!("{:<8} {:<12} {:<24}  Satisfied", "Ticker", "As of", "Sector");
    println!("{}", "-".repeat(80));
    for m in matches {
        println!(
            "{:<8} {:<12} {:<24}  {}",
            m.ticker,
            m.as_of,
            m.sector.as_deref().unwrap_or("-"),
            m.satisfied.join(", ")
        );
    }
    println!();
}
