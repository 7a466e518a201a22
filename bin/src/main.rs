//! Ronda CLI binary.
//!
//! Provides a command-line interface for point-in-time fundamental screening.

mod cmd;
mod config;
mod data;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmd::{Context, OutputArgs, ScreenArgs};
use ronda_screen::MatchMode;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ronda")]
#[command(about = "Point-in-time fundamental outlier screening", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding fundamentals.csv, prices.csv and tickers.csv
    /// (defaults to $RONDA_DATA_DIR, then ./data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen companies for outliers at one date
    Screen {
        /// As-of date (YYYY-MM-DD)
        date: String,

        #[command(flatten)]
        screen: ScreenArgs,

        /// Show every evaluation, not only flagged ones
        #[arg(long)]
        all: bool,

        /// Maximum rows to print
        #[arg(short, long, default_value = "50")]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Rank companies by how many metrics flag them
    Counts {
        /// As-of date (YYYY-MM-DD)
        date: String,

        #[command(flatten)]
        screen: ScreenArgs,

        /// Drop companies with fewer signals
        #[arg(long, default_value = "1")]
        min_signals: usize,

        /// Drop companies with more signals
        #[arg(long)]
        max_signals: Option<usize>,

        /// Ranking key (net, favorable, unfavorable, total, undervaluation, quality)
        #[arg(long, default_value = "net")]
        sort_by: String,

        /// Rank ascending
        #[arg(long)]
        ascending: bool,

        /// Maximum rows to print
        #[arg(short, long, default_value = "25")]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show each metric's value against its segment
    Explain {
        /// As-of date (YYYY-MM-DD)
        date: String,

        #[command(flatten)]
        screen: ScreenArgs,

        /// Only this company
        #[arg(long)]
        ticker: Option<String>,

        /// Rank companies on this metric
        #[arg(long)]
        metric: Option<String>,

        /// Only favorable or unfavorable outliers
        #[arg(long)]
        direction: Option<String>,

        /// Only flagged rows
        #[arg(long)]
        outliers_only: bool,

        /// Fewest rows returned for --metric, topped up from the ranking
        #[arg(long, default_value = "10")]
        min_rows: usize,

        /// Maximum rows to print
        #[arg(short, long, default_value = "50")]
        limit: usize,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep companies meeting several metric conditions
    Multi {
        /// As-of date (YYYY-MM-DD)
        date: String,

        /// Condition as metric:side[:threshold], side one of lower, higher, both
        #[arg(short, long = "condition", required = true)]
        conditions: Vec<String>,

        /// Keep companies meeting any condition instead of all
        #[arg(long)]
        any: bool,

        #[command(flatten)]
        screen: ScreenArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Backtest a screen over rebalance dates
    Backtest {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Rebalance frequency
        #[arg(long, default_value = "1M")]
        frequency: String,

        /// Forward-return horizons (comma-separated)
        #[arg(short = 'H', long, default_value = "1M,3M,6M,1Y")]
        horizons: String,

        #[command(flatten)]
        screen: ScreenArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List segmentations, detectors and metrics
    List {
        /// Only list one kind (segmentations, detectors, metrics)
        kind: Option<String>,

        /// Show descriptions
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = Context {
        data_dir: data::resolve_data_dir(cli.data_dir),
        config: config::CliConfig::load(cli.config.as_deref())?,
    };

    match cli.command {
        Commands::Screen {
            date,
            screen,
            all,
            limit,
            output,
        } => cmd::screen::run_screen(&ctx, &date, &screen, all, limit, &output),
        Commands::Counts {
            date,
            screen,
            min_signals,
            max_signals,
            sort_by,
            ascending,
            limit,
            output,
        } => {
            let options =
                cmd::counts::count_options(min_signals, max_signals, &sort_by, ascending)?;
            cmd::counts::run_counts(&ctx, &date, &screen, &options, limit, &output)
        }
        Commands::Explain {
            date,
            screen,
            ticker,
            metric,
            direction,
            outliers_only,
            min_rows,
            limit,
            output,
        } => {
            let query = cmd::explain::ExplainQuery {
                ticker,
                metric,
                direction: direction.as_deref().map(str::parse).transpose()?,
                outliers_only,
                min_rows,
            };
            cmd::explain::run_explain(&ctx, &date, &screen, &query, limit, &output)
        }
        Commands::Multi {
            date,
            conditions,
            any,
            screen,
            output,
        } => {
            let conditions = cmd::multi::parse_conditions(&conditions)?;
            let mode = if any { MatchMode::Any } else { MatchMode::All };
            cmd::multi::run_multi(&ctx, &date, &screen, &conditions, mode, &output)
        }
        Commands::Backtest {
            start,
            end,
            frequency,
            horizons,
            screen,
            output,
        } => cmd::backtest::run_backtest(
            &ctx, &start, &end, &frequency, &horizons, &screen, &output,
        ),
        Commands::List { kind, verbose } => cmd::list::run_list(&ctx, kind.as_deref(), verbose),
    }
}
