//! End-to-end tests: dataset, screen, forward returns and backtest.

use approx::assert_relative_eq;
use chrono::Duration;
use ronda_data::{FundamentalTable, PointInTimeDataset, PriceTable, TickerTable};
use ronda_eval::{
    Backtest, BacktestConfig, BacktestReport, CancellationToken, Group, screen_results_to_frame,
};
use ronda_screen::{
    MatchMode, MetricCondition, ScreenRequest, ScreeningConfig, ScreeningEngine, count_signals,
    match_conditions, metric_outliers,
};
use ronda_traits::{
    Date, Dimension, Direction, FundamentalRecord, Horizon, PricePoint, RondaError, TickerInfo,
};
use std::collections::BTreeMap;

fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd_opt(y, m, day).unwrap()
}

const TICKERS: [&str; 6] = ["T1", "T2", "T3", "T4", "T5", "T6"];

/// Six Technology companies filing quarterly, each filing usable 20 days
/// after period end. T6 earns ten times as much per share, so its P/E is a
/// low outlier. Daily prices rise linearly; T6 rises twice as fast.
fn dataset() -> PointInTimeDataset {
    let periods = [
        d(2019, 12, 31),
        d(2020, 3, 31),
        d(2020, 6, 30),
        d(2020, 9, 30),
        d(2020, 12, 31),
        d(2021, 3, 31),
        d(2021, 6, 30),
        d(2021, 9, 30),
    ];

    let mut records = Vec::new();
    for ticker in TICKERS {
        let eps = if ticker == "T6" { 10.0 } else { 1.0 };
        for period in periods {
            let mut items = BTreeMap::new();
            items.insert("epsdil".to_string(), eps);
            items.insert("sharesbas".to_string(), 1e7);
            records.push(
                FundamentalRecord::new(
                    ticker,
                    period,
                    period,
                    period + Duration::days(20),
                    Dimension::Mrq,
                    items,
                )
                .unwrap(),
            );
        }
    }

    let origin = d(2019, 12, 1);
    let mut prices = Vec::new();
    for day in 0..1000 {
        let date = origin + Duration::days(day);
        for ticker in TICKERS {
            let slope = if ticker == "T6" { 0.1 } else { 0.05 };
            prices.push((ticker, PricePoint::from_close(date, 100.0 + slope * day as f64)));
        }
    }

    let infos = TICKERS
        .iter()
        .map(|t| TickerInfo::new(*t, Some("Technology".to_string()), None));

    PointInTimeDataset::new(
        FundamentalTable::from_records(records),
        PriceTable::from_points(prices),
        TickerTable::from_infos(infos),
    )
}

fn request() -> ScreenRequest {
    ScreenRequest::new(d(2020, 1, 15)).with_metrics(["pe_ratio"])
}

#[test]
fn screen_flags_low_pe_company() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let outcome = engine.screen(&request().at(d(2020, 6, 15))).unwrap();

    assert_eq!(outcome.results.len(), 6);
    let flagged: Vec<_> = outcome.flagged().collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].ticker(), "T6");
    assert!(flagged[0].verdict.is_favorable());
    assert_relative_eq!(flagged[0].verdict.magnitude, 5f64.sqrt(), epsilon = 1e-9);

    // Every record behind the screen was knowable at the cutoff.
    assert!(outcome
        .evaluated
        .iter()
        .all(|p| p.available_on() <= outcome.cutoff));

    let counts = count_signals(&outcome.results);
    assert_eq!(counts[0].ticker, "T6");
    assert_eq!(counts[0].favorable, 1);

    let df = screen_results_to_frame(&outcome.results).unwrap();
    assert_eq!(df.height(), 6);
}

#[test]
fn screen_is_idempotent() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let req = ScreenRequest::new(d(2021, 2, 1)).with_segmentation("universe");
    let first = engine.screen(&req).unwrap();
    let second = engine.screen(&req).unwrap();
    assert_eq!(first.results, second.results);
    assert_eq!(first.exclusions, second.exclusions);
}

#[test]
fn cheap_company_with_strong_trailing_return() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let req = ScreenRequest::new(d(2021, 2, 1)).with_metrics(["pe_ratio", "return_1y"]);
    let outcome = engine.screen(&req).unwrap();

    // T6's price doubles the others' slope, so its one-year return stands out.
    let leaders = metric_outliers(&outcome.results, "return_1y", Some(Direction::Favorable), 1);
    assert_eq!(leaders[0].ticker, "T6");
    assert_eq!(leaders[0].segment_size, Some(6));

    let conditions: Vec<MetricCondition> = ["pe_ratio:lower", "return_1y:higher"]
        .iter()
        .map(|c| c.parse().unwrap())
        .collect();
    let both = match_conditions(&outcome.results, &conditions, MatchMode::All).unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].ticker, "T6");

    let counts = count_signals(&outcome.results);
    let t6 = counts.iter().find(|c| c.ticker == "T6").unwrap();
    assert_eq!(t6.undervaluation.count, 1);
    assert_eq!(t6.undervaluation.available, 1);
    assert_eq!(t6.quality.available, 0);
    assert_eq!(t6.favorable, 2);
}

#[test]
fn restatement_is_picked_once_knowable() {
    let mut records = Vec::new();
    let mut prices = Vec::new();
    let mut infos = Vec::new();
    for (i, ticker) in TICKERS.iter().enumerate() {
        let mut items = BTreeMap::new();
        items.insert("epsdil".to_string(), 1.0 + i as f64 * 0.1);
        records.push(
            FundamentalRecord::new(
                *ticker,
                d(2020, 3, 31),
                d(2020, 3, 31),
                d(2020, 4, 20),
                Dimension::Mrq,
                items,
            )
            .unwrap(),
        );
        prices.push((*ticker, PricePoint::from_close(d(2020, 9, 1), 10.0)));
        infos.push(TickerInfo::new(*ticker, Some("Energy".to_string()), None));
    }
    // T1 restates its first quarter on 2020-07-01.
    let mut restated = BTreeMap::new();
    restated.insert("epsdil".to_string(), 0.5);
    records.push(
        FundamentalRecord::new(
            "T1",
            d(2020, 3, 31),
            d(2020, 3, 31),
            d(2020, 7, 1),
            Dimension::Mrq,
            restated,
        )
        .unwrap(),
    );
    let ds = PointInTimeDataset::new(
        FundamentalTable::from_records(records),
        PriceTable::from_points(prices),
        TickerTable::from_infos(infos),
    );
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());

    let pe_of_t1 = |as_of: Date| {
        let outcome = engine.screen(&request().at(as_of)).unwrap();
        outcome
            .results
            .iter()
            .find(|r| r.ticker() == "T1")
            .map(|r| r.value)
            .unwrap()
    };
    // Cutoff 2020-07-18: the restatement is knowable.
    assert_relative_eq!(pe_of_t1(d(2020, 9, 1)), 20.0);

    // With a longer delay the cutoff falls before the restatement.
    let late = ScreeningEngine::new(
        &ds,
        ScreeningConfig {
            reporting_delay_days: 90,
            ..Default::default()
        },
    );
    let outcome = late.screen(&request().at(d(2020, 9, 1))).unwrap();
    let t1 = outcome.results.iter().find(|r| r.ticker() == "T1").unwrap();
    assert_relative_eq!(t1.value, 10.0);
}

#[test]
fn backtest_skips_unavailable_dates() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let config = BacktestConfig::new(d(2020, 1, 15), d(2021, 12, 15), request())
        .with_horizons(vec![Horizon::ONE_MONTH, Horizon::THREE_MONTHS]);
    assert_eq!(config.rebalance_dates().unwrap().len(), 24);

    let result = Backtest::new(&engine, config)
        .run(&CancellationToken::new())
        .unwrap();

    assert_eq!(result.completed(), 22);
    assert_eq!(result.skipped_count(), 2);
    assert_eq!(result.skipped[0].as_of, d(2020, 1, 15));
    assert_eq!(result.skipped[1].as_of, d(2020, 2, 15));
    assert!(!result.was_cancelled());

    // Periods come back in date order.
    assert!(result.periods.windows(2).all(|w| w[0].as_of < w[1].as_of));

    let favorable = result.summary("1M", Group::Favorable).unwrap();
    assert_eq!(favorable.count, 22);
    assert_eq!(favorable.missing, 0);
    assert_relative_eq!(favorable.hit_rate.unwrap(), 1.0);
    assert!(favorable.excess_mean.unwrap() > 0.0);

    let universe = result.summary("3M", Group::Universe).unwrap();
    assert_eq!(universe.count, 22 * 6);

    let unfavorable = result.summary("1M", Group::Unfavorable).unwrap();
    assert_eq!(unfavorable.count, 0);
    assert!(unfavorable.mean.is_none());

    // Flagged rows carry their forward returns.
    let first = &result.periods[0];
    let flagged = first.outcome.flagged().next().unwrap();
    assert_eq!(flagged.ticker(), "T6");
    assert!(flagged.forward_returns["1M"].unwrap() > 0.0);
    assert!(flagged.forward_returns.contains_key("3M"));

    let report = BacktestReport::from(&result);
    assert_eq!(report.completed, 22);
    assert_eq!(report.flagged.len(), 22);
}

#[test]
fn backtest_forward_return_matches_prices() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let config = BacktestConfig::new(d(2020, 3, 15), d(2020, 3, 15), request())
        .with_horizons(vec![Horizon::ONE_MONTH]);
    let result = Backtest::new(&engine, config)
        .run(&CancellationToken::new())
        .unwrap();

    // 2020-03-15 is day 105 after 2019-12-01, 2020-04-15 is day 136.
    let t1 = result.periods[0]
        .universe
        .iter()
        .find(|c| c.ticker == "T1")
        .unwrap();
    let expected = (100.0 + 0.05 * 136.0) / (100.0 + 0.05 * 105.0) - 1.0;
    assert_relative_eq!(t1.returns[0].unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn backtest_reports_missing_prices_at_the_end() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    // Prices end 2022-08-26; a one-year horizon from late 2021 runs past them.
    let config = BacktestConfig::new(d(2021, 10, 15), d(2021, 10, 15), request())
        .with_horizons(vec![Horizon::ONE_YEAR]);
    let result = Backtest::new(&engine, config)
        .run(&CancellationToken::new())
        .unwrap();
    let universe = result.summary("1Y", Group::Universe).unwrap();
    assert_eq!(universe.count, 0);
    assert_eq!(universe.missing, 6);
}

#[test]
fn cancelled_backtest_starts_nothing() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let config = BacktestConfig::new(d(2020, 1, 15), d(2021, 12, 15), request());
    let token = CancellationToken::new();
    token.cancel();

    let result = Backtest::new(&engine, config).run(&token).unwrap();
    assert!(result.was_cancelled());
    assert_eq!(result.completed(), 0);
    assert_eq!(result.cancelled.len(), 24);
    assert!(result.summaries.iter().all(|s| s.count == 0));
}

#[test]
fn backtest_propagates_non_data_errors() {
    let ds = dataset();
    let engine = ScreeningEngine::new(&ds, ScreeningConfig::default());
    let config = BacktestConfig::new(
        d(2020, 1, 15),
        d(2020, 12, 15),
        request().with_detector("does_not_exist"),
    );
    let err = Backtest::new(&engine, config)
        .run(&CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, RondaError::UnknownDetector(_)));
}
