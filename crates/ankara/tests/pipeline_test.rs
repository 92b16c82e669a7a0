//! Full runs against an in-memory store populated through the importers.

use ankara::data::import::{read_labels, read_portfolios, read_prices};
use ankara::data::{PortfolioId, ResultsStore, SqliteStore};
use ankara::{AnalyticsConfig, Pipeline};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;

const DAYS: i64 = 220;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn last_day() -> NaiveDate {
    start() + Duration::days(DAYS - 1)
}

/// Eight funds with different volatilities, two of them labelled "Bond".
fn price_csv() -> String {
    let mut rng = StdRng::seed_from_u64(11);
    let funds = [
        ("AAA", 0.004),
        ("BBB", 0.006),
        ("CCC", 0.008),
        ("DDD", 0.010),
        ("EEE", 0.012),
        ("FFF", 0.020),
        ("GGG", 0.002),
        ("HHH", 0.003),
    ];
    let mut csv = String::from("date,code,price,market_cap,number_of_shares,number_of_investors\n");
    for (code, sigma) in funds {
        let mut price = 1.0;
        for day in 0..DAYS {
            if day > 0 {
                price *= 1.0 + sigma * rng.gen_range(-1.7..1.75);
            }
            let date = start() + Duration::days(day);
            writeln!(csv, "{date},{code},{price},{},1000,{}", 1e6 / sigma, 100.0 / sigma).unwrap();
        }
    }
    csv
}

const LABELS: &str = "code,category,main_category\n\
    AAA,Equity Large,Equity\n\
    BBB,Equity Large,Equity\n\
    CCC,Equity Small,Equity\n\
    DDD,Equity Small,Equity\n\
    EEE,Equity Small,Equity\n\
    FFF,Equity Small,Equity\n\
    GGG,Government,Bond\n\
    HHH,Government,Bond\n";

const PORTFOLIOS: &str = r#"[
    {"id": 1, "name": "Defensive", "positions": [{"fund_code": "GGG", "weight": 0.5}, {"fund_code": "HHH", "weight": 0.5}]},
    {"id": 2, "name": "Balanced", "positions": [{"fund_code": "AAA", "weight": 0.25}, {"fund_code": "CCC", "weight": 0.25},
                                                 {"fund_code": "GGG", "weight": 0.25}, {"fund_code": "HHH", "weight": 0.25}]},
    {"id": 3, "name": "Aggressive", "positions": [{"fund_code": "FFF", "weight": 1.0}]},
    {"id": 4, "name": "Stale", "positions": [{"fund_code": "EEE", "weight": 0.6}, {"fund_code": "ZZZ", "weight": 0.4}]}
]"#;

fn populated_store() -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    store
        .put_observation_rows(&read_prices(price_csv().as_bytes()).unwrap())
        .unwrap();
    store.put_metadata(&read_labels(LABELS.as_bytes()).unwrap()).unwrap();
    for portfolio in read_portfolios(PORTFOLIOS.as_bytes()).unwrap() {
        store.replace_portfolio(&portfolio).unwrap();
    }
    store
}

#[test]
fn test_run_scores_everything() {
    let store = populated_store();
    let pipeline = Pipeline::new(AnalyticsConfig::default()).unwrap();
    let report = pipeline.run(&store, last_day()).unwrap();

    let risk = report.risk.as_ref().unwrap();
    assert_eq!(risk.portfolios, 4);
    assert_eq!(risk.low + risk.medium + risk.high, 4);

    let performance = report.performance.as_ref().unwrap();
    assert_eq!(performance.funds, 8);
    assert_eq!(performance.skipped, 0);

    // the unknown fund is reported, not fatal
    assert!(report.notes.iter().any(|n| n.entity == "4"));
}

#[test]
fn test_aggressive_portfolio_is_high_risk() {
    let store = populated_store();
    Pipeline::new(AnalyticsConfig::default())
        .unwrap()
        .run(&store, last_day())
        .unwrap();

    let aggressive = store.latest_risk(PortfolioId::from(3)).unwrap().unwrap();
    let defensive = store.latest_risk(PortfolioId::from(1)).unwrap().unwrap();
    assert!(aggressive.risk_score > defensive.risk_score);
    assert!(aggressive.components.volatility > defensive.components.volatility);
}

#[test]
fn test_rerun_is_idempotent() {
    let store = populated_store();
    let pipeline = Pipeline::new(AnalyticsConfig::default()).unwrap();

    pipeline.run(&store, last_day()).unwrap();
    let risk_once = store.risk_scores_on(last_day()).unwrap();
    let perf_once = store.performance_metrics_on(last_day()).unwrap();

    pipeline.run(&store, last_day()).unwrap();
    assert_eq!(store.risk_scores_on(last_day()).unwrap(), risk_once);
    assert_eq!(store.performance_metrics_on(last_day()).unwrap(), perf_once);
}

#[test]
fn test_small_groups_fall_back() {
    let store = populated_store();
    Pipeline::new(AnalyticsConfig::default())
        .unwrap()
        .run(&store, last_day())
        .unwrap();

    let metrics = store.performance_metrics_on(last_day()).unwrap();
    for metric in metrics {
        // no category or main category reaches five scored funds except Equity
        match metric.fund_code.as_str() {
            "GGG" | "HHH" => assert_eq!(metric.peer_category, "ALL"),
            _ => assert_eq!(metric.peer_category, "Equity"),
        }
    }
}

#[test]
fn test_earlier_date_uses_only_past_prices() {
    let store = populated_store();
    let pipeline = Pipeline::new(AnalyticsConfig::default()).unwrap();
    let earlier = start() + Duration::days(20);

    let report = pipeline.run(&store, earlier).unwrap();
    // 20 returns are too few for the performance window
    assert_eq!(report.performance.as_ref().unwrap().funds, 0);
    assert_eq!(report.performance.as_ref().unwrap().skipped, 8);
    assert!(store.latest_risk(PortfolioId::from(1)).unwrap().is_some());
}
