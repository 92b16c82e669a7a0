//! Risk scoring batch.

use crate::classification::classify;
use crate::components::{
    ResolvedPortfolio, herfindahl, liquidity_score, max_drawdown, portfolio_return_path,
};
use crate::config::RiskConfig;
use crate::covariance::{PairwiseCovarianceEstimator, portfolio_volatility};
use crate::error::Result;
use crate::table::{RawComponentRow, RawComponentTable};
use ankara_data::{
    AnalyticsIssue, DataQualityNote, FundCode, Portfolio, PortfolioRiskScore, ResultsStore,
    RiskClassification, RiskComponents, Snapshot,
};
use ankara_stats::{ReturnSeries, min_max_normalize};
use chrono::NaiveDate;
use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Output of one risk batch.
#[derive(Debug, Clone, Serialize)]
pub struct RiskBatch {
    /// Calculation date
    pub date: NaiveDate,
    /// One row per scored portfolio, ordered by id
    pub scores: Vec<PortfolioRiskScore>,
    /// Entity-level anomalies resolved during the batch
    pub notes: Vec<DataQualityNote>,
}

impl RiskBatch {
    /// Number of rows with the given label.
    pub fn count(&self, classification: RiskClassification) -> usize {
        self.scores
            .iter()
            .filter(|s| s.classification == classification)
            .count()
    }
}

/// Per-fund inputs shared by every portfolio of the batch.
#[derive(Debug)]
struct FundInputs {
    returns: BTreeMap<FundCode, ReturnSeries>,
    liquidity: BTreeMap<FundCode, f64>,
    fallback_variance: f64,
}

/// Raw components of one portfolio plus the notes raised computing them.
#[derive(Debug)]
struct Assessment {
    row: Option<RawComponentRow>,
    notes: Vec<DataQualityNote>,
}

/// Computes composite risk scores for every portfolio of a snapshot.
#[derive(Debug, Clone)]
pub struct RiskScoringEngine {
    config: RiskConfig,
    estimator: PairwiseCovarianceEstimator,
}

impl Default for RiskScoringEngine {
    fn default() -> Self {
        Self {
            estimator: PairwiseCovarianceEstimator::new(RiskConfig::default().min_overlap),
            config: RiskConfig::default(),
        }
    }
}

impl RiskScoringEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: RiskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            estimator: PairwiseCovarianceEstimator::new(config.min_overlap),
            config,
        })
    }

    /// Engine configuration.
    pub const fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score every portfolio in `snapshot`.
    ///
    /// Portfolios are assessed in parallel; ranking starts only once the raw
    /// components of all of them are collected.
    pub fn compute(&self, snapshot: &Snapshot) -> Result<RiskBatch> {
        let date = snapshot.calculation_date();
        let mut notes = Vec::new();

        let inputs = self.fund_inputs(snapshot, &mut notes);

        let assessments: Vec<Assessment> = snapshot
            .portfolios()
            .par_iter()
            .map(|portfolio| self.assess(portfolio, &inputs))
            .collect::<Result<_>>()?;

        let mut rows = Vec::with_capacity(assessments.len());
        for assessment in assessments {
            notes.extend(assessment.notes);
            rows.extend(assessment.row);
        }

        let table = RawComponentTable::new(rows);
        let scores = self.score(&table, date);

        let batch = RiskBatch {
            date,
            scores,
            notes,
        };
        info!(
            date = %date,
            portfolios = batch.scores.len(),
            low = batch.count(RiskClassification::Low),
            medium = batch.count(RiskClassification::Medium),
            high = batch.count(RiskClassification::High),
            notes = batch.notes.len(),
            "risk batch computed"
        );
        Ok(batch)
    }

    /// Compute the batch and persist it as one transaction.
    pub fn run<S>(&self, snapshot: &Snapshot, store: &S) -> Result<RiskBatch>
    where
        S: ResultsStore + ?Sized,
    {
        let batch = self.compute(snapshot)?;
        store.upsert_risk_scores(batch.date, &batch.scores)?;
        Ok(batch)
    }

    fn fund_inputs(&self, snapshot: &Snapshot, notes: &mut Vec<DataQualityNote>) -> FundInputs {
        let held: BTreeSet<&FundCode> = snapshot
            .portfolios()
            .iter()
            .flat_map(|p| p.positions.iter().map(|pos| &pos.fund_code))
            .filter(|code| snapshot.history(code).is_some())
            .collect();

        let mut universe = Vec::with_capacity(held.len());
        let mut returns: BTreeMap<FundCode, ReturnSeries> = BTreeMap::new();
        for code in held {
            let window = snapshot.window(
                code,
                self.config.price_observations(),
                self.config.window_days,
            );
            if window.is_empty() {
                debug!(fund = %code, "no prices inside the return window");
                notes.push(DataQualityNote::new(
                    code,
                    AnalyticsIssue::DataUnavailable {
                        available: 0,
                        required: self.config.min_overlap,
                        resolution: "fund treated as missing".to_string(),
                    },
                ));
                continue;
            }
            let series = ReturnSeries::from_prices(window.iter().map(|o| (o.date, o.price)));
            returns.insert(code.clone(), series);
            universe.push(code);
        }

        let raw_liquidity: Vec<f64> = universe
            .iter()
            .map(|&code| {
                liquidity_score(snapshot.window(
                    code,
                    self.config.liquidity_observations,
                    self.config.liquidity_days,
                ))
            })
            .collect();
        let liquidity = universe
            .iter()
            .map(|&code| code.clone())
            .zip(min_max_normalize(&raw_liquidity))
            .collect();

        let fallback_variance = self.estimator.fallback_variance(returns.values());
        for (code, series) in &returns {
            if series.len() < self.config.min_overlap {
                let resolution = match fallback_variance {
                    Some(v) => format!("variance replaced by cross-sectional median {v:.3e}"),
                    None => "no fund has enough history, variance set to 0".to_string(),
                };
                debug!(fund = %code, returns = series.len(), "short return history");
                notes.push(DataQualityNote::new(
                    code,
                    AnalyticsIssue::DataUnavailable {
                        available: series.len(),
                        required: self.config.min_overlap,
                        resolution,
                    },
                ));
            }
        }

        FundInputs {
            returns,
            liquidity,
            fallback_variance: fallback_variance.unwrap_or(0.0),
        }
    }

    fn assess(&self, portfolio: &Portfolio, inputs: &FundInputs) -> Result<Assessment> {
        let mut notes = Vec::new();
        let resolved =
            ResolvedPortfolio::resolve(portfolio, |code| inputs.returns.contains_key(code));

        if !resolved.missing.is_empty() {
            let missing_funds: Vec<String> =
                resolved.missing.iter().map(ToString::to_string).collect();
            warn!(
                portfolio = %portfolio.id,
                missing = ?missing_funds,
                renormalization = resolved.renormalization,
                "portfolio references funds without price history"
            );
            notes.push(DataQualityNote::new(
                portfolio.id,
                AnalyticsIssue::InconsistentPortfolio {
                    missing_funds,
                    renormalization: resolved.renormalization,
                },
            ));
        }

        if resolved.is_empty() {
            warn!(portfolio = %portfolio.id, "no position with price history, skipping");
            notes.push(DataQualityNote::new(
                portfolio.id,
                AnalyticsIssue::DataUnavailable {
                    available: 0,
                    required: 1,
                    resolution: "portfolio skipped".to_string(),
                },
            ));
            return Ok(Assessment { row: None, notes });
        }

        let series: Vec<&ReturnSeries> = resolved
            .funds
            .iter()
            .filter_map(|code| inputs.returns.get(code))
            .collect();

        let cov = self.estimator.estimate(&series, inputs.fallback_variance);
        let weights = Array1::from(resolved.weights.clone());
        let volatility = portfolio_volatility(&weights, &cov)?;
        if volatility == 0.0 {
            notes.push(DataQualityNote::new(
                portfolio.id,
                AnalyticsIssue::DegenerateStatistic {
                    statistic: "portfolio variance".to_string(),
                    sentinel: 0.0,
                },
            ));
        }

        let path = portfolio_return_path(&series, &resolved.weights);
        let liquidity_penalty = resolved
            .funds
            .iter()
            .zip(&resolved.weights)
            .map(|(code, w)| w * (1.0 - inputs.liquidity.get(code).copied().unwrap_or(0.5)))
            .sum();

        let components = RiskComponents {
            volatility,
            concentration: herfindahl(&resolved.weights),
            max_drawdown: max_drawdown(&path),
            liquidity_penalty,
        };
        debug!(portfolio = %portfolio.id, ?components, "raw components");

        Ok(Assessment {
            row: Some(RawComponentRow {
                portfolio_id: portfolio.id,
                components,
            }),
            notes,
        })
    }

    fn score(&self, table: &RawComponentTable, date: NaiveDate) -> Vec<PortfolioRiskScore> {
        table
            .rows()
            .iter()
            .zip(table.percentiles())
            .map(|(row, percentiles)| {
                let risk_score = self.config.weights.combine(&percentiles).clamp(0.0, 1.0);
                PortfolioRiskScore {
                    portfolio_id: row.portfolio_id,
                    date,
                    risk_score,
                    classification: classify(risk_score, &self.config.thresholds),
                    components: row.components,
                    percentiles,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ankara_data::{PortfolioId, Position, PriceObservation};
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Deterministic zig-zag price path with the given daily amplitude.
    fn history(days: usize, amplitude: f64, market_cap: f64) -> Vec<PriceObservation> {
        let mut price = 10.0;
        (0..days)
            .map(|i| {
                if i > 0 {
                    price *= if i % 2 == 0 { 1.0 + amplitude } else { 1.0 - amplitude };
                }
                PriceObservation::new(start() + Duration::days(i as i64), price, market_cap, 100.0)
            })
            .collect()
    }

    fn portfolio(id: i64, positions: Vec<Position>) -> Portfolio {
        Portfolio::new(PortfolioId::from(id), None, positions).unwrap()
    }

    fn snapshot() -> Snapshot {
        let date = start() + Duration::days(99);
        Snapshot::new(date)
            .with_history("CALM", history(100, 0.001, 1e9))
            .with_history("WILD", history(100, 0.03, 1e5))
            .with_portfolio(portfolio(1, vec![Position::new("CALM", 1.0)]))
            .with_portfolio(portfolio(2, vec![Position::new("WILD", 1.0)]))
            .with_portfolio(portfolio(
                3,
                vec![Position::new("CALM", 0.5), Position::new("WILD", 0.5)],
            ))
    }

    #[test]
    fn test_one_row_per_portfolio() {
        let batch = RiskScoringEngine::default().compute(&snapshot()).unwrap();
        assert_eq!(batch.scores.len(), 3);
        for score in &batch.scores {
            assert!((0.0..=1.0).contains(&score.risk_score));
            assert!(score.components.volatility.is_finite());
        }
    }

    #[test]
    fn test_volatile_fund_ranks_highest() {
        let batch = RiskScoringEngine::default().compute(&snapshot()).unwrap();
        let calm = &batch.scores[0];
        let wild = &batch.scores[1];
        assert!(wild.components.volatility > calm.components.volatility);
        assert_relative_eq!(wild.percentiles.volatility, 1.0);
        assert!(wild.risk_score > calm.risk_score);
        // less liquid fund carries the larger penalty
        assert!(wild.components.liquidity_penalty > calm.components.liquidity_penalty);
    }

    #[test]
    fn test_missing_fund_is_renormalized() {
        let snap = snapshot().with_portfolio(portfolio(
            4,
            vec![Position::new("CALM", 0.5), Position::new("GHOST", 0.5)],
        ));
        let batch = RiskScoringEngine::default().compute(&snap).unwrap();

        let row = batch
            .scores
            .iter()
            .find(|s| s.portfolio_id == PortfolioId::from(4))
            .unwrap();
        // all weight moves to CALM, so it behaves like portfolio 1
        assert_relative_eq!(row.components.concentration, 1.0);
        assert_relative_eq!(row.components.volatility, batch.scores[0].components.volatility);
        assert!(batch.notes.iter().any(|n| matches!(
            &n.issue,
            AnalyticsIssue::InconsistentPortfolio { missing_funds, .. } if missing_funds == &["GHOST"]
        )));
    }

    /// `history` moved `days_back` days earlier.
    fn shifted(days: usize, amplitude: f64, market_cap: f64, days_back: i64) -> Vec<PriceObservation> {
        history(days, amplitude, market_cap)
            .into_iter()
            .map(|o| {
                PriceObservation::new(
                    o.date - Duration::days(days_back),
                    o.price,
                    o.market_cap,
                    o.investor_count,
                )
            })
            .collect()
    }

    #[test]
    fn test_stale_fund_is_treated_as_missing() {
        let snap = snapshot()
            .with_history("STALE", shifted(100, 0.05, 1e9, 300))
            .with_portfolio(portfolio(
                4,
                vec![Position::new("CALM", 0.5), Position::new("STALE", 0.5)],
            ));
        let batch = RiskScoringEngine::default().compute(&snap).unwrap();

        let row = batch
            .scores
            .iter()
            .find(|s| s.portfolio_id == PortfolioId::from(4))
            .unwrap();
        assert_relative_eq!(row.components.concentration, 1.0);
        assert_relative_eq!(row.components.volatility, batch.scores[0].components.volatility);
        assert!(batch.notes.iter().any(|n| n.entity == "STALE"
            && matches!(n.issue, AnalyticsIssue::DataUnavailable { available: 0, .. })));
        assert!(batch.notes.iter().any(|n| matches!(
            &n.issue,
            AnalyticsIssue::InconsistentPortfolio { missing_funds, .. } if missing_funds == &["STALE"]
        )));
    }

    #[test]
    fn test_liquidity_ignores_old_observations() {
        // same size as CALM but nothing inside the liquidity window
        let snap = snapshot()
            .with_history("LATE", shifted(100, 0.001, 1e9, 60))
            .with_portfolio(portfolio(5, vec![Position::new("LATE", 1.0)]));
        let batch = RiskScoringEngine::default().compute(&snap).unwrap();

        let late = batch
            .scores
            .iter()
            .find(|s| s.portfolio_id == PortfolioId::from(5))
            .unwrap();
        assert_relative_eq!(late.components.liquidity_penalty, 1.0);
        assert_relative_eq!(batch.scores[0].components.liquidity_penalty, 0.0);
    }

    #[test]
    fn test_portfolio_without_history_is_skipped() {
        let snap = snapshot().with_portfolio(portfolio(9, vec![Position::new("GHOST", 1.0)]));
        let batch = RiskScoringEngine::default().compute(&snap).unwrap();
        assert_eq!(batch.scores.len(), 3);
        assert!(batch.notes.iter().any(|n| n.entity == "9"));
    }

    #[test]
    fn test_flat_single_fund_does_not_abort() {
        let flat: Vec<_> = (0..60)
            .map(|i| PriceObservation::new(start() + Duration::days(i), 5.0, 1.0, 1.0))
            .collect();
        let snap = Snapshot::new(start() + Duration::days(59))
            .with_history("FLAT", flat)
            .with_portfolio(portfolio(1, vec![Position::new("FLAT", 1.0)]));
        let batch = RiskScoringEngine::default().compute(&snap).unwrap();
        assert_eq!(batch.scores[0].components.volatility, 0.0);
        assert_eq!(batch.scores[0].components.max_drawdown, 0.0);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let engine = RiskScoringEngine::default();
        let snap = snapshot();
        let first = engine.compute(&snap).unwrap();
        let second = engine.compute(&snap).unwrap();
        assert_eq!(first.scores, second.scores);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = RiskConfig {
            min_overlap: 0,
            ..RiskConfig::default()
        };
        assert!(RiskScoringEngine::new(config).is_err());
    }
}
