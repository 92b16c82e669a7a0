//! Performance evaluation batch.

use crate::config::PerformanceConfig;
use crate::error::Result;
use crate::peer::{PeerIndex, PeerSelection};
use crate::signal::{FundSignal, SharpeLike};
use ankara_data::{
    AnalyticsIssue, DataQualityNote, FundCode, FundPerformanceMetric, PeerTier, ResultsStore,
    Snapshot,
};
use ankara_stats::{
    ReturnSeries, is_degenerate_mad, median, median_absolute_deviation, percentile_ranks_by_key,
    robust_z_score,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Output of one performance batch.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceBatch {
    /// Calculation date
    pub date: NaiveDate,
    /// One row per scored fund, ordered by fund code
    pub metrics: Vec<FundPerformanceMetric>,
    /// Funds skipped for insufficient history
    pub skipped: Vec<FundCode>,
    /// Entity-level anomalies resolved during the batch
    pub notes: Vec<DataQualityNote>,
}

impl PerformanceBatch {
    /// Rows flagged as poor performers.
    pub fn flagged(&self) -> impl Iterator<Item = &FundPerformanceMetric> {
        self.metrics.iter().filter(|m| m.is_poor_performer)
    }
}

/// Percentiles and robust location of one peer group.
#[derive(Debug)]
struct GroupStats {
    percentile: BTreeMap<usize, f64>,
    median: f64,
    mad: f64,
}

impl GroupStats {
    fn new(signals: &[FundSignal], members: &[usize]) -> Self {
        let keyed: Vec<(&FundCode, f64)> = members
            .iter()
            .map(|&i| (&signals[i].fund_code, signals[i].signal.ratio))
            .collect();
        let percentile = members
            .iter()
            .copied()
            .zip(percentile_ranks_by_key(&keyed))
            .collect();

        let values: Vec<f64> = keyed.iter().map(|(_, v)| *v).collect();
        let median = median(&values).unwrap_or(0.0);
        let mad = median_absolute_deviation(&values, median).unwrap_or(0.0);

        Self {
            percentile,
            median,
            mad,
        }
    }
}

/// Evaluates every fund of a snapshot against its peers.
#[derive(Debug, Clone, Default)]
pub struct PerformanceEngine {
    config: PerformanceConfig,
}

impl PerformanceEngine {
    /// Create an engine with a validated configuration.
    pub fn new(config: PerformanceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configuration.
    pub const fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    /// Evaluate every fund in `snapshot`.
    pub fn compute(&self, snapshot: &Snapshot) -> Result<PerformanceBatch> {
        let date = snapshot.calculation_date();
        let codes: Vec<&FundCode> = snapshot.fund_codes().collect();

        let evaluated: Vec<std::result::Result<FundSignal, (FundCode, usize)>> = codes
            .par_iter()
            .map(|&code| self.signal(snapshot, code))
            .collect();

        let mut signals = Vec::with_capacity(evaluated.len());
        let mut skipped = Vec::new();
        let mut notes = Vec::new();
        for outcome in evaluated {
            match outcome {
                Ok(signal) => {
                    if signal.signal.is_degenerate() {
                        notes.push(DataQualityNote::new(
                            &signal.fund_code,
                            AnalyticsIssue::DegenerateStatistic {
                                statistic: "volatility".to_string(),
                                sentinel: signal.signal.ratio,
                            },
                        ));
                    }
                    signals.push(signal);
                }
                Err((code, available)) => {
                    debug!(fund = %code, returns = available, "insufficient history, skipped");
                    notes.push(DataQualityNote::new(
                        &code,
                        AnalyticsIssue::DataUnavailable {
                            available,
                            required: self.config.min_returns,
                            resolution: "fund skipped".to_string(),
                        },
                    ));
                    skipped.push(code);
                }
            }
        }

        let metrics = self.evaluate(&signals, date, &mut notes);
        let batch = PerformanceBatch {
            date,
            metrics,
            skipped,
            notes,
        };

        info!(
            date = %date,
            funds = batch.metrics.len(),
            skipped = batch.skipped.len(),
            flagged = batch.flagged().count(),
            "performance batch computed"
        );
        Ok(batch)
    }

    /// Compute the batch and persist it as one transaction.
    pub fn run<S>(&self, snapshot: &Snapshot, store: &S) -> Result<PerformanceBatch>
    where
        S: ResultsStore + ?Sized,
    {
        let batch = self.compute(snapshot)?;
        store.upsert_performance_metrics(batch.date, &batch.metrics)?;
        Ok(batch)
    }

    fn signal(
        &self,
        snapshot: &Snapshot,
        code: &FundCode,
    ) -> std::result::Result<FundSignal, (FundCode, usize)> {
        let window = snapshot.window(
            code,
            self.config.price_observations(),
            self.config.window_days,
        );
        let returns = ReturnSeries::from_prices(window.iter().map(|o| (o.date, o.price)));
        if returns.len() < self.config.min_returns {
            return Err((code.clone(), returns.len()));
        }

        let signal =
            SharpeLike::from_returns(returns.values(), self.config.zero_volatility_sentinel)
                .ok_or_else(|| (code.clone(), returns.len()))?;
        let metadata = snapshot.metadata(code).cloned().unwrap_or_default();

        Ok(FundSignal {
            fund_code: code.clone(),
            signal,
            observations: returns.len(),
            category: metadata.category,
            main_category: metadata.main_category,
        })
    }

    fn evaluate(
        &self,
        signals: &[FundSignal],
        date: NaiveDate,
        notes: &mut Vec<DataQualityNote>,
    ) -> Vec<FundPerformanceMetric> {
        let index = PeerIndex::new(signals);
        let selections: Vec<PeerSelection<'_>> = signals
            .iter()
            .map(|s| index.select(s, &self.config.peer_policies, self.config.min_peer_group))
            .collect();

        let mut groups: BTreeMap<(PeerTier, &str), GroupStats> = BTreeMap::new();
        for selection in &selections {
            groups
                .entry((selection.tier, selection.label))
                .or_insert_with(|| GroupStats::new(signals, selection.members));
        }

        for ((tier, label), stats) in &groups {
            if is_degenerate_mad(stats.mad) {
                notes.push(DataQualityNote::new(
                    format!("{tier}:{label}"),
                    AnalyticsIssue::DegenerateStatistic {
                        statistic: "peer MAD".to_string(),
                        sentinel: 0.0,
                    },
                ));
            }
        }

        signals
            .iter()
            .enumerate()
            .zip(&selections)
            .filter_map(|((i, signal), selection)| {
                let stats = groups.get(&(selection.tier, selection.label))?;
                let performance_score = stats.percentile.get(&i).copied()?;
                let robust_z = robust_z_score(signal.signal.ratio, stats.median, stats.mad);
                let confidence = self.config.rule.evaluate(performance_score, robust_z);

                Some(FundPerformanceMetric {
                    fund_code: signal.fund_code.clone(),
                    date,
                    performance_score,
                    peer_tier: selection.tier,
                    peer_category: selection.label.to_string(),
                    is_poor_performer: confidence.is_some(),
                    confidence,
                    sharpe_like: signal.signal.ratio,
                    total_return: signal.signal.total_return,
                    volatility: signal.signal.volatility,
                    robust_z,
                })
            })
            .collect()
    }
}
