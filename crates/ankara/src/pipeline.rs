//! One analytics run: snapshot, engines, persistence, report.

use crate::config::AnalyticsConfig;
use crate::error::Result;
use ankara_data::{PriceHistoryProvider, ReferenceDataProvider, ResultsStore, Snapshot};
use ankara_output::BatchReport;
use ankara_performance::{PerformanceBatch, PerformanceEngine};
use ankara_risk::{RiskBatch, RiskScoringEngine};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Both engines configured for a run.
///
/// The pipeline holds no connection; callers pass the providers and the
/// results store, so each engine may write through its own handle.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalyticsConfig,
    risk: RiskScoringEngine,
    performance: PerformanceEngine,
}

impl Pipeline {
    /// Create a pipeline, validating both engine configurations.
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        let risk = RiskScoringEngine::new(config.risk.clone())?;
        let performance = PerformanceEngine::new(config.performance.clone())?;
        Ok(Self {
            config,
            risk,
            performance,
        })
    }

    /// Run configuration.
    pub const fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Read the inputs for `date` once.
    pub fn load_snapshot<P, R>(&self, prices: &P, reference: &R, date: NaiveDate) -> Result<Snapshot>
    where
        P: PriceHistoryProvider + ?Sized,
        R: ReferenceDataProvider + ?Sized,
    {
        Ok(Snapshot::load(prices, reference, date, self.config.history_days)?)
    }

    /// Score and persist every portfolio of `snapshot`.
    pub fn run_risk<S>(&self, snapshot: &Snapshot, store: &S) -> Result<RiskBatch>
    where
        S: ResultsStore + ?Sized,
    {
        let batch = self.risk.run(snapshot, store)?;
        log_notes(&batch.notes);
        Ok(batch)
    }

    /// Evaluate and persist every fund of `snapshot`.
    pub fn run_performance<S>(&self, snapshot: &Snapshot, store: &S) -> Result<PerformanceBatch>
    where
        S: ResultsStore + ?Sized,
    {
        let batch = self.performance.run(snapshot, store)?;
        log_notes(&batch.notes);
        Ok(batch)
    }

    /// Run both engines for `date` against one store, one after the other.
    pub fn run<S>(&self, store: &S, date: NaiveDate) -> Result<BatchReport>
    where
        S: PriceHistoryProvider + ReferenceDataProvider + ResultsStore + ?Sized,
    {
        let snapshot = self.load_snapshot(store, store, date)?;
        let risk = self.run_risk(&snapshot, store)?;
        let performance = self.run_performance(&snapshot, store)?;
        Ok(Self::report(date, Some(&risk), Some(&performance)))
    }

    /// Summarize finished batches.
    pub fn report(
        date: NaiveDate,
        risk: Option<&RiskBatch>,
        performance: Option<&PerformanceBatch>,
    ) -> BatchReport {
        let mut builder = BatchReport::builder(date);
        if let Some(batch) = risk {
            builder = builder.risk(&batch.scores).notes(batch.notes.iter().cloned());
        }
        if let Some(batch) = performance {
            builder = builder
                .performance(&batch.metrics, &batch.skipped)
                .notes(batch.notes.iter().cloned());
        }
        let report = builder.build();
        info!(date = %date, notes = report.notes.len(), "run complete");
        report
    }
}

fn log_notes(notes: &[ankara_data::DataQualityNote]) {
    for note in notes {
        warn!("{note}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ankara_data::{Portfolio, PortfolioId, Position};
    use ankara_risk::RiskConfig;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let config = AnalyticsConfig {
            risk: RiskConfig {
                window_observations: 0,
                ..RiskConfig::default()
            },
            ..AnalyticsConfig::default()
        };
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn test_report_only_covers_engines_that_ran() {
        let snapshot = Snapshot::new(date())
            .with_history(
                "AAK",
                (0..5).map(|i| {
                    ankara_data::PriceObservation::new(
                        date() - chrono::Duration::days(4 - i),
                        1.0 + i as f64 * 0.01,
                        1_000.0,
                        10.0,
                    )
                }),
            )
            .with_portfolio(
                Portfolio::new(PortfolioId::from(1), None, vec![Position::new("AAK", 1.0)])
                    .unwrap(),
            );

        let pipeline = Pipeline::new(AnalyticsConfig::default()).unwrap();
        let batch = pipeline.risk.compute(&snapshot).unwrap();
        let report = Pipeline::report(date(), Some(&batch), None);

        assert_eq!(report.risk.as_ref().unwrap().portfolios, 1);
        assert!(report.performance.is_none());
        // four returns are below the overlap minimum
        assert!(!report.notes.is_empty());
    }
}
