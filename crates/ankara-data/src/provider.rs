//! Interfaces to the collaborators around the engines.
//!
//! The engines never talk to a database directly. Inputs arrive through the
//! two read-only providers (once, when a [`Snapshot`](crate::Snapshot) is
//! loaded) and outputs leave through [`ResultsStore`].

use crate::error::Result;
use crate::model::{
    DateRange, FundCode, FundMetadata, FundPerformanceMetric, Portfolio, PortfolioId,
    PortfolioRiskScore, PriceObservation,
};
use chrono::NaiveDate;

/// Read-only source of daily fund observations.
pub trait PriceHistoryProvider {
    /// Observations of `fund_code` within `range`, ordered by date.
    ///
    /// May return fewer rows than the range spans, or none at all.
    fn observations(&self, fund_code: &FundCode, range: DateRange)
    -> Result<Vec<PriceObservation>>;

    /// Every fund with at least one observation within `range`.
    fn fund_codes(&self, range: DateRange) -> Result<Vec<FundCode>>;
}

/// Read-only source of fund labels and the current portfolio registry.
pub trait ReferenceDataProvider {
    /// Labels of `fund_code`, `None` for an unlabelled fund.
    fn metadata(&self, fund_code: &FundCode) -> Result<Option<FundMetadata>>;

    /// The current portfolio registry, ordered by id.
    fn active_portfolios(&self) -> Result<Vec<Portfolio>>;
}

/// Durable keyed storage for computed scores.
///
/// Both upserts are keyed by `(entity, date)`, replace earlier values for the
/// same key, and commit the whole slice as one transaction.
pub trait ResultsStore {
    /// Persist a risk batch for `date`, returning the number of rows written.
    fn upsert_risk_scores(&self, date: NaiveDate, rows: &[PortfolioRiskScore]) -> Result<usize>;

    /// Persist a performance batch for `date`, returning the number of rows written.
    fn upsert_performance_metrics(
        &self,
        date: NaiveDate,
        rows: &[FundPerformanceMetric],
    ) -> Result<usize>;

    /// Most recent risk row of a portfolio.
    fn latest_risk(&self, portfolio_id: PortfolioId) -> Result<Option<PortfolioRiskScore>>;

    /// Portfolios whose most recent row is classified HIGH.
    fn high_risk_portfolios(&self) -> Result<Vec<PortfolioRiskScore>>;

    /// Funds whose most recent row is flagged as a poor performer.
    fn poor_performers(&self) -> Result<Vec<FundPerformanceMetric>>;
}
