//! Intermediate table of raw components.
//!
//! Percentiles are cross-sectional, so no portfolio can be ranked until every
//! portfolio's raw components are known. The table is the explicit barrier
//! between the parallel per-portfolio phase and the ranking phase.

use ankara_data::{PortfolioId, RiskComponents};
use ankara_stats::percentile_ranks_by_key;

/// Raw components of one portfolio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawComponentRow {
    /// Portfolio the row belongs to
    pub portfolio_id: PortfolioId,
    /// Raw component values
    pub components: RiskComponents,
}

/// Fully collected raw components of a batch, ordered by portfolio id.
#[derive(Debug, Clone, Default)]
pub struct RawComponentTable {
    rows: Vec<RawComponentRow>,
}

impl RawComponentTable {
    /// Build the table from collected rows.
    pub fn new(mut rows: Vec<RawComponentRow>) -> Self {
        rows.sort_by_key(|row| row.portfolio_id);
        Self { rows }
    }

    /// Collected rows.
    pub fn rows(&self) -> &[RawComponentRow] {
        &self.rows
    }

    /// Number of portfolios in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Percentile of every component across the table, in row order.
    ///
    /// Ties share their average rank; equal values are visited in portfolio
    /// id order.
    pub fn percentiles(&self) -> Vec<RiskComponents> {
        let rank = |pick: fn(&RiskComponents) -> f64| {
            let keyed: Vec<(PortfolioId, f64)> = self
                .rows
                .iter()
                .map(|row| (row.portfolio_id, pick(&row.components)))
                .collect();
            percentile_ranks_by_key(&keyed)
        };

        let volatility = rank(|c| c.volatility);
        let concentration = rank(|c| c.concentration);
        let max_drawdown = rank(|c| c.max_drawdown);
        let liquidity_penalty = rank(|c| c.liquidity_penalty);

        (0..self.rows.len())
            .map(|i| RiskComponents {
                volatility: volatility[i],
                concentration: concentration[i],
                max_drawdown: max_drawdown[i],
                liquidity_penalty: liquidity_penalty[i],
            })
            .collect()
    }
}
