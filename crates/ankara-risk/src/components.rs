//! Raw risk components of a single portfolio.

use ankara_data::{FundCode, Portfolio, PriceObservation};
use ankara_stats::ReturnSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Herfindahl concentration index `Σ wᵢ²`.
pub fn herfindahl(weights: &[f64]) -> f64 {
    weights.iter().map(|w| w * w).sum()
}

/// Maximum drawdown of a compounded return path.
///
/// The path starts at 1, so a first-day loss already counts as a drawdown.
/// An empty path has no drawdown.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;

    for r in returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        if peak > 0.0 {
            worst = worst.max(1.0 - cumulative / peak);
        }
    }

    worst
}

/// Static-weight portfolio returns on the dates every fund has a return.
pub fn portfolio_return_path(series: &[&ReturnSeries], weights: &[f64]) -> Vec<f64> {
    let mut by_date: BTreeMap<NaiveDate, (usize, f64)> = BTreeMap::new();
    for (s, w) in series.iter().zip(weights) {
        for (date, r) in s.iter() {
            let entry = by_date.entry(date).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += w * r;
        }
    }

    by_date
        .into_values()
        .filter(|(count, _)| *count == series.len())
        .map(|(_, r)| r)
        .collect()
}

/// Unscaled liquidity of a fund, `ln(1 + avg market cap) + ln(1 + avg investors)`.
///
/// Missing or negative averages count as zero.
pub fn liquidity_score(observations: &[PriceObservation]) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }
    let n = observations.len() as f64;
    let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
    let market_cap = observations.iter().map(|o| clean(o.market_cap)).sum::<f64>() / n;
    let investors = observations.iter().map(|o| clean(o.investor_count)).sum::<f64>() / n;
    market_cap.ln_1p() + investors.ln_1p()
}

/// A portfolio reduced to the funds that have price history.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPortfolio {
    /// Funds with history, in position order
    pub funds: Vec<FundCode>,
    /// Weights of `funds` after renormalization
    pub weights: Vec<f64>,
    /// Funds dropped for lack of history
    pub missing: Vec<FundCode>,
    /// Factor applied to the surviving weights (1 when nothing was dropped)
    pub renormalization: f64,
}

impl ResolvedPortfolio {
    /// Drop positions whose fund fails `has_history`.
    ///
    /// Surviving weights are scaled so that their total equals the original
    /// total weight of the portfolio.
    pub fn resolve(portfolio: &Portfolio, has_history: impl Fn(&FundCode) -> bool) -> Self {
        let mut funds = Vec::with_capacity(portfolio.positions.len());
        let mut weights = Vec::with_capacity(portfolio.positions.len());
        let mut missing = Vec::new();

        for position in &portfolio.positions {
            if has_history(&position.fund_code) {
                funds.push(position.fund_code.clone());
                weights.push(position.weight);
            } else {
                missing.push(position.fund_code.clone());
            }
        }

        let kept: f64 = weights.iter().sum();
        let renormalization = if missing.is_empty() || kept <= 0.0 {
            1.0
        } else {
            portfolio.total_weight() / kept
        };
        for w in &mut weights {
            *w *= renormalization;
        }

        Self {
            funds,
            weights,
            missing,
            renormalization,
        }
    }

    /// Whether no fund survived.
    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }
}
