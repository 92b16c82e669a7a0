//! Immutable input snapshot for one calculation date.
//!
//! Every entity in a batch is scored against the same `Snapshot`. It is read
//! from the providers exactly once and never refreshed mid-run, so rankings
//! computed from it are consistent across the whole batch.

use crate::error::Result;
use crate::model::{DateRange, FundCode, FundMetadata, Portfolio, PriceObservation};
use crate::provider::{PriceHistoryProvider, ReferenceDataProvider};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Price histories, fund labels and the portfolio registry as of one date.
#[derive(Debug, Clone)]
pub struct Snapshot {
    calculation_date: NaiveDate,
    histories: BTreeMap<FundCode, Vec<PriceObservation>>,
    metadata: BTreeMap<FundCode, FundMetadata>,
    portfolios: Vec<Portfolio>,
}

impl Snapshot {
    /// Create an empty snapshot for `calculation_date`.
    pub const fn new(calculation_date: NaiveDate) -> Self {
        Self {
            calculation_date,
            histories: BTreeMap::new(),
            metadata: BTreeMap::new(),
            portfolios: Vec::new(),
        }
    }

    /// Load a snapshot from the providers.
    ///
    /// Price history covers the `lookback_days` calendar days ending on the
    /// calculation date, for every fund with observations in that range and
    /// every fund referenced by a portfolio.
    pub fn load<P, R>(
        prices: &P,
        reference: &R,
        calculation_date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Self>
    where
        P: PriceHistoryProvider + ?Sized,
        R: ReferenceDataProvider + ?Sized,
    {
        let range = DateRange::trailing(calculation_date, lookback_days);
        let portfolios = reference.active_portfolios()?;

        let mut universe: BTreeSet<FundCode> = prices.fund_codes(range)?.into_iter().collect();
        for portfolio in &portfolios {
            universe.extend(portfolio.positions.iter().map(|p| p.fund_code.clone()));
        }

        let mut snapshot = Self::new(calculation_date);
        for code in universe {
            let observations = prices.observations(&code, range)?;
            if observations.is_empty() {
                debug!(fund = %code, "no observations in range");
                continue;
            }
            if let Some(meta) = reference.metadata(&code)? {
                snapshot.metadata.insert(code.clone(), meta);
            }
            snapshot = snapshot.with_history(code, observations);
        }
        for portfolio in portfolios {
            snapshot = snapshot.with_portfolio(portfolio);
        }

        info!(
            date = %calculation_date,
            funds = snapshot.histories.len(),
            labelled = snapshot.metadata.len(),
            portfolios = snapshot.portfolios.len(),
            "snapshot loaded"
        );

        Ok(snapshot)
    }

    /// Add the price history of a fund.
    ///
    /// Observations after the calculation date are discarded, the rest are
    /// ordered by date and deduplicated (the last observation of a date wins).
    pub fn with_history(
        mut self,
        code: impl Into<FundCode>,
        observations: impl IntoIterator<Item = PriceObservation>,
    ) -> Self {
        let mut by_date: BTreeMap<NaiveDate, PriceObservation> = BTreeMap::new();
        for obs in observations {
            if obs.date <= self.calculation_date {
                by_date.insert(obs.date, obs);
            }
        }
        if !by_date.is_empty() {
            self.histories
                .insert(code.into(), by_date.into_values().collect());
        }
        self
    }

    /// Add the labels of a fund.
    pub fn with_metadata(mut self, code: impl Into<FundCode>, metadata: FundMetadata) -> Self {
        self.metadata.insert(code.into(), metadata);
        self
    }

    /// Add a portfolio to the registry, keeping the registry ordered by id.
    pub fn with_portfolio(mut self, portfolio: Portfolio) -> Self {
        match self
            .portfolios
            .binary_search_by_key(&portfolio.id, |p| p.id)
        {
            Ok(idx) => self.portfolios[idx] = portfolio,
            Err(idx) => self.portfolios.insert(idx, portfolio),
        }
        self
    }

    /// Date every score in the batch is computed for.
    pub const fn calculation_date(&self) -> NaiveDate {
        self.calculation_date
    }

    /// Full loaded history of a fund, `None` when the fund has no observations.
    pub fn history(&self, code: &FundCode) -> Option<&[PriceObservation]> {
        self.histories.get(code).map(Vec::as_slice)
    }

    /// The trailing `observations` observations of a fund dated within the
    /// `calendar_days` days ending on the calculation date (fewer if
    /// unavailable, empty for a fund whose history stopped before the range).
    pub fn window(
        &self,
        code: &FundCode,
        observations: usize,
        calendar_days: u32,
    ) -> &[PriceObservation] {
        let Some(history) = self.history(code) else {
            return &[];
        };
        let range = DateRange::trailing(self.calculation_date, calendar_days);
        let recent = &history[history.partition_point(|o| o.date < range.start)..];
        &recent[recent.len().saturating_sub(observations)..]
    }

    /// Funds with at least one observation, in code order.
    pub fn fund_codes(&self) -> impl Iterator<Item = &FundCode> {
        self.histories.keys()
    }

    /// Number of funds with price history.
    pub fn fund_count(&self) -> usize {
        self.histories.len()
    }

    /// Labels of a fund.
    pub fn metadata(&self, code: &FundCode) -> Option<&FundMetadata> {
        self.metadata.get(code)
    }

    /// Portfolio registry ordered by id.
    pub fn portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PortfolioId, Position};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn obs(day: u32, price: f64) -> PriceObservation {
        PriceObservation::new(d(day), price, 1_000.0, 10.0)
    }

    #[test]
    fn test_history_sorted_and_bounded() {
        let snapshot = Snapshot::new(d(10)).with_history(
            "AAK",
            vec![obs(3, 1.3), obs(1, 1.1), obs(12, 9.9), obs(3, 1.4)],
        );
        let history = snapshot.history(&FundCode::from("AAK")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, d(1));
        assert_eq!(history[1].price, 1.4);
    }

    #[test]
    fn test_window_takes_trailing_observations() {
        let snapshot =
            Snapshot::new(d(20)).with_history("AAK", (1..=10).map(|day| obs(day, day as f64)));
        let code = FundCode::from("AAK");
        let window = snapshot.window(&code, 3, 30);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].date, d(8));
        assert_eq!(snapshot.window(&code, 50, 30).len(), 10);
        assert!(snapshot.window(&FundCode::from("NOPE"), 3, 30).is_empty());
    }

    #[test]
    fn test_window_anchored_to_calculation_date() {
        let snapshot =
            Snapshot::new(d(20)).with_history("AAK", (1..=10).map(|day| obs(day, day as f64)));
        let code = FundCode::from("AAK");
        // 15 days ending on the 20th start on the 6th
        let window = snapshot.window(&code, 50, 15);
        assert_eq!(window.len(), 5);
        assert_eq!(window[0].date, d(6));
        assert_eq!(snapshot.window(&code, 3, 15)[0].date, d(8));
        // history stopped before the range
        assert!(snapshot.window(&code, 50, 10).is_empty());
    }

    #[test]
    fn test_future_only_history_is_absent() {
        let snapshot = Snapshot::new(d(1)).with_history("AAK", vec![obs(5, 1.0)]);
        assert!(snapshot.history(&FundCode::from("AAK")).is_none());
        assert_eq!(snapshot.fund_count(), 0);
    }

    #[test]
    fn test_portfolios_ordered_by_id() {
        let p = |id: i64| {
            Portfolio::new(PortfolioId::from(id), None, vec![Position::new("A", 1.0)]).unwrap()
        };
        let snapshot = Snapshot::new(d(1))
            .with_portfolio(p(3))
            .with_portfolio(p(1))
            .with_portfolio(p(2))
            .with_portfolio(p(1));
        let ids: Vec<i64> = snapshot.portfolios().iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
