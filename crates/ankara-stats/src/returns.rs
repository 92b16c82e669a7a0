//! Dated return series
//!
//! Simple returns computed only between consecutive available observations.
//! Gaps in the price history are never interpolated: the return on date `t`
//! is measured against whatever observation precedes it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Daily simple returns keyed by the date of the later observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build a series from date-ordered `(date, price)` pairs.
    ///
    /// A non-positive or non-finite price breaks the chain: neither the return
    /// into it nor the return out of it is emitted.
    ///
    /// # Example
    /// ```
    /// use ankara_stats::ReturnSeries;
    /// use chrono::NaiveDate;
    ///
    /// let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
    /// let series = ReturnSeries::from_prices([(d(1), 100.0), (d(2), 110.0), (d(4), 99.0)]);
    /// assert_eq!(series.len(), 2);
    /// assert_eq!(series.dates()[1], d(4));
    /// ```
    pub fn from_prices<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut dates = Vec::new();
        let mut values = Vec::new();
        let mut previous: Option<f64> = None;

        for (date, price) in prices {
            let valid = price.is_finite() && price > 0.0;
            if let (Some(prev), true) = (previous, valid) {
                dates.push(date);
                values.push(price / prev - 1.0);
            }
            previous = valid.then_some(price);
        }

        Self { dates, values }
    }

    /// Build a series from already computed returns.
    ///
    /// `dates` must be strictly increasing and as long as `values`.
    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<f64>) -> Option<Self> {
        if dates.len() != values.len() || dates.windows(2).any(|w| w[0] >= w[1]) {
            return None;
        }
        Some(Self { dates, values })
    }

    /// Number of returns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no returns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dates of each return.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Return values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The trailing `n` returns (or the whole series when shorter).
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            dates: self.dates[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Iterate `(date, return)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Returns of `self` and `other` restricted to the dates both contain.
    pub fn overlap(&self, other: &Self) -> (Vec<f64>, Vec<f64>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < self.len() && j < other.len() {
            match self.dates[i].cmp(&other.dates[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    left.push(self.values[i]);
                    right.push(other.values[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        (left, right)
    }

    /// Compounded return over the whole series.
    pub fn compounded(&self) -> f64 {
        compound_return(&self.values)
    }
}

/// Compounded return `∏(1 + r) - 1`; `0.0` for an empty slice.
pub fn compound_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_returns_between_consecutive_observations() {
        let series = ReturnSeries::from_prices([(d(1), 100.0), (d(2), 110.0), (d(5), 99.0)]);
        assert_eq!(series.dates(), &[d(2), d(5)]);
        assert_relative_eq!(series.values()[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(series.values()[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_price_breaks_chain() {
        let series = ReturnSeries::from_prices([
            (d(1), 100.0),
            (d(2), 0.0),
            (d(3), 50.0),
            (d(4), 55.0),
        ]);
        assert_eq!(series.dates(), &[d(4)]);
    }

    #[test]
    fn test_single_observation_is_empty() {
        assert!(ReturnSeries::from_prices([(d(1), 10.0)]).is_empty());
    }

    #[test]
    fn test_overlap() {
        let a = ReturnSeries::from_parts(vec![d(1), d(2), d(4)], vec![0.1, 0.2, 0.4]).unwrap();
        let b = ReturnSeries::from_parts(vec![d(2), d(3), d(4)], vec![1.2, 1.3, 1.4]).unwrap();
        let (x, y) = a.overlap(&b);
        assert_eq!(x, vec![0.2, 0.4]);
        assert_eq!(y, vec![1.2, 1.4]);
    }

    #[test]
    fn test_from_parts_rejects_unordered_dates() {
        assert!(ReturnSeries::from_parts(vec![d(2), d(1)], vec![0.0, 0.0]).is_none());
        assert!(ReturnSeries::from_parts(vec![d(1)], vec![0.0, 0.0]).is_none());
    }

    #[test]
    fn test_tail_and_compounding() {
        let series = ReturnSeries::from_parts(vec![d(1), d(2), d(3)], vec![0.1, -0.1, 0.2]).unwrap();
        let tail = series.tail(2);
        assert_eq!(tail.len(), 2);
        assert_relative_eq!(tail.compounded(), 0.9 * 1.2 - 1.0, epsilon = 1e-12);
        assert_eq!(series.tail(10).len(), 3);
        assert_eq!(compound_return(&[]), 0.0);
    }
}
