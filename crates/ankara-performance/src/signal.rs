//! Sharpe-like performance signal.

use ankara_data::FundCode;
use ankara_stats::{compound_return, ratio_or_signed_sentinel, sample_std};
use serde::Serialize;

/// Return, volatility and their ratio over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SharpeLike {
    /// Compounded return `∏(1 + r) − 1`
    pub total_return: f64,
    /// Sample standard deviation of the returns
    pub volatility: f64,
    /// `total_return / volatility`, sentinel-guarded
    pub ratio: f64,
}

impl SharpeLike {
    /// Evaluate `returns`; `None` with fewer than two returns.
    ///
    /// A zero volatility yields `0` for a zero return and `±sentinel`
    /// otherwise, so the ratio is always finite.
    ///
    /// # Example
    /// ```
    /// use ankara_performance::SharpeLike;
    ///
    /// let flat_up = SharpeLike::from_returns(&[0.01, 0.01, 0.01], 1e6).unwrap();
    /// assert_eq!(flat_up.ratio, 1e6);
    /// ```
    pub fn from_returns(returns: &[f64], sentinel: f64) -> Option<Self> {
        let volatility = sample_std(returns)?;
        let total_return = compound_return(returns);
        Some(Self {
            total_return,
            volatility,
            ratio: ratio_or_signed_sentinel(total_return, volatility, sentinel),
        })
    }

    /// Whether the ratio was resolved through the zero-volatility sentinel.
    pub fn is_degenerate(&self) -> bool {
        self.volatility.abs() < ankara_stats::guard::ZERO_TOLERANCE
    }
}

/// A scored fund with the labels used for peer selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundSignal {
    /// Fund
    pub fund_code: FundCode,
    /// Signal over the window
    pub signal: SharpeLike,
    /// Returns inside the window
    pub observations: usize,
    /// Fine category, if labelled
    pub category: Option<String>,
    /// Main category, if labelled
    pub main_category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sharpe_like() {
        let s = SharpeLike::from_returns(&[0.01, -0.01, 0.02], 1e6).unwrap();
        assert_relative_eq!(s.total_return, 1.01 * 0.99 * 1.02 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.ratio, s.total_return / s.volatility, epsilon = 1e-12);
        assert!(!s.is_degenerate());
    }

    #[test]
    fn test_zero_volatility() {
        let flat = SharpeLike::from_returns(&[0.0, 0.0, 0.0], 1e6).unwrap();
        assert_eq!(flat.ratio, 0.0);
        assert!(flat.is_degenerate());

        let down = SharpeLike::from_returns(&[-0.01, -0.01], 1e6).unwrap();
        assert_eq!(down.ratio, -1e6);
    }

    #[test]
    fn test_too_short() {
        assert!(SharpeLike::from_returns(&[0.01], 1e6).is_none());
    }
}
