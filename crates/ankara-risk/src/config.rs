//! Risk engine configuration.

use crate::error::{Result, RiskError};
use ankara_data::RiskComponents;
use serde::{Deserialize, Serialize};

/// Weights blending the four component percentiles into the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    /// Volatility weight (default: 0.6)
    pub volatility: f64,
    /// Concentration weight (default: 0.2)
    pub concentration: f64,
    /// Max drawdown weight (default: 0.1)
    pub max_drawdown: f64,
    /// Liquidity penalty weight (default: 0.1)
    pub liquidity_penalty: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            volatility: 0.6,
            concentration: 0.2,
            max_drawdown: 0.1,
            liquidity_penalty: 0.1,
        }
    }
}

impl CompositeWeights {
    /// Weighted sum of component percentiles.
    pub fn combine(&self, percentiles: &RiskComponents) -> f64 {
        self.volatility * percentiles.volatility
            + self.concentration * percentiles.concentration
            + self.max_drawdown * percentiles.max_drawdown
            + self.liquidity_penalty * percentiles.liquidity_penalty
    }

    fn sum(&self) -> f64 {
        self.volatility + self.concentration + self.max_drawdown + self.liquidity_penalty
    }
}

/// Fixed classification cut points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationThresholds {
    /// Lowest MEDIUM score (default: 0.33)
    pub medium: f64,
    /// Lowest HIGH score (default: 0.67)
    pub high: f64,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            medium: 0.33,
            high: 0.67,
        }
    }
}

/// Risk engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Trailing returns used for volatility and drawdown (default: 180)
    pub window_observations: usize,

    /// Calendar days ending on the calculation date that return prices
    /// must fall in (default: 270)
    pub window_days: u32,

    /// Minimum overlapping returns for a variance or covariance (default: 30)
    pub min_overlap: usize,

    /// Trailing observations averaged for liquidity (default: 30)
    pub liquidity_observations: usize,

    /// Calendar days ending on the calculation date that liquidity
    /// observations must fall in (default: 45)
    pub liquidity_days: u32,

    /// Composite weights
    pub weights: CompositeWeights,

    /// Classification thresholds
    pub thresholds: ClassificationThresholds,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_observations: 180,
            window_days: 270,
            min_overlap: 30,
            liquidity_observations: 30,
            liquidity_days: 45,
            weights: CompositeWeights::default(),
            thresholds: ClassificationThresholds::default(),
        }
    }
}

impl RiskConfig {
    /// Reject configurations the engine cannot score with.
    pub fn validate(&self) -> Result<()> {
        if self.window_observations < 2 {
            return Err(RiskError::InvalidConfig(format!(
                "window_observations must be at least 2, got {}",
                self.window_observations
            )));
        }
        if self.min_overlap < 2 {
            return Err(RiskError::InvalidConfig(format!(
                "min_overlap must be at least 2, got {}",
                self.min_overlap
            )));
        }
        if self.liquidity_observations == 0 {
            return Err(RiskError::InvalidConfig(
                "liquidity_observations must be positive".to_string(),
            ));
        }
        if self.window_days == 0 || self.liquidity_days == 0 {
            return Err(RiskError::InvalidConfig(format!(
                "window_days and liquidity_days must be positive, got {} / {}",
                self.window_days, self.liquidity_days
            )));
        }
        let w = &self.weights;
        if [w.volatility, w.concentration, w.max_drawdown, w.liquidity_penalty]
            .iter()
            .any(|x| !x.is_finite() || *x < 0.0)
            || (w.sum() - 1.0).abs() > 1e-9
        {
            return Err(RiskError::InvalidConfig(format!(
                "composite weights must be non-negative and sum to 1, got {}",
                w.sum()
            )));
        }
        let t = &self.thresholds;
        if !(0.0 < t.medium && t.medium < t.high && t.high <= 1.0) {
            return Err(RiskError::InvalidConfig(format!(
                "thresholds must satisfy 0 < medium < high <= 1, got {} / {}",
                t.medium, t.high
            )));
        }
        Ok(())
    }

    /// Price observations needed to produce `window_observations` returns.
    pub const fn price_observations(&self) -> usize {
        self.window_observations + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        let config = RiskConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.price_observations(), 181);
    }

    #[test]
    fn test_combine_all_ones() {
        let pct = RiskComponents {
            volatility: 1.0,
            concentration: 1.0,
            max_drawdown: 1.0,
            liquidity_penalty: 1.0,
        };
        assert_relative_eq!(CompositeWeights::default().combine(&pct), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let config = RiskConfig {
            weights: CompositeWeights {
                volatility: 0.9,
                ..CompositeWeights::default()
            },
            ..RiskConfig::default()
        };
        assert!(matches!(config.validate(), Err(RiskError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let config = RiskConfig {
            thresholds: ClassificationThresholds {
                medium: 0.7,
                high: 0.3,
            },
            ..RiskConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
