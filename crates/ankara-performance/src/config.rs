//! Performance engine configuration.

use crate::error::{PerformanceError, Result};
use crate::peer::PeerPolicy;
use serde::{Deserialize, Serialize};

/// Conservative poor-performer rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoorPerformerRule {
    /// Highest peer percentile still considered poor (default: 0.10)
    pub max_percentile: f64,
    /// Highest robust z-score still considered poor (default: -1.5)
    pub max_z: f64,
    /// |z| at which confidence saturates (default: 3.0)
    pub confidence_scale: f64,
}

impl Default for PoorPerformerRule {
    fn default() -> Self {
        Self {
            max_percentile: 0.10,
            max_z: -1.5,
            confidence_scale: 3.0,
        }
    }
}

impl PoorPerformerRule {
    /// Confidence of the flag, `None` unless both conditions hold.
    ///
    /// # Example
    /// ```
    /// use ankara_performance::PoorPerformerRule;
    ///
    /// let rule = PoorPerformerRule::default();
    /// assert_eq!(rule.evaluate(0.05, -1.2), None);
    /// assert!(rule.evaluate(0.08, -1.8).is_some());
    /// ```
    pub fn evaluate(&self, percentile: f64, z: f64) -> Option<f64> {
        (percentile <= self.max_percentile && z <= self.max_z)
            .then(|| (z.abs() / self.confidence_scale).min(1.0))
    }
}

/// Performance engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Trailing returns evaluated (default: 90)
    pub window_observations: usize,

    /// Calendar days ending on the calculation date that window prices
    /// must fall in (default: 135)
    pub window_days: u32,

    /// Minimum returns inside the window to score a fund (default: 30)
    pub min_returns: usize,

    /// Minimum scored members for a category peer group (default: 5)
    pub min_peer_group: usize,

    /// Magnitude of the sharpe-like value of a zero-volatility fund (default: 1e6)
    pub zero_volatility_sentinel: f64,

    /// Peer policies tried in order; the last must be the universe
    pub peer_policies: Vec<PeerPolicy>,

    /// Flagging rule
    pub rule: PoorPerformerRule,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            window_observations: 90,
            window_days: 135,
            min_returns: 30,
            min_peer_group: 5,
            zero_volatility_sentinel: 1e6,
            peer_policies: PeerPolicy::default_chain(),
            rule: PoorPerformerRule::default(),
        }
    }
}

impl PerformanceConfig {
    /// Reject configurations the engine cannot score with.
    pub fn validate(&self) -> Result<()> {
        if self.min_returns < 2 {
            return Err(PerformanceError::InvalidConfig(format!(
                "min_returns must be at least 2, got {}",
                self.min_returns
            )));
        }
        if self.window_observations < self.min_returns {
            return Err(PerformanceError::InvalidConfig(format!(
                "window_observations ({}) is shorter than min_returns ({})",
                self.window_observations, self.min_returns
            )));
        }
        if self.window_days == 0 {
            return Err(PerformanceError::InvalidConfig(
                "window_days must be positive".to_string(),
            ));
        }
        if self.min_peer_group == 0 {
            return Err(PerformanceError::InvalidConfig(
                "min_peer_group must be positive".to_string(),
            ));
        }
        if !(self.zero_volatility_sentinel.is_finite() && self.zero_volatility_sentinel > 0.0) {
            return Err(PerformanceError::InvalidConfig(format!(
                "zero_volatility_sentinel must be finite and positive, got {}",
                self.zero_volatility_sentinel
            )));
        }
        if self.peer_policies.last() != Some(&PeerPolicy::Universe) {
            return Err(PerformanceError::InvalidConfig(
                "peer_policies must end with the universe policy".to_string(),
            ));
        }
        if self.rule.confidence_scale <= 0.0 {
            return Err(PerformanceError::InvalidConfig(
                "confidence_scale must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Price observations needed to produce `window_observations` returns.
    pub const fn price_observations(&self) -> usize {
        self.window_observations + 1
    }
}
