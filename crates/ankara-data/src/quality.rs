//! Data-quality notes raised while scoring.
//!
//! These are entity-local anomalies. They are resolved on the spot (fallback,
//! renormalization or sentinel) and reported alongside the batch; none of them
//! fails a run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of anomaly and how it was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticsIssue {
    /// Too little history; a fallback was applied or the entity was skipped
    DataUnavailable {
        /// Observations available
        available: usize,
        /// Observations required
        required: usize,
        /// Resolution applied
        resolution: String,
    },
    /// Portfolio references funds without any price history
    InconsistentPortfolio {
        /// Funds dropped from the portfolio
        missing_funds: Vec<String>,
        /// Factor applied to the remaining weights
        renormalization: f64,
    },
    /// Zero dispersion resolved through a sentinel
    DegenerateStatistic {
        /// Which statistic degenerated
        statistic: String,
        /// Value substituted
        sentinel: f64,
    },
}

/// An [`AnalyticsIssue`] attached to the entity it concerns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityNote {
    /// Portfolio id or fund code
    pub entity: String,
    /// What happened
    pub issue: AnalyticsIssue,
}

impl DataQualityNote {
    /// Attach `issue` to `entity`.
    pub fn new(entity: impl ToString, issue: AnalyticsIssue) -> Self {
        Self {
            entity: entity.to_string(),
            issue,
        }
    }
}

impl fmt::Display for DataQualityNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issue {
            AnalyticsIssue::DataUnavailable {
                available,
                required,
                resolution,
            } => write!(
                f,
                "{}: {} of {} observations, {}",
                self.entity, available, required, resolution
            ),
            AnalyticsIssue::InconsistentPortfolio {
                missing_funds,
                renormalization,
            } => write!(
                f,
                "{}: dropped unknown funds [{}], remaining weights scaled by {:.4}",
                self.entity,
                missing_funds.join(", "),
                renormalization
            ),
            AnalyticsIssue::DegenerateStatistic {
                statistic,
                sentinel,
            } => write!(f, "{}: zero {}, used {}", self.entity, statistic, sentinel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let note = DataQualityNote::new(
            12,
            AnalyticsIssue::InconsistentPortfolio {
                missing_funds: vec!["XYZ".to_string()],
                renormalization: 1.25,
            },
        );
        let text = note.to_string();
        assert!(text.starts_with("12:"));
        assert!(text.contains("XYZ"));
        assert!(text.contains("1.2500"));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let note = DataQualityNote::new(
            "AAK",
            AnalyticsIssue::DegenerateStatistic {
                statistic: "volatility".to_string(),
                sentinel: 1e6,
            },
        );
        let json = serde_json::to_string(&note).unwrap();
        assert!(json.contains("\"kind\":\"degenerate_statistic\""));
    }
}
