//! Mapping composite scores onto risk labels.

use crate::config::ClassificationThresholds;
use ankara_data::RiskClassification;

/// Classify a composite score.
///
/// `score < medium` is LOW, `medium <= score < high` is MEDIUM and
/// `score >= high` is HIGH. The cut points never depend on the batch.
pub fn classify(score: f64, thresholds: &ClassificationThresholds) -> RiskClassification {
    if score < thresholds.medium {
        RiskClassification::Low
    } else if score < thresholds.high {
        RiskClassification::Medium
    } else {
        RiskClassification::High
    }
}
