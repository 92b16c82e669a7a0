//! Batch run reports.

use ankara_data::{
    DataQualityNote, FundCode, FundPerformanceMetric, PortfolioRiskScore, RiskClassification,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a risk batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    /// Rows written.
    pub portfolios: usize,
    /// LOW rows.
    pub low: usize,
    /// MEDIUM rows.
    pub medium: usize,
    /// HIGH rows.
    pub high: usize,
}

impl RiskSummary {
    /// Summarize risk rows.
    pub fn from_scores(scores: &[PortfolioRiskScore]) -> Self {
        let count = |c: RiskClassification| scores.iter().filter(|s| s.classification == c).count();
        Self {
            portfolios: scores.len(),
            low: count(RiskClassification::Low),
            medium: count(RiskClassification::Medium),
            high: count(RiskClassification::High),
        }
    }
}

/// A fund flagged in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedFund {
    /// Fund code.
    pub fund_code: String,
    /// Peer group it was compared with.
    pub peer_category: String,
    /// Peer percentile.
    pub performance_score: f64,
    /// Flag confidence.
    pub confidence: f64,
}

/// Outcome of a performance batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Rows written.
    pub funds: usize,
    /// Funds skipped for insufficient history.
    pub skipped: usize,
    /// Flagged funds, lowest confidence last.
    pub flagged: Vec<FlaggedFund>,
}

impl PerformanceSummary {
    /// Summarize performance rows.
    pub fn from_metrics(metrics: &[FundPerformanceMetric], skipped: &[FundCode]) -> Self {
        let mut flagged: Vec<FlaggedFund> = metrics
            .iter()
            .filter_map(|m| {
                m.confidence.map(|confidence| FlaggedFund {
                    fund_code: m.fund_code.to_string(),
                    peer_category: m.peer_category.clone(),
                    performance_score: m.performance_score,
                    confidence,
                })
            })
            .collect();
        flagged.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.fund_code.cmp(&b.fund_code))
        });

        Self {
            funds: metrics.len(),
            skipped: skipped.len(),
            flagged,
        }
    }
}

/// Report of one analytics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Calculation date.
    pub date: NaiveDate,

    /// Report generation timestamp.
    pub generated_at: DateTime<Utc>,

    /// Risk batch outcome, if the engine ran.
    pub risk: Option<RiskSummary>,

    /// Performance batch outcome, if the engine ran.
    pub performance: Option<PerformanceSummary>,

    /// Data-quality notes raised by either engine.
    pub notes: Vec<DataQualityNote>,
}

impl BatchReport {
    /// Start building a report for `date`.
    pub fn builder(date: NaiveDate) -> ReportBuilder {
        ReportBuilder::new(date)
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analytics run for {}", self.date)?;
        writeln!(f, "{}", "=".repeat(60))?;

        if let Some(risk) = &self.risk {
            writeln!(
                f,
                "Risk:        {} portfolios (LOW {}, MEDIUM {}, HIGH {})",
                risk.portfolios, risk.low, risk.medium, risk.high
            )?;
        }

        if let Some(perf) = &self.performance {
            writeln!(
                f,
                "Performance: {} funds scored, {} skipped, {} flagged",
                perf.funds,
                perf.skipped,
                perf.flagged.len()
            )?;
            for fund in &perf.flagged {
                writeln!(
                    f,
                    "  {:<8} {:<24} pct {:.3}  confidence {:.2}",
                    fund.fund_code, fund.peer_category, fund.performance_score, fund.confidence
                )?;
            }
        }

        if !self.notes.is_empty() {
            writeln!(f, "Data quality ({} notes):", self.notes.len())?;
            for note in &self.notes {
                writeln!(f, "  {note}")?;
            }
        }

        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug)]
pub struct ReportBuilder {
    date: NaiveDate,
    risk: Option<RiskSummary>,
    performance: Option<PerformanceSummary>,
    notes: Vec<DataQualityNote>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            risk: None,
            performance: None,
            notes: Vec::new(),
        }
    }

    /// Add the risk batch outcome.
    pub fn risk(mut self, scores: &[PortfolioRiskScore]) -> Self {
        self.risk = Some(RiskSummary::from_scores(scores));
        self
    }

    /// Add the performance batch outcome.
    pub fn performance(mut self, metrics: &[FundPerformanceMetric], skipped: &[FundCode]) -> Self {
        self.performance = Some(PerformanceSummary::from_metrics(metrics, skipped));
        self
    }

    /// Append data-quality notes.
    pub fn notes(mut self, notes: impl IntoIterator<Item = DataQualityNote>) -> Self {
        self.notes.extend(notes);
        self
    }

    /// Build the report.
    pub fn build(self) -> BatchReport {
        BatchReport {
            date: self.date,
            generated_at: Utc::now(),
            risk: self.risk,
            performance: self.performance,
            notes: self.notes,
        }
    }
}
