//! Export of stored score rows.
//!
//! Rows are flattened into one record per entity so that CSV and JSON carry
//! the same columns.

use ankara_data::{FundPerformanceMetric, PortfolioRiskScore};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Flat risk row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskScoreRecord {
    /// Portfolio id.
    pub portfolio_id: i64,
    /// Calculation date.
    pub date: NaiveDate,
    /// Composite score.
    pub risk_score: f64,
    /// LOW, MEDIUM or HIGH.
    pub risk: String,
    /// Raw volatility.
    pub volatility: f64,
    /// Raw concentration.
    pub concentration: f64,
    /// Raw max drawdown.
    pub max_drawdown: f64,
    /// Raw liquidity penalty.
    pub liquidity_penalty: f64,
    /// Volatility percentile.
    pub volatility_pct: f64,
    /// Concentration percentile.
    pub concentration_pct: f64,
    /// Drawdown percentile.
    pub drawdown_pct: f64,
    /// Liquidity percentile.
    pub liquidity_pct: f64,
}

impl From<&PortfolioRiskScore> for RiskScoreRecord {
    fn from(row: &PortfolioRiskScore) -> Self {
        Self {
            portfolio_id: row.portfolio_id.get(),
            date: row.date,
            risk_score: row.risk_score,
            risk: row.classification.to_string(),
            volatility: row.components.volatility,
            concentration: row.components.concentration,
            max_drawdown: row.components.max_drawdown,
            liquidity_penalty: row.components.liquidity_penalty,
            volatility_pct: row.percentiles.volatility,
            concentration_pct: row.percentiles.concentration,
            drawdown_pct: row.percentiles.max_drawdown,
            liquidity_pct: row.percentiles.liquidity_penalty,
        }
    }
}

/// Flat performance row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRecord {
    /// Fund code.
    pub fund_code: String,
    /// Calculation date.
    pub date: NaiveDate,
    /// Peer percentile.
    pub performance_score: f64,
    /// Peer tier used.
    pub peer_tier: String,
    /// Peer group name.
    pub peer_category: String,
    /// Poor-performer flag.
    pub is_poor_performer: bool,
    /// Flag confidence, empty unless flagged.
    pub confidence: Option<f64>,
    /// Sharpe-like ratio.
    pub sharpe_like: f64,
    /// Compounded return.
    pub total_return: f64,
    /// Return volatility.
    pub volatility: f64,
    /// Robust z-score.
    pub robust_z: f64,
}

impl From<&FundPerformanceMetric> for PerformanceRecord {
    fn from(row: &FundPerformanceMetric) -> Self {
        Self {
            fund_code: row.fund_code.to_string(),
            date: row.date,
            performance_score: row.performance_score,
            peer_tier: row.peer_tier.to_string(),
            peer_category: row.peer_category.clone(),
            is_poor_performer: row.is_poor_performer,
            confidence: row.confidence,
            sharpe_like: row.sharpe_like,
            total_return: row.total_return,
            volatility: row.volatility,
            robust_z: row.robust_z,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn records_to_string<T: Serialize>(records: &[T], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            for record in records {
                wtr.serialize(record)?;
            }
            let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
            String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
        }
        ExportFormat::Json => Ok(serde_json::to_string(records)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(records)?),
    }
}

impl Exporter for Vec<PortfolioRiskScore> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        let records: Vec<RiskScoreRecord> = self.iter().map(RiskScoreRecord::from).collect();
        records_to_string(&records, format)
    }
}

impl Exporter for Vec<FundPerformanceMetric> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        let records: Vec<PerformanceRecord> = self.iter().map(PerformanceRecord::from).collect();
        records_to_string(&records, format)
    }
}
