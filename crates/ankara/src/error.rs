//! Pipeline errors.

use ankara_data::DataError;
use ankara_output::{ExportError, ReportError};
use ankara_performance::PerformanceError;
use ankara_risk::RiskError;
use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading inputs failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Risk batch failed
    #[error("Risk batch failed: {0}")]
    Risk(#[from] RiskError),

    /// Performance batch failed
    #[error("Performance batch failed: {0}")]
    Performance(#[from] PerformanceError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Export failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Report rendering failed
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl PipelineError {
    /// Whether rerunning the same date may succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Data(e) => e.is_retryable(),
            Self::Risk(e) => e.is_retryable(),
            Self::Performance(e) => e.is_retryable(),
            Self::Config(_) | Self::Export(_) | Self::Report(_) => false,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
