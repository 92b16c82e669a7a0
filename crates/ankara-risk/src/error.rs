//! Risk engine errors.

use ankara_data::DataError;
use thiserror::Error;

/// Errors that can fail a risk batch.
///
/// Entity-level problems (short histories, unknown funds) are not errors; they
/// surface as data-quality notes on the batch.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Reading inputs or persisting the batch failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Configuration is unusable
    #[error("Invalid risk configuration: {0}")]
    InvalidConfig(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

impl RiskError {
    /// Whether rerunning the same date may succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Data(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for risk operations.
pub type Result<T> = std::result::Result<T, RiskError>;
