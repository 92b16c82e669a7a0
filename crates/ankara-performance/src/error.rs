//! Performance engine errors.

use ankara_data::DataError;
use thiserror::Error;

/// Errors that can fail a performance batch.
#[derive(Debug, Error)]
pub enum PerformanceError {
    /// Reading inputs or persisting the batch failed
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Configuration is unusable
    #[error("Invalid performance configuration: {0}")]
    InvalidConfig(String),
}

impl PerformanceError {
    /// Whether rerunning the same date may succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Data(e) => e.is_retryable(),
            Self::InvalidConfig(_) => false,
        }
    }
}

/// Result type for performance operations.
pub type Result<T> = std::result::Result<T, PerformanceError>;
