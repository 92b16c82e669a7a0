//! Error types for data operations.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A batch write was rejected and rolled back
    #[error("Batch write to {table} for {date} was rolled back: {source}")]
    BatchPersistence {
        /// Target table
        table: &'static str,
        /// Calculation date of the batch
        date: NaiveDate,
        /// Underlying database error
        source: rusqlite::Error,
    },

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: NaiveDate,
        /// End date of the range
        end: NaiveDate,
    },

    /// Portfolio definition violates the registry rules
    #[error("Invalid portfolio {id}: {reason}")]
    InvalidPortfolio {
        /// Portfolio identifier
        id: i64,
        /// What is wrong with it
        reason: String,
    },

    /// A score row does not belong to the batch it was submitted with
    #[error("Row for {entity} is dated {row_date}, batch is for {batch_date}")]
    MismatchedBatchDate {
        /// Entity key of the offending row
        entity: String,
        /// Date carried by the row
        row_date: NaiveDate,
        /// Date of the batch
        batch_date: NaiveDate,
    },

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Whether the same operation may succeed if retried on the next run.
    ///
    /// Rejected batch writes leave no partial state behind, so a scheduler can
    /// simply run the date again.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BatchPersistence { .. } | Self::Database(_) | Self::Io(_))
    }
}
