#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ankara/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod import;
pub mod model;
pub mod provider;
pub mod quality;
pub mod snapshot;
pub mod store;

pub use error::{DataError, Result};
pub use model::{
    DateRange, FundCode, FundMetadata, FundPerformanceMetric, PeerTier, Portfolio, PortfolioId,
    PortfolioRiskScore, Position, PriceObservation, RiskClassification, RiskComponents,
};
pub use provider::{PriceHistoryProvider, ReferenceDataProvider, ResultsStore};
pub use quality::{AnalyticsIssue, DataQualityNote};
pub use snapshot::Snapshot;
pub use store::{SqliteStore, StoreStats};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
