#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ankara/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod classification;
pub mod components;
pub mod config;
pub mod covariance;
pub mod engine;
pub mod error;
pub mod table;

// Re-export main types
pub use classification::classify;
pub use config::{ClassificationThresholds, CompositeWeights, RiskConfig};
pub use covariance::PairwiseCovarianceEstimator;
pub use engine::{RiskBatch, RiskScoringEngine};
pub use error::{Result, RiskError};
pub use table::{RawComponentRow, RawComponentTable};
