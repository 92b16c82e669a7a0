#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ankara/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;

// Re-export main types from sub-crates
pub use ankara_data as data;
pub use ankara_output as output;
pub use ankara_performance as performance;
pub use ankara_risk as risk;
pub use ankara_stats as stats;

pub use config::AnalyticsConfig;
pub use error::{PipelineError, Result};
pub use pipeline::Pipeline;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
