#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ankara/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod peer;
pub mod signal;

pub use config::{PerformanceConfig, PoorPerformerRule};
pub use engine::{PerformanceBatch, PerformanceEngine};
pub use error::{PerformanceError, Result};
pub use peer::{PeerIndex, PeerPolicy, PeerSelection};
pub use signal::{FundSignal, SharpeLike};
