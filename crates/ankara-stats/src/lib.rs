#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/ankara/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod guard;
pub mod moments;
pub mod rank;
pub mod returns;
pub mod robust;

pub use guard::{clipped_sqrt, ratio_or_signed_sentinel};
pub use moments::{mean, sample_covariance, sample_std, sample_variance};
pub use rank::{min_max_normalize, percentile_ranks, percentile_ranks_by_key};
pub use returns::{ReturnSeries, compound_return};
pub use robust::{
    MAD_SCALE, is_degenerate_mad, median, median_absolute_deviation, robust_z_score,
};
