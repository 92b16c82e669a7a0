//! Pairwise-overlap covariance estimation
//!
//! Fund histories have different lengths and gaps, so the covariance of two
//! funds is estimated only over the dates on which both have a return. Pairs
//! with too little overlap contribute nothing; funds with too little history
//! borrow the cross-sectional median variance.

use crate::error::{Result, RiskError};
use ankara_stats::{ReturnSeries, clipped_sqrt, median, sample_covariance, sample_variance};
use ndarray::{Array1, Array2};

/// Pairwise covariance estimator.
#[derive(Debug, Clone, Copy)]
pub struct PairwiseCovarianceEstimator {
    min_overlap: usize,
}

impl PairwiseCovarianceEstimator {
    /// Create an estimator requiring `min_overlap` shared returns per entry.
    pub const fn new(min_overlap: usize) -> Self {
        Self { min_overlap }
    }

    /// Variance of a series, `None` when it is shorter than `min_overlap`.
    pub fn variance(&self, series: &ReturnSeries) -> Option<f64> {
        if series.len() < self.min_overlap {
            return None;
        }
        sample_variance(series.values())
    }

    /// Median variance over the series with sufficient history.
    pub fn fallback_variance<'a, I>(&self, universe: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a ReturnSeries>,
    {
        let variances: Vec<f64> = universe
            .into_iter()
            .filter_map(|s| self.variance(s))
            .collect();
        median(&variances)
    }

    /// Estimate the covariance matrix of `series`.
    ///
    /// Diagonal entries of short series are replaced by `fallback_variance`.
    pub fn estimate(&self, series: &[&ReturnSeries], fallback_variance: f64) -> Array2<f64> {
        let n = series.len();
        let mut cov = Array2::<f64>::zeros((n, n));

        for i in 0..n {
            cov[[i, i]] = self.variance(series[i]).unwrap_or(fallback_variance);
            for j in (i + 1)..n {
                let (xs, ys) = series[i].overlap(series[j]);
                let value = if xs.len() >= self.min_overlap {
                    sample_covariance(&xs, &ys).unwrap_or(0.0)
                } else {
                    0.0
                };
                cov[[i, j]] = value;
                cov[[j, i]] = value;
            }
        }

        cov
    }
}

/// Portfolio variance `wᵀΣw`.
pub fn portfolio_variance(weights: &Array1<f64>, cov: &Array2<f64>) -> Result<f64> {
    if cov.nrows() != weights.len() || cov.ncols() != weights.len() {
        return Err(RiskError::DimensionMismatch {
            expected: weights.len(),
            actual: cov.nrows(),
        });
    }
    Ok(weights.dot(&cov.dot(weights)))
}

/// Portfolio volatility, the square root of the variance clipped at zero.
pub fn portfolio_volatility(weights: &Array1<f64>, cov: &Array2<f64>) -> Result<f64> {
    Ok(clipped_sqrt(portfolio_variance(weights, cov)?))
}
