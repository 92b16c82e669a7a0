//! Robust location and dispersion
//!
//! Median, median absolute deviation (MAD) and the MAD-scaled z-score used
//! for peer anomaly detection.

use crate::guard::{is_negligible, ratio_or};

/// Consistency constant turning a MAD into a normal-equivalent sigma.
pub const MAD_SCALE: f64 = 1.4826;

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median absolute deviation around `center`.
pub fn median_absolute_deviation(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|&x| (x - center).abs()).collect();
    median(&deviations)
}

/// Robust z-score `(x - median) / (MAD_SCALE * mad)`.
///
/// A zero MAD (more than half the population identical) yields `0.0`: the
/// observation is treated as unremarkable rather than infinitely far away.
///
/// # Example
/// ```
/// use ankara_stats::robust_z_score;
///
/// assert_eq!(robust_z_score(5.0, 5.0, 0.0), 0.0);
/// assert_eq!(robust_z_score(9.0, 5.0, 0.0), 0.0);
/// ```
pub fn robust_z_score(value: f64, median: f64, mad: f64) -> f64 {
    ratio_or(value - median, MAD_SCALE * mad, 0.0)
}

/// Whether `mad` is too small to scale a z-score; [`robust_z_score`] returns
/// `0.0` for every value then.
pub const fn is_degenerate_mad(mad: f64) -> bool {
    is_negligible(MAD_SCALE * mad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_near_zero_mad_is_degenerate() {
        let mad = 1e-13;
        assert!(is_degenerate_mad(mad));
        assert!(is_degenerate_mad(0.0));
        assert!(!is_degenerate_mad(1e-6));
        assert_eq!(robust_z_score(1.0, 0.5, mad), 0.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_mad() {
        // deviations from 3: [2,1,0,1,2] -> median 1
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(median_absolute_deviation(&values, 3.0), Some(1.0));
    }

    #[test]
    fn test_robust_z_score() {
        let z = robust_z_score(0.0, 3.0, 1.0);
        assert_relative_eq!(z, -3.0 / 1.4826, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_mad_guard() {
        let values = [1.0, 1.0, 1.0, 1.0, 10.0];
        let m = median(&values).unwrap();
        let mad = median_absolute_deviation(&values, m).unwrap();
        assert_eq!(mad, 0.0);
        assert_eq!(robust_z_score(10.0, m, mad), 0.0);
    }
}
