//! Sample moments
//!
//! Mean, variance and covariance with one degree of freedom removed.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (ddof = 1), `None` with fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mu = mean(values)?;
    let n = values.len() as f64;
    Some(values.iter().map(|&x| (x - mu).powi(2)).sum::<f64>() / (n - 1.0))
}

/// Sample standard deviation (ddof = 1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Sample covariance (ddof = 1) of two equally long slices.
///
/// Returns `None` when lengths differ or fewer than two pairs are available.
pub fn sample_covariance(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let n = xs.len() as f64;
    let sum = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| (x - mx) * (y - my))
        .sum::<f64>();
    Some(sum / (n - 1.0))
}
