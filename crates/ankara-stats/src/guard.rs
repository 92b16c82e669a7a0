//! Guarded arithmetic
//!
//! Divisions and square roots whose degenerate inputs resolve to documented
//! sentinels instead of `NaN` or infinity.

/// Denominators with an absolute value below this are treated as zero.
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// Whether `value` is treated as zero by the guarded divisions.
pub const fn is_negligible(value: f64) -> bool {
    value.abs() < ZERO_TOLERANCE
}

/// Divide `numerator` by `denominator`, resolving a zero denominator to a sentinel.
///
/// When the denominator is (numerically) zero the result is `0.0` if the
/// numerator is also zero, otherwise `sentinel` carrying the numerator's sign.
///
/// # Example
/// ```
/// use ankara_stats::ratio_or_signed_sentinel;
///
/// assert_eq!(ratio_or_signed_sentinel(0.2, 0.1, 1e6), 2.0);
/// assert_eq!(ratio_or_signed_sentinel(-0.2, 0.0, 1e6), -1e6);
/// assert_eq!(ratio_or_signed_sentinel(0.0, 0.0, 1e6), 0.0);
/// ```
pub fn ratio_or_signed_sentinel(numerator: f64, denominator: f64, sentinel: f64) -> f64 {
    if is_negligible(denominator) {
        if is_negligible(numerator) {
            0.0
        } else {
            sentinel.abs().copysign(numerator)
        }
    } else {
        numerator / denominator
    }
}

/// Divide, returning `fallback` when the denominator is (numerically) zero.
pub fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if is_negligible(denominator) {
        fallback
    } else {
        numerator / denominator
    }
}

/// Square root of `value` clipped at zero.
///
/// Small negative values are numerical noise from quadratic forms such as
/// `wᵀΣw`; they map to `0.0` rather than `NaN`.
pub fn clipped_sqrt(value: f64) -> f64 {
    if value.is_nan() || value <= 0.0 {
        0.0
    } else {
        value.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_regular_division() {
        assert_eq!(ratio_or_signed_sentinel(1.0, 4.0, 1e6), 0.25);
        assert_eq!(ratio_or(1.0, 4.0, 7.0), 0.25);
    }

    #[rstest]
    #[case(0.05, 1e6, 1e6)]
    #[case(-0.05, 1e6, -1e6)]
    // the sentinel's own sign is ignored
    #[case(0.05, -1e6, 1e6)]
    #[case(0.0, 1e6, 0.0)]
    fn test_signed_sentinel(#[case] numerator: f64, #[case] sentinel: f64, #[case] expected: f64) {
        assert_eq!(ratio_or_signed_sentinel(numerator, 0.0, sentinel), expected);
    }

    #[test]
    fn test_ratio_or_fallback() {
        assert_eq!(ratio_or(3.0, 0.0, 0.5), 0.5);
    }

    #[test]
    fn test_clipped_sqrt() {
        assert_eq!(clipped_sqrt(4.0), 2.0);
        assert_eq!(clipped_sqrt(-1e-18), 0.0);
        assert_eq!(clipped_sqrt(f64::NAN), 0.0);
        assert!(!clipped_sqrt(-3.0).is_nan());
    }
}
