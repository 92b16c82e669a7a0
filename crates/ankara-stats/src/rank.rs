//! Cross-sectional ranking
//!
//! Percentile ranks follow the "average" convention: tied values share the
//! mean of the ordinal ranks they occupy, and the rank is divided by the
//! population size. The lowest distinct value of `n` entries therefore maps to
//! `1/n` and the highest to `1.0`.

use std::cmp::Ordering;

/// Percentile rank of every value within `values`, in input order.
///
/// # Example
/// ```
/// use ankara_stats::percentile_ranks;
///
/// let ranks = percentile_ranks(&[0.3, 0.1, 0.3, 0.5]);
/// assert_eq!(ranks, vec![0.625, 0.25, 0.625, 1.0]);
/// ```
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let keyed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    percentile_ranks_by_key(&keyed)
}

/// Percentile rank of every `(key, value)` entry, in input order.
///
/// Entries are ordered by value and then by key, so the traversal order is
/// fully determined by the data even when values tie. Tied values still
/// receive identical (averaged) ranks.
pub fn percentile_ranks_by_key<K: Ord>(entries: &[(K, f64)]) -> Vec<f64> {
    let n = entries.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        entries[a]
            .1
            .total_cmp(&entries[b].1)
            .then_with(|| entries[a].0.cmp(&entries[b].0))
    });

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let value = entries[order[start]].1;
        let mut end = start + 1;
        while end < n && entries[order[end]].1.total_cmp(&value) == Ordering::Equal {
            end += 1;
        }
        // ordinal ranks start..end are 1-based (start + 1)..=end
        let average = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = average / n as f64;
        }
        start = end;
    }

    ranks
}

/// Min-max scale `values` into `[0, 1]`.
///
/// A constant population (including a single value) maps every entry to `0.5`.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    if !span.is_finite() || span <= 0.0 {
        return vec![0.5; values.len()];
    }

    values.iter().map(|&v| (v - min) / span).collect()
}
