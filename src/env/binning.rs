//! Discretisation of continuous observations into bin indices.

/// `n` evenly spaced edges from `low` to `high` inclusive.
pub(crate) fn linspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![low];
    }
    let step = (high - low) / (n - 1) as f64;
    (0..n).map(|i| low + step * i as f64).collect()
}

/// Number of edges at or below `value`, so `0..=edges.len()`.
pub(crate) fn bin_index(value: f64, edges: &[f64]) -> usize {
    edges.iter().filter(|&&edge| value >= edge).count()
}

/// Mixed-radix index of per-dimension bins, each in `0..radix`.
pub(crate) fn combine(bins: impl IntoIterator<Item = usize>, radix: usize) -> usize {
    bins.into_iter().fold(0, |acc: usize, bin| {
        acc.saturating_mul(radix).saturating_add(bin.min(radix.saturating_sub(1)))
    })
}
