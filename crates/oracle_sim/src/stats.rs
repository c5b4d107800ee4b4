//! Order statistics over trial samples.

/// Sorted copy of `values`; NaNs order last.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Median of an already sorted slice.
///
/// For even lengths this is the mean of the two middle values. Returns `NaN`
/// for an empty slice.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median of `values` (any order).
pub fn median(values: &[f64]) -> f64 {
    median_sorted(&sorted(values))
}

/// Percentile `p ∈ [0, 100]` of an already sorted slice.
///
/// Linear interpolation between closest ranks, rank = `p/100 × (n − 1)`.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}
