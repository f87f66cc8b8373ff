//! Masked spectrum distance.

/// Mean squared error over the known target points only.
///
/// `known` holds `(index, value)` pairs; indices must be inside `spectrum`.
/// Returns 0 for an empty mask.
pub fn masked_mse(known: &[(usize, f64)], spectrum: &[f64]) -> f64 {
    if known.is_empty() {
        return 0.0;
    }
    let sum: f64 = known
        .iter()
        .map(|&(i, v)| {
            let d = spectrum[i] - v;
            d * d
        })
        .sum();
    sum / known.len() as f64
}
