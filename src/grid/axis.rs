//! Per-axis value generation.
//!
//! Values follow NumPy `arange` exactly, so grids line up with files produced by
//! the training tooling:
//!
//! - `n = ceil((max - min) / step)`
//! - `delta = (min + step) - min`
//! - `v_i = min + i * delta`
//!
//! The upper bound is exclusive. Values are computed on demand; an axis is
//! never materialized.

use crate::domain::{AXIS_NAMES, AxisBounds, GEOMETRY_DIM, ParameterBounds, Spacing};
use crate::error::{AppError, ErrorKind};

/// Longest axis accepted. Indices up to 2^53 are exact in `f64`.
pub const MAX_AXIS_LEN: u64 = 1 << 53;

/// Number of values `arange(min, max, step)` produces, or `None` if the count
/// is not finite or exceeds [`MAX_AXIS_LEN`].
pub fn arange_len(min: f64, max: f64, step: f64) -> Option<u64> {
    let n = ((max - min) / step).ceil();
    if !n.is_finite() || n > MAX_AXIS_LEN as f64 {
        return None;
    }
    Some(if n > 0.0 { n as u64 } else { 0 })
}

/// One axis of the lattice: `len` values starting at `min`, `delta` apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub delta: f64,
    pub len: usize,
}

impl AxisRange {
    /// `arange(bounds.min, bounds.max, step)`; `None` if the axis is too long.
    pub fn new(bounds: AxisBounds, step: f64) -> Option<Self> {
        let len = arange_len(bounds.min, bounds.max, step)?;
        Some(Self {
            min: bounds.min,
            delta: (bounds.min + step) - bounds.min,
            len: usize::try_from(len).ok()?,
        })
    }

    /// The `i`-th value (unrounded).
    pub fn value(&self, i: usize) -> f64 {
        self.min + i as f64 * self.delta
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(|i| self.value(i))
    }
}

/// All 8 axes in enumeration order. Fails with `InvalidRange` naming the first
/// axis that is too long to enumerate.
pub fn grid_axes(bounds: &ParameterBounds, spacing: &Spacing) -> Result<[AxisRange; GEOMETRY_DIM], AppError> {
    let mut axes = [AxisRange {
        min: 0.0,
        delta: 0.0,
        len: 0,
    }; GEOMETRY_DIM];
    for (i, (b, &step)) in bounds.axes().iter().zip(spacing.steps().iter()).enumerate() {
        axes[i] = AxisRange::new(*b, step).ok_or_else(|| {
            AppError::new(
                ErrorKind::InvalidRange,
                format!(
                    "grid: axis {} ({}..{} step {step}) has more than {MAX_AXIS_LEN} values.",
                    AXIS_NAMES[i], b.min, b.max
                ),
            )
        })?;
    }
    Ok(axes)
}

/// Product of the per-axis counts.
///
/// Returns `InvalidRange` if the product does not fit in a `u64`.
pub fn record_count(counts: &[usize; GEOMETRY_DIM]) -> Result<u64, AppError> {
    let mut total: u128 = 1;
    for &c in counts {
        total = total.checked_mul(c as u128).ok_or_else(overflow)?;
    }
    u64::try_from(total).map_err(|_| overflow())
}

fn overflow() -> AppError {
    AppError::new(ErrorKind::InvalidRange, "grid: record count overflows u64.")
}
