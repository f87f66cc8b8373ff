//! Label curve decimation.
//!
//! Simulated spectra come at a much finer resolution than the network predicts.
//! We keep the trailing `window` samples (dropping the head so the length is a
//! multiple of the stride) and then take every `stride`-th sample. This is plain
//! decimation: no anti-alias filtering.

use nalgebra::DMatrix;

use crate::domain::Decimation;
use crate::error::{AppError, ErrorKind};

fn check(decimation: Decimation) -> Result<(), AppError> {
    if decimation.window == 0 || decimation.stride == 0 {
        return Err(AppError::new(
            ErrorKind::InvalidArgument,
            format!(
                "resample: window and stride must be > 0 (got window={}, stride={}).",
                decimation.window, decimation.stride
            ),
        ));
    }
    Ok(())
}

/// Decimate one curve: `curve[len - window :: stride]`.
pub fn downsample_curve<T: Copy>(curve: &[T], decimation: Decimation) -> Result<Vec<T>, AppError> {
    check(decimation)?;
    let start = curve.len().checked_sub(decimation.window).ok_or_else(|| {
        AppError::new(
            ErrorKind::SchemaMismatch,
            format!(
                "resample: curve has {} samples, fewer than the {}-sample window.",
                curve.len(),
                decimation.window
            ),
        )
    })?;
    Ok(curve[start..].iter().copied().step_by(decimation.stride).collect())
}

/// Decimate every row of a label matrix.
pub fn downsample_labels(labels: &DMatrix<f32>, decimation: Decimation) -> Result<DMatrix<f32>, AppError> {
    check(decimation)?;
    let ncols = labels.ncols();
    let start = ncols.checked_sub(decimation.window).ok_or_else(|| {
        AppError::new(
            ErrorKind::SchemaMismatch,
            format!(
                "resample: labels have {ncols} columns, fewer than the {}-sample window.",
                decimation.window
            ),
        )
    })?;
    let keep: Vec<usize> = (start..ncols).step_by(decimation.stride).collect();
    Ok(labels.select_columns(keep.iter()))
}
