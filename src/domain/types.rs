//! Shared domain types.
//!
//! These are deliberately small value types. Validation happens in the
//! constructors so that the grid, streaming and lookup code can assume
//! well-formed inputs.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

/// Number of geometric design parameters (4 heights, then 4 radii).
pub const GEOMETRY_DIM: usize = 8;

/// Number of points in a predicted/library spectrum.
pub const SPECTRUM_LEN: usize = 300;

/// Axis names in enumeration order (outermost first).
pub const AXIS_NAMES: [&str; GEOMETRY_DIM] = ["h1", "h2", "h3", "h4", "r1", "r2", "r3", "r4"];

/// Inclusive-lower / exclusive-upper range of one parameter axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl FromStr for AxisBounds {
    type Err = String;

    /// Parse `MIN:MAX` (also accepts `MIN..MAX`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once("..")
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| format!("expected MIN:MAX, got '{s}'"))?;
        let min = lo
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid lower bound '{lo}': {e}"))?;
        let max = hi
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid upper bound '{hi}': {e}"))?;
        Ok(Self { min, max })
    }
}

/// Bounds for all 8 axes, positional with [`AXIS_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterBounds(pub [AxisBounds; GEOMETRY_DIM]);

impl ParameterBounds {
    /// Validate and wrap per-axis bounds.
    pub fn new(axes: [AxisBounds; GEOMETRY_DIM]) -> Result<Self, AppError> {
        for (name, b) in AXIS_NAMES.iter().zip(axes.iter()) {
            if !(b.min.is_finite() && b.max.is_finite()) {
                return Err(AppError::new(
                    ErrorKind::InvalidRange,
                    format!("grid: bounds for {name} must be finite (got {}..{}).", b.min, b.max),
                ));
            }
            if b.min >= b.max {
                return Err(AppError::new(
                    ErrorKind::InvalidRange,
                    format!("grid: bounds for {name} require min < max (got {}..{}).", b.min, b.max),
                ));
            }
        }
        Ok(Self(axes))
    }

    /// Same bounds on every axis.
    pub fn uniform(min: f64, max: f64) -> Result<Self, AppError> {
        Self::new([AxisBounds::new(min, max); GEOMETRY_DIM])
    }

    /// Build from CLI values: either one pair (broadcast) or exactly 8.
    pub fn from_values(values: &[AxisBounds]) -> Result<Self, AppError> {
        match values.len() {
            1 => Self::new([values[0]; GEOMETRY_DIM]),
            GEOMETRY_DIM => {
                let mut axes = [values[0]; GEOMETRY_DIM];
                axes.copy_from_slice(values);
                Self::new(axes)
            }
            n => Err(AppError::new(
                ErrorKind::InvalidRange,
                format!("grid: expected 1 or {GEOMETRY_DIM} bound pairs, got {n}."),
            )),
        }
    }

    pub fn axes(&self) -> &[AxisBounds; GEOMETRY_DIM] {
        &self.0
    }
}

/// Step sizes for all 8 axes, positional with [`ParameterBounds`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing(pub [f64; GEOMETRY_DIM]);

impl Spacing {
    pub fn new(steps: [f64; GEOMETRY_DIM]) -> Result<Self, AppError> {
        for (name, &step) in AXIS_NAMES.iter().zip(steps.iter()) {
            if !(step.is_finite() && step > 0.0) {
                return Err(AppError::new(
                    ErrorKind::InvalidRange,
                    format!("grid: spacing for {name} must be finite and > 0 (got {step})."),
                ));
            }
        }
        Ok(Self(steps))
    }

    pub fn uniform(step: f64) -> Result<Self, AppError> {
        Self::new([step; GEOMETRY_DIM])
    }

    /// Build from CLI values: either one step (broadcast) or exactly 8.
    pub fn from_values(values: &[f64]) -> Result<Self, AppError> {
        match values.len() {
            1 => Self::new([values[0]; GEOMETRY_DIM]),
            GEOMETRY_DIM => {
                let mut steps = [0.0; GEOMETRY_DIM];
                steps.copy_from_slice(values);
                Self::new(steps)
            }
            n => Err(AppError::new(
                ErrorKind::InvalidRange,
                format!("grid: expected 1 or {GEOMETRY_DIM} spacings, got {n}."),
            )),
        }
    }

    pub fn steps(&self) -> &[f64; GEOMETRY_DIM] {
        &self.0
    }
}

/// One lattice point: `[h1, h2, h3, h4, r1, r2, r3, r4]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryRecord(pub [f64; GEOMETRY_DIM]);

impl GeometryRecord {
    pub fn values(&self) -> &[f64; GEOMETRY_DIM] {
        &self.0
    }

    pub fn heights(&self) -> &[f64] {
        &self.0[..GEOMETRY_DIM / 2]
    }

    pub fn radii(&self) -> &[f64] {
        &self.0[GEOMETRY_DIM / 2..]
    }
}

/// Round to one decimal, ties to even (the NumPy `round(x, 1)` convention).
pub fn round_1dp(v: f64) -> f64 {
    (v * 10.0).round_ties_even() / 10.0
}

/// Column layout of a geometry-bearing text file.
///
/// Evaluation/feature files carry two leading id columns, grid files carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLayout {
    pub offset: usize,
}

impl GeometryLayout {
    /// Two leading id columns (the evaluation CSV layout).
    pub const WITH_IDS: GeometryLayout = GeometryLayout { offset: 2 };
    /// Geometry starts in the first column (grid and feature files).
    pub const BARE: GeometryLayout = GeometryLayout { offset: 0 };

    pub fn columns(&self) -> Range<usize> {
        self.offset..self.offset + GEOMETRY_DIM
    }
}

impl Default for GeometryLayout {
    fn default() -> Self {
        Self::WITH_IDS
    }
}

/// Half-open column selection `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: usize) -> Result<Self, AppError> {
        if end <= start {
            return Err(AppError::new(
                ErrorKind::InvalidArgument,
                format!("column range {start}..{end} is empty."),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl FromStr for ColumnRange {
    type Err = String;

    /// Parse `START..END` or `START:END` (end exclusive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once("..")
            .or_else(|| s.split_once(':'))
            .ok_or_else(|| format!("expected START..END, got '{s}'"))?;
        let start = lo
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid start column '{lo}': {e}"))?;
        let end = hi
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid end column '{hi}': {e}"))?;
        ColumnRange::new(start, end).map_err(|e| e.message().to_string())
    }
}

/// How grid output files are opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Create the file or append to an existing one.
    Append,
    /// Create the file or truncate an existing one.
    Truncate,
}

/// How much of a spectrum library a lookup examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadWindow {
    Unbounded,
    /// Only the first `n` lines.
    Lines(usize),
}

impl ReadWindow {
    /// The fixed 100-line window of the legacy lookup.
    pub const LEGACY: ReadWindow = ReadWindow::Lines(100);

    pub fn limit(self) -> Option<usize> {
        match self {
            ReadWindow::Unbounded => None,
            ReadWindow::Lines(n) => Some(n),
        }
    }
}

impl Default for ReadWindow {
    fn default() -> Self {
        ReadWindow::Unbounded
    }
}

/// Lookup settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupConfig {
    /// Number of candidates to keep.
    pub k: usize,
    pub window: ReadWindow,
}

/// Stride decimation of label curves: keep the last `window` samples, then
/// every `stride`-th one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimation {
    pub window: usize,
    pub stride: usize,
}

impl Decimation {
    pub fn output_len(&self) -> usize {
        self.window.div_ceil(self.stride)
    }
}

impl Default for Decimation {
    fn default() -> Self {
        Self {
            window: 1800,
            stride: 6,
        }
    }
}

/// A partially specified target spectrum.
///
/// `None` entries are unconstrained and ignored when scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpectrum {
    values: Vec<Option<f64>>,
}

impl TargetSpectrum {
    /// Wrap raw values; at least one entry must be known.
    pub fn new(values: Vec<Option<f64>>) -> Result<Self, AppError> {
        if !values.iter().any(Option::is_some) {
            return Err(AppError::new(
                ErrorKind::InvalidTarget,
                "lookup: target spectrum has no known points.",
            ));
        }
        if let Some((idx, v)) = values
            .iter()
            .enumerate()
            .find_map(|(i, v)| v.filter(|x| !x.is_finite()).map(|x| (i, x)))
        {
            return Err(AppError::new(
                ErrorKind::InvalidTarget,
                format!("lookup: target point {idx} is not finite ({v})."),
            ));
        }
        Ok(Self { values })
    }

    /// Build a target of length `len` from `(index, value)` pairs.
    pub fn from_points(len: usize, points: &[(usize, f64)]) -> Result<Self, AppError> {
        let mut values = vec![None; len];
        for &(idx, value) in points {
            let slot = values.get_mut(idx).ok_or_else(|| {
                AppError::new(
                    ErrorKind::InvalidTarget,
                    format!("lookup: target index {idx} is outside 0..{len}."),
                )
            })?;
            *slot = Some(value);
        }
        Self::new(values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// `(index, value)` for every known point, in index order.
    pub fn known_points(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|x| (i, x)))
            .collect()
    }
}

/// A scored library spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// 0-based line index in the library file.
    pub record: usize,
    pub spectrum: Vec<f64>,
    pub score: f64,
}
