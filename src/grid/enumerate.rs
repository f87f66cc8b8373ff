//! Streaming enumeration of the 8-D parameter lattice.
//!
//! The grid can easily run to hundreds of millions of records, so it is never
//! materialized: each record is formatted and pushed straight through a
//! buffered writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::domain::{AXIS_NAMES, GEOMETRY_DIM, ParameterBounds, Spacing, WriteMode, round_1dp};
use crate::error::{AppError, ErrorKind};
use crate::grid::axis::{AxisRange, grid_axes, record_count};

/// File name used when the output path is a directory.
pub const GRID_FILE_NAME: &str = "grid.csv";

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct GridOptions {
    pub mode: WriteMode,
    pub cancel: Option<CancelToken>,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            mode: WriteMode::Append,
            cancel: None,
        }
    }
}

/// What a grid run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSummary {
    pub path: PathBuf,
    pub axis_counts: [usize; GEOMETRY_DIM],
    pub records: u64,
    pub mode: WriteMode,
    pub elapsed: Duration,
}

/// Resolve the grid file path (`<dir>/grid.csv` for directories).
pub fn resolve_grid_path(out_path: &Path) -> PathBuf {
    if out_path.is_dir() {
        out_path.join(GRID_FILE_NAME)
    } else {
        out_path.to_path_buf()
    }
}

/// A validated lattice: axes, their counts and the total record count.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlan {
    pub axes: [AxisRange; GEOMETRY_DIM],
    pub counts: [usize; GEOMETRY_DIM],
    pub records: u64,
}

impl GridPlan {
    /// Fails with `InvalidRange` if an axis or the record count is too large.
    pub fn new(bounds: &ParameterBounds, spacing: &Spacing) -> Result<Self, AppError> {
        let axes = grid_axes(bounds, spacing)?;
        let counts = axes.map(|a| a.len);
        let records = record_count(&counts)?;
        Ok(Self { axes, counts, records })
    }
}

/// Enumerate the lattice described by `bounds` and `spacing` into `out_path`.
///
/// The lattice is validated before the output file is opened, so a rejected
/// run never truncates an existing grid.
pub fn generate_grid(
    bounds: &ParameterBounds,
    spacing: &Spacing,
    out_path: &Path,
    options: &GridOptions,
) -> Result<GridSummary, AppError> {
    let plan = GridPlan::new(bounds, spacing)?;
    let path = resolve_grid_path(out_path);
    let file = open_grid_file(&path, options.mode)?;
    let mut writer = BufWriter::new(file);

    let started = Instant::now();
    let result = write_plan(&plan, &mut writer, options.cancel.as_ref());

    // Flush whatever was written, including on cancellation.
    writer.flush().map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("grid: failed to flush '{}': {e}", path.display()),
        )
    })?;
    let (axis_counts, records) = result.map_err(|e| match e.kind() {
        ErrorKind::Io => AppError::new(
            ErrorKind::Io,
            format!("{} (file '{}')", e.message(), path.display()),
        ),
        _ => e,
    })?;

    let elapsed = started.elapsed();
    info!(
        path = %path.display(),
        records,
        secs = elapsed.as_secs_f64(),
        "grid written"
    );

    Ok(GridSummary {
        path,
        axis_counts,
        records,
        mode: options.mode,
        elapsed,
    })
}

fn open_grid_file(path: &Path, mode: WriteMode) -> Result<File, AppError> {
    let mut opts = OpenOptions::new();
    match mode {
        WriteMode::Append => opts.create(true).append(true),
        WriteMode::Truncate => opts.create(true).write(true).truncate(true),
    };
    opts.open(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("grid: failed to open '{}': {e}", path.display()),
        )
    })
}

/// Write every lattice point to `writer`, h1 outermost, r4 innermost.
///
/// Returns the per-axis counts and the number of records written. The caller
/// owns flushing.
pub fn write_grid<W: Write>(
    bounds: &ParameterBounds,
    spacing: &Spacing,
    writer: &mut W,
    cancel: Option<&CancelToken>,
) -> Result<([usize; GEOMETRY_DIM], u64), AppError> {
    let plan = GridPlan::new(bounds, spacing)?;
    write_plan(&plan, writer, cancel)
}

fn write_plan<W: Write>(
    plan: &GridPlan,
    writer: &mut W,
    cancel: Option<&CancelToken>,
) -> Result<([usize; GEOMETRY_DIM], u64), AppError> {
    let expected = plan.records;
    for (name, axis) in AXIS_NAMES.iter().zip(plan.axes.iter()) {
        let head: Vec<f64> = axis.values().take(16).map(round_1dp).collect();
        debug!(axis = *name, count = axis.len, delta = axis.delta, values = ?head, "axis values");
    }
    info!(counts = ?plan.counts, expected, "enumerating grid");

    let started = Instant::now();
    let mut written: u64 = 0;
    let mut line = String::with_capacity(GEOMETRY_DIM * 8);
    let [a1, a2, a3, tail @ ..] = &plan.axes;

    for h1 in a1.values().map(round_1dp) {
        for h2 in a2.values().map(round_1dp) {
            info!(
                h1,
                h2,
                written,
                secs = started.elapsed().as_secs_f64(),
                "grid progress"
            );
            for h3 in a3.values().map(round_1dp) {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Err(AppError::new(
                        ErrorKind::Cancelled,
                        format!("grid: cancelled after {written} of {expected} records."),
                    ));
                }
                written += write_block([h1, h2, h3], tail, &mut line, writer)?;
            }
        }
    }

    Ok((plan.counts, written))
}

/// Write the Cartesian product of `tail` prefixed by `head`.
fn write_block<W: Write>(
    head: [f64; 3],
    tail: &[AxisRange],
    line: &mut String,
    writer: &mut W,
) -> Result<u64, AppError> {
    if tail.iter().any(|a| a.len == 0) {
        return Ok(0);
    }

    // Odometer over the remaining axes; the last axis turns fastest.
    let mut idx = vec![0usize; tail.len()];
    let mut written = 0u64;
    loop {
        line.clear();
        let rest = idx.iter().zip(tail).map(|(&i, axis)| round_1dp(axis.value(i)));
        for v in head.iter().copied().chain(rest) {
            if !line.is_empty() {
                line.push(',');
            }
            push_value(line, v);
        }
        line.push('\n');
        writer.write_all(line.as_bytes()).map_err(|e| {
            AppError::new(ErrorKind::Io, format!("grid: failed to write record: {e}"))
        })?;
        written += 1;

        let mut axis = tail.len();
        loop {
            if axis == 0 {
                return Ok(written);
            }
            axis -= 1;
            idx[axis] += 1;
            if idx[axis] < tail[axis].len {
                break;
            }
            idx[axis] = 0;
        }
    }
}

fn push_value(line: &mut String, v: f64) {
    use std::fmt::Write as _;
    // Writing into a String cannot fail.
    let _ = write!(line, "{v:.1}");
}
