//! Grid sidecar manifest (`<grid>.json`).
//!
//! Records how a grid file was produced so a later run (or a human) can tell
//! which lattice a library was predicted over.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AXIS_NAMES, ParameterBounds, Spacing, WriteMode};
use crate::error::{AppError, ErrorKind};
use crate::grid::GridSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisEntry {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridManifest {
    pub tool: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub grid_file: PathBuf,
    pub axes: Vec<AxisEntry>,
    /// Records written by this run (not the file's total in append mode).
    pub records: u64,
    pub mode: WriteMode,
}

impl GridManifest {
    pub fn new(bounds: &ParameterBounds, spacing: &Spacing, summary: &GridSummary) -> Self {
        let axes = AXIS_NAMES
            .iter()
            .zip(bounds.axes().iter())
            .zip(spacing.steps().iter())
            .zip(summary.axis_counts.iter())
            .map(|(((name, b), &step), &count)| AxisEntry {
                name: (*name).to_string(),
                min: b.min,
                max: b.max,
                step,
                count,
            })
            .collect();
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
            grid_file: summary.path.clone(),
            axes,
            records: summary.records,
            mode: summary.mode,
        }
    }
}

/// Sidecar path for a grid file: same stem, `.json` extension.
pub fn manifest_path(grid_path: &Path) -> PathBuf {
    grid_path.with_extension("json")
}

pub fn write_manifest(path: &Path, manifest: &GridManifest) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create manifest '{}': {e}", path.display()),
        )
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, manifest).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to write manifest '{}': {e}", path.display()),
        )
    })?;
    writeln!(writer)
        .and_then(|_| writer.flush())
        .map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("Failed to write manifest '{}': {e}", path.display()),
            )
        })
}

pub fn read_manifest(path: &Path) -> Result<GridManifest, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to open manifest '{}': {e}", path.display()),
        )
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        AppError::new(
            ErrorKind::MalformedRecord,
            format!("Failed to parse manifest '{}': {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn manifest_lists_axes_in_order() {
        let bounds = ParameterBounds::uniform(0.0, 2.0).unwrap();
        let spacing = Spacing::uniform(1.0).unwrap();
        let summary = GridSummary {
            path: PathBuf::from("out/grid.csv"),
            axis_counts: [2; 8],
            records: 256,
            mode: WriteMode::Append,
            elapsed: Duration::from_millis(5),
        };
        let m = GridManifest::new(&bounds, &spacing, &summary);
        let names: Vec<_> = m.axes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, AXIS_NAMES.to_vec());
        assert_eq!(m.records, 256);

        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"mode\":\"append\""));
        let back: GridManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn sidecar_sits_next_to_grid() {
        assert_eq!(manifest_path(Path::new("out/grid.csv")), PathBuf::from("out/grid.json"));
    }
}
