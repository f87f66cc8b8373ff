//! Ratio feature augmentation.
//!
//! For each raw CSV, insert the 16 radius/height ratios `r_j / h_i` (heights in
//! the outer loop, radii inner) between the geometry and the spectrum columns,
//! and write the result as `<stem>_div01.csv` in the output directory.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::info;

use crate::domain::{GEOMETRY_DIM, GeometryLayout};
use crate::error::{AppError, ErrorKind};
use crate::io::files::list_csv_files;

/// Number of ratio columns added per row.
pub const RATIO_COLUMNS: usize = (GEOMETRY_DIM / 2) * (GEOMETRY_DIM / 2);

/// Suffix appended to the input file stem.
pub const OUTPUT_SUFFIX: &str = "_div01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
}

/// `r_j / h_i` for every height `i` and radius `j`.
pub fn ratio_columns(geometry: &[f64]) -> Vec<f64> {
    let (heights, radii) = geometry.split_at(GEOMETRY_DIM / 2);
    heights
        .iter()
        .flat_map(|h| radii.iter().map(move |r| r / h))
        .collect()
}

/// Augment every CSV in `input_dir` into `output_dir`, one file per task.
///
/// Output files are opened in append mode. Inputs have no header row.
pub fn add_ratio_columns(
    input_dir: &Path,
    output_dir: &Path,
    layout: GeometryLayout,
) -> Result<Vec<AugmentedFile>, AppError> {
    let files = list_csv_files(input_dir)?;
    if files.is_empty() {
        return Err(AppError::new(
            ErrorKind::EmptyDataset,
            format!("augment: no .csv files in '{}'", input_dir.display()),
        ));
    }
    std::fs::create_dir_all(output_dir).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("augment: failed to create '{}': {e}", output_dir.display()),
        )
    })?;

    files
        .par_iter()
        .map(|input| -> Result<AugmentedFile, AppError> {
            let output = output_path(input, output_dir);
            let rows = augment_file(input, &output, layout)?;
            info!(input = %input.display(), output = %output.display(), rows, "augmented");
            Ok(AugmentedFile {
                input: input.clone(),
                output,
                rows,
            })
        })
        .collect()
}

fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}{OUTPUT_SUFFIX}.csv"))
}

fn augment_file(input: &Path, output: &Path, layout: GeometryLayout) -> Result<usize, AppError> {
    let source = File::open(input).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("augment: failed to open '{}': {e}", input.display()),
        )
    })?;
    let sink = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output)
        .map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("augment: failed to open '{}': {e}", output.display()),
            )
        })?;
    let mut writer = BufWriter::new(sink);
    let rows = augment_rows(source, &mut writer, &input.display().to_string(), layout)?;
    writer.flush().map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("augment: failed to write '{}': {e}", output.display()),
        )
    })?;
    Ok(rows)
}

fn augment_rows<R: std::io::Read, W: Write>(
    source: R,
    out: &mut W,
    name: &str,
    layout: GeometryLayout,
) -> Result<usize, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let geometry_end = layout.columns().end;
    let mut rows = 0usize;
    let mut values: Vec<f64> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record = result.map_err(|e| {
            AppError::new(
                ErrorKind::MalformedRecord,
                format!("augment: '{name}' line {line}: CSV parse error: {e}"),
            )
        })?;
        if record.len() < geometry_end {
            return Err(AppError::new(
                ErrorKind::SchemaMismatch,
                format!(
                    "augment: '{name}' line {line}: row has {} column(s), geometry ends at column {geometry_end}.",
                    record.len()
                ),
            ));
        }

        values.clear();
        for (col, raw) in record.iter().enumerate() {
            let v = raw.parse::<f64>().map_err(|e| {
                AppError::new(
                    ErrorKind::MalformedRecord,
                    format!("augment: '{name}' line {line} column {col}: '{raw}' is not a number: {e}"),
                )
            })?;
            values.push(v);
        }

        let ratios = ratio_columns(&values[layout.columns()]);
        let row = values[..geometry_end]
            .iter()
            .chain(ratios.iter())
            .chain(values[geometry_end..].iter())
            .map(|v| format!("{v:.6}"))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{row}").map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("augment: failed to write row for '{name}' line {line}: {e}"),
            )
        })?;
        rows += 1;
    }
    Ok(rows)
}
