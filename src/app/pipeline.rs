//! Shared pipeline logic behind each subcommand.
//!
//! Each `run_*` function takes explicit inputs, does the work and returns the
//! computed outputs; printing stays in `app`. Integration tests drive these
//! functions directly.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::data::{DatasetSplits, SplitConfig, SplitSource, downsample_labels};
use crate::domain::{
    ColumnRange, Decimation, GeometryLayout, GeometryRecord, LookupConfig, ParameterBounds, Spacing,
    TargetSpectrum,
};
use crate::error::AppError;
use crate::grid::{GridOptions, GridSummary, generate_grid};
use crate::io::dataset::{ImportOptions, ImportedData, import_dataset};
use crate::io::files::expand_inputs;
use crate::io::geometry::{read_geometries_at, stream_geometries};
use crate::io::library::read_target_file;
use crate::io::manifest::{GridManifest, manifest_path, write_manifest};
use crate::lookup::{LookupResult, lookup};

/// Outputs of a grid run.
#[derive(Debug, Clone)]
pub struct GridRun {
    pub summary: GridSummary,
    /// Sidecar manifest, when one was written.
    pub manifest: Option<PathBuf>,
}

/// Enumerate the lattice and (optionally) record its manifest.
pub fn run_grid(
    bounds: &ParameterBounds,
    spacing: &Spacing,
    out_path: &Path,
    options: &GridOptions,
    with_manifest: bool,
) -> Result<GridRun, AppError> {
    let summary = generate_grid(bounds, spacing, out_path, options)?;
    let manifest = if with_manifest {
        let path = manifest_path(&summary.path);
        write_manifest(&path, &GridManifest::new(bounds, spacing, &summary))?;
        Some(path)
    } else {
        None
    };
    Ok(GridRun { summary, manifest })
}

/// Outputs of a streaming pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRun {
    pub files: Vec<PathBuf>,
    pub batches: usize,
    pub batch_size: usize,
    pub records_read: u64,
    /// First record of the first batch, for a quick look.
    pub first: Option<GeometryRecord>,
}

/// Drain the candidate stream over `inputs` and count what it yields.
pub fn run_stream(inputs: &[PathBuf], layout: GeometryLayout, batch_size: usize) -> Result<StreamRun, AppError> {
    let files = expand_inputs(inputs)?;
    let mut stream = stream_geometries(files.clone(), layout, batch_size)?;

    let mut batches = 0usize;
    let mut first = None;
    for batch in stream.by_ref() {
        let batch = batch?;
        if first.is_none() {
            first = batch.first().copied();
        }
        batches += 1;
    }
    info!(batches, records = stream.records_read(), "stream finished");

    Ok(StreamRun {
        files,
        batches,
        batch_size: stream.batch_size(),
        records_read: stream.records_read(),
        first,
    })
}

/// Outputs of a dataset import.
#[derive(Debug)]
pub struct ImportRun {
    /// Training directory contents (labels already decimated).
    pub data: ImportedData,
    pub splits: DatasetSplits,
}

/// Import `directory`, decimate labels and assemble train/validation splits.
///
/// Both directories are cut to the same `y_range`, so an eval directory always
/// decimates to the training label width.
pub fn run_import(
    directory: &Path,
    x_range: ColumnRange,
    y_range: ColumnRange,
    options: ImportOptions,
    decimation: Option<Decimation>,
    config: &SplitConfig,
) -> Result<ImportRun, AppError> {
    let load = |dir: &Path| -> Result<ImportedData, AppError> {
        let mut data = import_dataset(dir, x_range, y_range, options)?;
        if let Some(d) = decimation {
            data.labels = downsample_labels(&data.labels, d)?;
        }
        Ok(data)
    };

    let data = load(directory)?;
    let train = (data.features.clone(), data.labels.clone());
    let splits = match &config.source {
        SplitSource::Fraction(_) => DatasetSplits::new(train.0, train.1, config)?,
        SplitSource::EvalDirectory(eval) => {
            let valid = load(eval)?;
            DatasetSplits::from_parts(train, (valid.features, valid.labels), config)?
        }
    };
    Ok(ImportRun { data, splits })
}

/// Where a lookup target comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSource {
    File(PathBuf),
    Points(Vec<(usize, f64)>),
}

impl TargetSource {
    pub fn load(&self, spectrum_len: usize) -> Result<TargetSpectrum, AppError> {
        match self {
            TargetSource::File(path) => read_target_file(path, spectrum_len),
            TargetSource::Points(points) => TargetSpectrum::from_points(spectrum_len, points),
        }
    }
}

/// Outputs of a lookup.
#[derive(Debug, Clone)]
pub struct LookupRun {
    pub result: LookupResult,
    /// Positional with `result.candidates` when a feature file was given.
    pub geometries: Option<Vec<GeometryRecord>>,
}

/// Rank library spectra against a target and attach candidate geometry.
///
/// The feature file is the one written next to the library by the inference
/// driver (geometry in the first eight columns).
pub fn run_lookup(
    target: &TargetSpectrum,
    library: &Path,
    features: Option<&Path>,
    config: &LookupConfig,
) -> Result<LookupRun, AppError> {
    let result = lookup(target, library, config)?;
    let geometries = match features {
        Some(path) => {
            let records: Vec<usize> = result.candidates.iter().map(|c| c.record).collect();
            Some(read_geometries_at(path, GeometryLayout::BARE, &records)?)
        }
        None => None,
    };
    Ok(LookupRun { result, geometries })
}
