//! Command-line parsing for the nanostructure spectrum tools.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! grid/lookup/dataset code. Each subcommand's args convert into the explicit
//! config structs the library takes.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::{SplitConfig, SplitSource};
use crate::domain::{
    AxisBounds, ColumnRange, Decimation, GeometryLayout, LookupConfig, ParameterBounds, ReadWindow,
    SPECTRUM_LEN, Spacing, WriteMode,
};
use crate::error::{AppError, ErrorKind};
use crate::io::dataset::ImportOptions;
use crate::io::library::parse_point;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "nspec", version, about = "Nanostructure geometry grids, datasets and spectrum lookup")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enumerate the geometry lattice into a grid CSV.
    GenerateGrid(GridArgs),
    /// Stream candidate geometries in fixed-size batches and report the counts.
    StreamCandidates(StreamArgs),
    /// Import a training dataset directory, decimate labels and build splits.
    ImportDataset(ImportArgs),
    /// Find the library spectra closest to a partially known target.
    Lookup(LookupArgs),
    /// Append ratio features (r_i / h_j) to every CSV in a directory.
    Augment(AugmentArgs),
}

/// Options for `nspec generate-grid`.
#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    /// Output file, or a directory (writes `<dir>/grid.csv`).
    #[arg(short = 'o', long, env = "NSPEC_GRID", value_name = "PATH")]
    pub out: PathBuf,

    /// Bounds as MIN:MAX; one value for every axis or eight (h1..h4, r1..r4).
    #[arg(short = 'b', long, value_delimiter = ',', required = true)]
    pub bounds: Vec<AxisBounds>,

    /// Step per axis; one value for every axis or eight.
    #[arg(short = 's', long, value_delimiter = ',', required = true)]
    pub spacing: Vec<f64>,

    /// Truncate an existing grid file instead of appending to it.
    #[arg(long)]
    pub overwrite: bool,

    /// Skip the JSON manifest written next to the grid.
    #[arg(long)]
    pub no_manifest: bool,
}

impl GridArgs {
    pub fn bounds(&self) -> Result<ParameterBounds, AppError> {
        ParameterBounds::from_values(&self.bounds)
    }

    pub fn spacing(&self) -> Result<Spacing, AppError> {
        Spacing::from_values(&self.spacing)
    }

    pub fn mode(&self) -> WriteMode {
        if self.overwrite {
            WriteMode::Truncate
        } else {
            WriteMode::Append
        }
    }
}

/// Options for `nspec stream-candidates`.
#[derive(Debug, Args, Clone)]
pub struct StreamArgs {
    /// Files or directories (directories expand to their sorted `*.csv`).
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Leading id columns before the geometry (2 for evaluation CSVs, 0 for grids).
    #[arg(long, default_value_t = GeometryLayout::WITH_IDS.offset)]
    pub offset: usize,

    /// Records per batch.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub batch_size: usize,
}

impl StreamArgs {
    pub fn layout(&self) -> GeometryLayout {
        GeometryLayout { offset: self.offset }
    }
}

/// Options for `nspec import-dataset`.
#[derive(Debug, Args, Clone)]
pub struct ImportArgs {
    /// Directory of training CSVs.
    #[arg(long, env = "NSPEC_DATA_DIR", value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Feature columns, START..END (end exclusive).
    #[arg(long, default_value = "2..10")]
    pub x_range: ColumnRange,

    /// Label columns, START..END (end exclusive).
    #[arg(long, default_value = "10..2010")]
    pub y_range: ColumnRange,

    /// The CSVs have no header row.
    #[arg(long)]
    pub no_header: bool,

    /// Keep labels as imported (no stride decimation).
    #[arg(long)]
    pub no_decimate: bool,

    /// Decimation window: trailing label samples kept before striding.
    #[arg(long, default_value_t = Decimation::default().window)]
    pub window: usize,

    /// Decimation stride.
    #[arg(long, default_value_t = Decimation::default().stride)]
    pub stride: usize,

    /// Fraction of rows used for training (rest is validation).
    #[arg(long, default_value_t = 0.8, conflicts_with = "eval_dir")]
    pub train_fraction: f64,

    /// Separate validation directory instead of a fractional split.
    #[arg(long, value_name = "DIR")]
    pub eval_dir: Option<PathBuf>,

    /// Batch size.
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Shuffle buffer size.
    #[arg(long, default_value_t = 100)]
    pub shuffle_buffer: usize,

    /// Shuffle seed.
    #[arg(long, default_value_t = 1234)]
    pub seed: u64,
}

impl ImportArgs {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            has_header: !self.no_header,
        }
    }

    pub fn decimation(&self) -> Option<Decimation> {
        (!self.no_decimate).then_some(Decimation {
            window: self.window,
            stride: self.stride,
        })
    }

    pub fn split_config(&self) -> SplitConfig {
        let source = match &self.eval_dir {
            Some(dir) => SplitSource::EvalDirectory(dir.clone()),
            None => SplitSource::Fraction(self.train_fraction),
        };
        SplitConfig {
            source,
            batch_size: self.batch_size,
            shuffle_buffer: self.shuffle_buffer,
            seed: self.seed,
        }
    }
}

/// Options for `nspec lookup`.
#[derive(Debug, Args, Clone)]
pub struct LookupArgs {
    /// Spectrum library (one spectrum per line).
    #[arg(short = 'l', long, env = "NSPEC_LIBRARY", value_name = "CSV")]
    pub library: PathBuf,

    /// Target file: comma or newline separated, `_`/`none`/`nan` are unconstrained.
    #[arg(short = 't', long, value_name = "FILE")]
    pub target: Option<PathBuf>,

    /// Known target point as INDEX=VALUE (repeatable).
    #[arg(short = 'p', long = "point", value_parser = parse_point, value_name = "IDX=VAL")]
    pub points: Vec<(usize, f64)>,

    /// Spectrum length.
    #[arg(long, default_value_t = SPECTRUM_LEN)]
    pub spectrum_len: usize,

    /// Number of candidates to keep.
    #[arg(short = 'k', long, default_value_t = 10)]
    pub top: usize,

    /// Only scan the first 100 library lines.
    #[arg(long)]
    pub legacy_window: bool,

    /// Only scan the first N library lines.
    #[arg(long, value_name = "N", conflicts_with = "legacy_window")]
    pub max_lines: Option<usize>,

    /// Feature file positionally tied to the library; adds geometry to the report.
    #[arg(long, value_name = "CSV")]
    pub features: Option<PathBuf>,

    /// Export ranked candidates to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Render an ASCII plot of the target and candidates.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

impl LookupArgs {
    pub fn config(&self) -> LookupConfig {
        let window = match (self.legacy_window, self.max_lines) {
            (true, _) => ReadWindow::LEGACY,
            (false, Some(n)) => ReadWindow::Lines(n),
            (false, None) => ReadWindow::Unbounded,
        };
        LookupConfig {
            k: self.top,
            window,
        }
    }

    /// Check that exactly one target source was given.
    pub fn validate_target_source(&self) -> Result<(), AppError> {
        match (&self.target, self.points.is_empty()) {
            (Some(_), false) => Err(AppError::new(
                ErrorKind::InvalidArgument,
                "lookup: use either --target or --point, not both.",
            )),
            (None, true) => Err(AppError::new(
                ErrorKind::InvalidArgument,
                "lookup: a target is required (--target FILE or --point IDX=VAL).",
            )),
            _ => Ok(()),
        }
    }
}

/// Options for `nspec augment`.
#[derive(Debug, Args, Clone)]
pub struct AugmentArgs {
    /// Directory of headerless CSVs.
    #[arg(long, env = "NSPEC_DATA_DIR", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Output directory (files get a `_div01` suffix).
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Leading id columns before the geometry.
    #[arg(long, default_value_t = GeometryLayout::WITH_IDS.offset)]
    pub offset: usize,
}
