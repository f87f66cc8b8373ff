//! Batch inference over streamed geometries.
//!
//! The network itself lives outside this crate. Anything that can turn a batch
//! of geometries into spectra implements [`SpectrumModel`]; the driver feeds it
//! batches and writes two line-aligned files:
//!
//! - the prediction (library) file: one spectrum per line
//! - the feature file: the geometry that produced it

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::info;

use crate::domain::{GeometryLayout, GeometryRecord};
use crate::error::{AppError, ErrorKind};
use crate::infer::config::ModelConfig;
use crate::io::geometry::{format_geometry, stream_geometries};
use crate::io::library::format_spectrum;

/// A surrogate that predicts spectra from geometries.
pub trait SpectrumModel {
    /// Points per predicted spectrum.
    fn output_len(&self) -> usize;

    /// One spectrum per input geometry, in input order.
    fn predict(&mut self, batch: &[GeometryRecord]) -> Result<Vec<Vec<f64>>, AppError>;
}

/// Output file pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOutput {
    pub predictions: PathBuf,
    pub features: PathBuf,
}

impl InferenceOutput {
    /// `library.csv` and `features.csv` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            predictions: dir.join("library.csv"),
            features: dir.join("features.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSummary {
    pub batches: usize,
    pub records: usize,
    pub elapsed: Duration,
}

/// Run `model` over every batch and write predictions plus features.
pub fn run_inference<M, I>(model: &mut M, batches: I, output: &InferenceOutput) -> Result<InferenceSummary, AppError>
where
    M: SpectrumModel + ?Sized,
    I: IntoIterator<Item = Result<Vec<GeometryRecord>, AppError>>,
{
    let create = |path: &Path| {
        File::create(path).map(BufWriter::new).map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("infer: failed to create '{}': {e}", path.display()),
            )
        })
    };
    let mut pred = create(&output.predictions)?;
    let mut feat = create(&output.features)?;

    let summary = run_inference_to(model, batches, &mut pred, &mut feat)?;

    for (w, path) in [(&mut pred, &output.predictions), (&mut feat, &output.features)] {
        w.flush().map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("infer: failed to flush '{}': {e}", path.display()),
            )
        })?;
    }
    info!(
        records = summary.records,
        predictions = %output.predictions.display(),
        features = %output.features.display(),
        "inference written"
    );
    Ok(summary)
}

/// Run `model` over the geometry files in `paths`, batched the way the
/// checkpoint was trained.
///
/// The model must predict curves of the checkpoint's output length.
pub fn run_inference_with<M>(
    config: &ModelConfig,
    model: &mut M,
    paths: Vec<PathBuf>,
    layout: GeometryLayout,
    output: &InferenceOutput,
) -> Result<InferenceSummary, AppError>
where
    M: SpectrumModel + ?Sized,
{
    config.validate()?;
    if model.output_len() != config.output_len() {
        return Err(AppError::new(
            ErrorKind::Model,
            format!(
                "infer: model predicts {} points but the checkpoint expects {}.",
                model.output_len(),
                config.output_len()
            ),
        ));
    }
    let batches = stream_geometries(paths, layout, config.batch_size)?;
    info!(batch_size = config.batch_size, output_len = config.output_len(), "inference starting");
    run_inference(model, batches, output)
}

/// Writer-level driver; the caller owns flushing.
pub fn run_inference_to<M, I, P, F>(
    model: &mut M,
    batches: I,
    predictions: &mut P,
    features: &mut F,
) -> Result<InferenceSummary, AppError>
where
    M: SpectrumModel + ?Sized,
    I: IntoIterator<Item = Result<Vec<GeometryRecord>, AppError>>,
    P: Write,
    F: Write,
{
    let started = Instant::now();
    let expected_len = model.output_len();
    let mut n_batches = 0usize;
    let mut records = 0usize;

    for batch in batches {
        let batch = batch?;
        let spectra = model.predict(&batch)?;
        if spectra.len() != batch.len() {
            return Err(AppError::new(
                ErrorKind::Model,
                format!(
                    "infer: batch {n_batches}: model returned {} spectra for {} geometries.",
                    spectra.len(),
                    batch.len()
                ),
            ));
        }

        for (row, (geometry, spectrum)) in batch.iter().zip(spectra.iter()).enumerate() {
            if spectrum.len() != expected_len {
                return Err(AppError::new(
                    ErrorKind::Model,
                    format!(
                        "infer: batch {n_batches} row {row}: spectrum has {} points, expected {expected_len}.",
                        spectrum.len()
                    ),
                ));
            }
            writeln!(predictions, "{}", format_spectrum(spectrum))
                .and_then(|_| writeln!(features, "{}", format_geometry(geometry)))
                .map_err(|e| AppError::new(ErrorKind::Io, format!("infer: write failed: {e}")))?;
        }

        n_batches += 1;
        records += batch.len();
        if n_batches % 100 == 0 {
            info!(batches = n_batches, records, "inference progress");
        }
    }

    Ok(InferenceSummary {
        batches: n_batches,
        records,
        elapsed: started.elapsed(),
    })
}
