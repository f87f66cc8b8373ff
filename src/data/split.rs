//! Train/validation assembly.
//!
//! Pipeline shape:
//!
//! - train: shuffle (bounded buffer, seeded) → repeat forever → batch
//! - valid: file order → batch
//!
//! Both drop a trailing partial batch. Batches are built from row indices so
//! the underlying matrices are shared, not copied per epoch.

use std::path::PathBuf;
use std::sync::Arc;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::info;

use crate::data::stream::{StreamExt, repeat_epochs};
use crate::error::{AppError, ErrorKind};

/// Where validation rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitSource {
    /// The first `floor(f * n)` rows train, the rest validate.
    Fraction(f64),
    /// Validation rows are imported from a separate directory.
    EvalDirectory(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub source: SplitSource,
    pub batch_size: usize,
    pub shuffle_buffer: usize,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            source: SplitSource::Fraction(0.8),
            batch_size: 100,
            shuffle_buffer: 100,
            seed: 1234,
        }
    }
}

/// One training/validation batch, one row per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub features: DMatrix<f32>,
    pub labels: DMatrix<f32>,
}

#[derive(Debug)]
struct Part {
    features: DMatrix<f32>,
    labels: DMatrix<f32>,
}

impl Part {
    fn new(features: DMatrix<f32>, labels: DMatrix<f32>) -> Result<Self, AppError> {
        if features.nrows() != labels.nrows() {
            return Err(AppError::new(
                ErrorKind::SchemaMismatch,
                format!(
                    "split: {} feature rows but {} label rows.",
                    features.nrows(),
                    labels.nrows()
                ),
            ));
        }
        Ok(Self { features, labels })
    }

    fn len(&self) -> usize {
        self.features.nrows()
    }

    fn gather(&self, rows: &[usize]) -> Batch {
        Batch {
            features: self.features.select_rows(rows.iter()),
            labels: self.labels.select_rows(rows.iter()),
        }
    }
}

/// Batches assembled on demand from a shared split.
pub struct BatchStream {
    part: Arc<Part>,
    indices: Box<dyn Iterator<Item = Vec<usize>> + Send>,
}

impl Iterator for BatchStream {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        let rows = self.indices.next()?;
        Some(self.part.gather(&rows))
    }
}

/// Train and validation partitions plus the batching parameters.
#[derive(Debug)]
pub struct DatasetSplits {
    train: Arc<Part>,
    valid: Arc<Part>,
    batch_size: usize,
    shuffle_buffer: usize,
    seed: u64,
}

impl DatasetSplits {
    /// Split one dataset by `config.source`, which must be a fraction.
    pub fn new(features: DMatrix<f32>, labels: DMatrix<f32>, config: &SplitConfig) -> Result<Self, AppError> {
        let SplitSource::Fraction(fraction) = config.source else {
            return Err(AppError::new(
                ErrorKind::InvalidArgument,
                "split: an evaluation directory needs `from_parts` with the imported rows.",
            ));
        };
        check_batching(config)?;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(AppError::new(
                ErrorKind::InvalidArgument,
                format!("split: train fraction must be in (0, 1], got {fraction}."),
            ));
        }
        let all = Part::new(features, labels)?;
        let n = all.len();
        let n_train = (fraction * n as f64).floor() as usize;
        if n_train == 0 {
            return Err(AppError::new(
                ErrorKind::EmptyDataset,
                format!("split: {n} row(s) leave no training rows at fraction {fraction}."),
            ));
        }

        let train = Part {
            features: all.features.rows(0, n_train).into_owned(),
            labels: all.labels.rows(0, n_train).into_owned(),
        };
        let valid = Part {
            features: all.features.rows(n_train, n - n_train).into_owned(),
            labels: all.labels.rows(n_train, n - n_train).into_owned(),
        };
        Ok(Self::assemble(train, valid, config))
    }

    /// Use explicit train and validation rows.
    pub fn from_parts(
        train: (DMatrix<f32>, DMatrix<f32>),
        valid: (DMatrix<f32>, DMatrix<f32>),
        config: &SplitConfig,
    ) -> Result<Self, AppError> {
        check_batching(config)?;
        let train = Part::new(train.0, train.1)?;
        let valid = Part::new(valid.0, valid.1)?;
        if train.len() == 0 {
            return Err(AppError::new(ErrorKind::EmptyDataset, "split: no training rows."));
        }
        if train.features.ncols() != valid.features.ncols() || train.labels.ncols() != valid.labels.ncols() {
            return Err(AppError::new(
                ErrorKind::SchemaMismatch,
                format!(
                    "split: train rows are {}+{} columns, validation rows are {}+{}.",
                    train.features.ncols(),
                    train.labels.ncols(),
                    valid.features.ncols(),
                    valid.labels.ncols()
                ),
            ));
        }
        Ok(Self::assemble(train, valid, config))
    }

    fn assemble(train: Part, valid: Part, config: &SplitConfig) -> Self {
        info!(
            train = train.len(),
            valid = valid.len(),
            batch_size = config.batch_size,
            "dataset split"
        );
        Self {
            train: Arc::new(train),
            valid: Arc::new(valid),
            batch_size: config.batch_size,
            shuffle_buffer: config.shuffle_buffer,
            seed: config.seed,
        }
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn valid_len(&self) -> usize {
        self.valid.len()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Endless shuffled training batches. Every call restarts from the seed.
    pub fn train_batches(&self) -> BatchStream {
        let n = self.train.len();
        let buffer = self.shuffle_buffer;
        let mut epoch_seeds = StdRng::seed_from_u64(self.seed);
        let indices = repeat_epochs(move |_| {
            let rng = StdRng::seed_from_u64(epoch_seeds.next_u64());
            (0..n).shuffled(buffer, rng)
        })
        .batched(self.batch_size);
        BatchStream {
            part: Arc::clone(&self.train),
            indices: Box::new(indices),
        }
    }

    /// One pass over the validation rows in order.
    pub fn valid_batches(&self) -> BatchStream {
        let indices = (0..self.valid.len()).batched(self.batch_size);
        BatchStream {
            part: Arc::clone(&self.valid),
            indices: Box::new(indices),
        }
    }
}

fn check_batching(config: &SplitConfig) -> Result<(), AppError> {
    if config.batch_size == 0 {
        return Err(AppError::new(
            ErrorKind::InvalidArgument,
            "split: batch size must be > 0.",
        ));
    }
    Ok(())
}
