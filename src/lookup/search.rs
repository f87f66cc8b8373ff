//! Library scan.

use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::domain::{Candidate, LookupConfig, TargetSpectrum};
use crate::error::{AppError, ErrorKind};
use crate::io::library::LibraryReader;
use crate::lookup::score::masked_mse;
use crate::lookup::topk::CandidateSet;

#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    /// Best first.
    pub candidates: Vec<Candidate>,
    /// `(index, value)` of every known target point.
    pub key_points: Vec<(usize, f64)>,
    pub records_scanned: usize,
    pub elapsed: Duration,
}

fn validate(target: &TargetSpectrum, config: &LookupConfig) -> Result<Vec<(usize, f64)>, AppError> {
    let key_points = target.known_points();
    if key_points.is_empty() {
        return Err(AppError::new(
            ErrorKind::InvalidTarget,
            "lookup: target spectrum has no known points.",
        ));
    }
    if config.k == 0 {
        return Err(AppError::new(ErrorKind::InvalidArgument, "lookup: k must be > 0."));
    }
    Ok(key_points)
}

/// Find the `config.k` library spectra closest to `target`.
pub fn lookup(target: &TargetSpectrum, library_path: &Path, config: &LookupConfig) -> Result<LookupResult, AppError> {
    // Reject a bad target before touching the filesystem.
    let key_points = validate(target, config)?;
    let reader = LibraryReader::open(library_path, target.len(), config.window)?;
    scan(key_points, reader, config)
}

/// Same as [`lookup`] over any buffered reader.
pub fn lookup_reader<R: BufRead>(
    target: &TargetSpectrum,
    reader: R,
    name: &str,
    config: &LookupConfig,
) -> Result<LookupResult, AppError> {
    let key_points = validate(target, config)?;
    scan(key_points, LibraryReader::new(reader, name, target.len(), config.window), config)
}

fn scan<R: BufRead>(
    key_points: Vec<(usize, f64)>,
    mut reader: LibraryReader<R>,
    config: &LookupConfig,
) -> Result<LookupResult, AppError> {
    let started = Instant::now();
    let mut set = CandidateSet::new(config.k);
    let mut scanned = 0usize;

    for item in reader.by_ref() {
        let (record, spectrum) = item?;
        scanned += 1;
        let score = masked_mse(&key_points, &spectrum);
        if set.offer(Candidate { record, spectrum, score }) {
            debug!(record, score, "candidate admitted");
        }
    }

    let elapsed = started.elapsed();
    let candidates = set.into_sorted_vec();
    info!(
        scanned,
        lines = reader.lines_read(),
        kept = candidates.len(),
        best = candidates.first().map(|c| c.score),
        secs = elapsed.as_secs_f64(),
        "lookup finished"
    );

    Ok(LookupResult {
        candidates,
        key_points,
        records_scanned: scanned,
        elapsed,
    })
}
