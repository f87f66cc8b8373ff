//! Spectrum library and target spectrum files.
//!
//! A library file holds one predicted spectrum per line, comma-separated, no
//! header. The 0-based line index is the record index; it lines up with the
//! feature file written next to it.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::domain::{ReadWindow, TargetSpectrum};
use crate::error::{AppError, ErrorKind};

/// Parse one library line into exactly `expected_len` values.
pub fn parse_spectrum_line(line: &str, expected_len: usize) -> Result<Vec<f64>, (ErrorKind, String)> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != expected_len {
        return Err((
            ErrorKind::RecordLength,
            format!("expected {expected_len} values, found {}", fields.len()),
        ));
    }
    fields
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            raw.trim().parse::<f64>().map_err(|e| {
                (
                    ErrorKind::MalformedRecord,
                    format!("value {i} ('{}') is not a number: {e}", raw.trim()),
                )
            })
        })
        .collect()
}

/// Comma-joined spectrum, as written to library files.
pub fn format_spectrum(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Line-by-line reader yielding `(record index, spectrum)`.
pub struct LibraryReader<R: BufRead> {
    name: String,
    lines: Lines<R>,
    expected_len: usize,
    next_index: usize,
    limit: Option<usize>,
}

impl LibraryReader<BufReader<File>> {
    pub fn open(path: &Path, expected_len: usize, window: ReadWindow) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("lookup: failed to open library '{}': {e}", path.display()),
            )
        })?;
        Ok(Self::new(
            BufReader::new(file),
            path.display().to_string(),
            expected_len,
            window,
        ))
    }
}

impl<R: BufRead> LibraryReader<R> {
    pub fn new(reader: R, name: impl Into<String>, expected_len: usize, window: ReadWindow) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            expected_len,
            next_index: 0,
            limit: window.limit(),
        }
    }

    /// Lines consumed so far (blank lines included).
    pub fn lines_read(&self) -> usize {
        self.next_index
    }
}

impl<R: BufRead> Iterator for LibraryReader<R> {
    type Item = Result<(usize, Vec<f64>), AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.limit.is_some_and(|n| self.next_index >= n) {
                return None;
            }
            let line = self.lines.next()?;
            let index = self.next_index;
            self.next_index += 1;

            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    return Some(Err(AppError::new(
                        ErrorKind::Io,
                        format!("lookup: failed to read '{}' line {}: {e}", self.name, index + 1),
                    )));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                parse_spectrum_line(&line, self.expected_len)
                    .map(|values| (index, values))
                    .map_err(|(kind, msg)| {
                        AppError::new(
                            kind,
                            format!("lookup: '{}' record {index} (line {}): {msg}", self.name, index + 1),
                        )
                    }),
            );
        }
    }
}

/// Parse a target spectrum from text.
///
/// Entries are comma-separated (newlines also separate). Empty, `_`, `None`
/// and `nan` entries are unconstrained.
pub fn parse_target_text(text: &str, expected_len: usize) -> Result<TargetSpectrum, AppError> {
    let entries: Vec<&str> = text
        .trim()
        .split([',', '\n'])
        .map(str::trim)
        .collect();
    if entries.len() != expected_len {
        return Err(AppError::new(
            ErrorKind::InvalidTarget,
            format!(
                "target: expected {expected_len} entries, found {}.",
                entries.len()
            ),
        ));
    }

    let mut values = Vec::with_capacity(expected_len);
    for (i, raw) in entries.iter().enumerate() {
        if is_unconstrained(raw) {
            values.push(None);
            continue;
        }
        let v = raw.parse::<f64>().map_err(|e| {
            AppError::new(
                ErrorKind::InvalidTarget,
                format!("target: entry {i} ('{raw}') is not a number: {e}"),
            )
        })?;
        values.push(Some(v));
    }
    TargetSpectrum::new(values)
}

fn is_unconstrained(raw: &str) -> bool {
    raw.is_empty() || raw == "_" || raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("nan")
}

/// Read a target spectrum file.
pub fn read_target_file(path: &Path, expected_len: usize) -> Result<TargetSpectrum, AppError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("target: failed to read '{}': {e}", path.display()),
        )
    })?;
    parse_target_text(&text, expected_len)
}

/// Parse a `IDX=VALUE` target point (clap value parser).
pub fn parse_point(s: &str) -> Result<(usize, f64), String> {
    let (idx, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected IDX=VALUE, got '{s}'"))?;
    let idx = idx
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid index '{idx}': {e}"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value '{value}': {e}"))?;
    Ok((idx, value))
}
