//! Training dataset ingest.
//!
//! A dataset directory holds raw simulation CSVs, one sample per row. Each row
//! carries the geometry somewhere in its columns and the full-resolution
//! spectrum after it. Ingest selects two column ranges out of every row:
//!
//! - `x_range` → features
//! - `y_range` → labels
//!
//! Design goals:
//! - **Strict schema**: a row missing a requested column is an error, not a skip
//! - **Deterministic order**: files are read in sorted file-name order
//! - **Row parity**: features and labels always have the same number of rows

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::domain::ColumnRange;
use crate::error::{AppError, ErrorKind};
use crate::io::files::list_csv_files;

/// Ingest options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Skip the first line of every file.
    pub has_header: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { has_header: true }
    }
}

/// Imported feature/label arrays, one row per sample.
#[derive(Debug, Clone)]
pub struct ImportedData {
    pub features: DMatrix<f32>,
    pub labels: DMatrix<f32>,
    /// Files read, in read order.
    pub files: Vec<PathBuf>,
    /// Rows contributed by each file, positional with `files`.
    pub rows_per_file: Vec<usize>,
}

impl ImportedData {
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }
}

/// Import every `*.csv` file directly inside `directory`.
pub fn import_dataset(
    directory: &Path,
    x_range: ColumnRange,
    y_range: ColumnRange,
    options: ImportOptions,
) -> Result<ImportedData, AppError> {
    let files = list_csv_files(directory)?;
    if files.is_empty() {
        return Err(AppError::new(
            ErrorKind::EmptyDataset,
            format!("import: no .csv files in '{}'", directory.display()),
        ));
    }
    info!(dir = %directory.display(), files = files.len(), "importing dataset");
    import_files(&files, x_range, y_range, options)
}

/// Import the given files in order.
pub fn import_files(
    files: &[PathBuf],
    x_range: ColumnRange,
    y_range: ColumnRange,
    options: ImportOptions,
) -> Result<ImportedData, AppError> {
    let mut acc = RowAccumulator::new(x_range, y_range);
    let mut rows_per_file = Vec::with_capacity(files.len());

    for path in files {
        let file = File::open(path).map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("import: failed to open '{}': {e}", path.display()),
            )
        })?;
        let rows = acc.read(file, &path.display().to_string(), options)?;
        debug!(file = %path.display(), rows, "file imported");
        rows_per_file.push(rows);
    }

    let (features, labels) = acc.finish()?;
    info!(
        samples = features.nrows(),
        features = features.ncols(),
        labels = labels.ncols(),
        "dataset imported"
    );
    Ok(ImportedData {
        features,
        labels,
        files: files.to_vec(),
        rows_per_file,
    })
}

/// Row-major buffers that become the two matrices.
struct RowAccumulator {
    x_range: ColumnRange,
    y_range: ColumnRange,
    x: Vec<f32>,
    y: Vec<f32>,
    rows: usize,
}

impl RowAccumulator {
    fn new(x_range: ColumnRange, y_range: ColumnRange) -> Self {
        Self {
            x_range,
            y_range,
            x: Vec::new(),
            y: Vec::new(),
            rows: 0,
        }
    }

    /// Append all rows of one CSV source; returns the number of rows read.
    fn read<R: Read>(&mut self, source: R, name: &str, options: ImportOptions) -> Result<usize, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(options.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut rows = 0usize;
        for (idx, result) in reader.records().enumerate() {
            // 1-based line, counting the header if present.
            let fallback_line = idx + 1 + usize::from(options.has_header);
            let record = result.map_err(|e| {
                AppError::new(
                    ErrorKind::MalformedRecord,
                    format!("import: '{name}' line {fallback_line}: CSV parse error: {e}"),
                )
            })?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(fallback_line);

            if record.iter().all(|f| f.is_empty()) {
                continue;
            }

            let needed = self.x_range.end.max(self.y_range.end);
            if record.len() < needed {
                return Err(AppError::new(
                    ErrorKind::SchemaMismatch,
                    format!(
                        "import: '{name}' line {line}: row has {} column(s), need {needed} for features {} and labels {}.",
                        record.len(),
                        self.x_range,
                        self.y_range
                    ),
                ));
            }

            for (range, out) in [(self.x_range, &mut self.x), (self.y_range, &mut self.y)] {
                for col in range.as_range() {
                    let raw = &record[col];
                    let v = raw.parse::<f32>().map_err(|e| {
                        AppError::new(
                            ErrorKind::MalformedRecord,
                            format!("import: '{name}' line {line} column {col}: '{raw}' is not a number: {e}"),
                        )
                    })?;
                    out.push(v);
                }
            }
            rows += 1;
        }
        self.rows += rows;
        Ok(rows)
    }

    fn finish(self) -> Result<(DMatrix<f32>, DMatrix<f32>), AppError> {
        if self.rows == 0 {
            return Err(AppError::new(
                ErrorKind::EmptyDataset,
                "import: no data rows found.",
            ));
        }
        let features = DMatrix::from_row_slice(self.rows, self.x_range.len(), &self.x);
        let labels = DMatrix::from_row_slice(self.rows, self.y_range.len(), &self.y);
        Ok((features, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ranges() -> (ColumnRange, ColumnRange) {
        (ColumnRange::new(2, 4).unwrap(), ColumnRange::new(4, 7).unwrap())
    }

    #[test]
    fn splits_columns_into_features_and_labels() {
        let (x, y) = ranges();
        let mut acc = RowAccumulator::new(x, y);
        let csv = "id,run,h1,h2,s0,s1,s2\n0,a,1.5,2.5,0.1,0.2,0.3\n1,a,3.5,4.5,0.4,0.5,0.6\n";
        let rows = acc.read(Cursor::new(csv), "mem", ImportOptions::default()).unwrap();
        assert_eq!(rows, 2);
        let (features, labels) = acc.finish().unwrap();
        assert_eq!(features.shape(), (2, 2));
        assert_eq!(labels.shape(), (2, 3));
        assert_eq!(features[(1, 0)], 3.5);
        assert_eq!(labels[(0, 2)], 0.3);
    }

    #[test]
    fn short_row_is_a_schema_mismatch() {
        let (x, y) = ranges();
        let mut acc = RowAccumulator::new(x, y);
        let csv = "0,a,1.5,2.5,0.1,0.2,0.3\n1,a,3.5,4.5,0.4\n";
        let options = ImportOptions { has_header: false };
        let err = acc.read(Cursor::new(csv), "short.csv", options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert!(err.message().contains("'short.csv' line 2"));
    }

    #[test]
    fn non_numeric_value_is_malformed() {
        let (x, y) = ranges();
        let mut acc = RowAccumulator::new(x, y);
        let csv = "h\n0,a,1.5,oops,0.1,0.2,0.3\n";
        let err = acc.read(Cursor::new(csv), "m", ImportOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("column 3"));
    }

    #[test]
    fn header_only_input_is_empty() {
        let (x, y) = ranges();
        let mut acc = RowAccumulator::new(x, y);
        acc.read(Cursor::new("a,b,c\n"), "m", ImportOptions::default()).unwrap();
        assert_eq!(acc.finish().unwrap_err().kind(), ErrorKind::EmptyDataset);
    }
}
