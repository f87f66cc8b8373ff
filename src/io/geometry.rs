//! Candidate geometry streaming.
//!
//! Geometry-bearing files (grid files, evaluation CSVs, feature files) are read
//! line by line and handed out in fixed-size batches:
//!
//! - files are opened lazily, one at a time, in the order given
//! - the geometry is the 8 columns starting at `layout.offset`
//! - blank lines are skipped
//! - the final partial batch is dropped
//! - the first error ends the stream

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::domain::{GEOMETRY_DIM, GeometryLayout, GeometryRecord};
use crate::error::{AppError, ErrorKind};

/// Parse one line into a geometry record.
///
/// The error string does not name the file; callers add location.
pub fn parse_geometry_line(line: &str, layout: GeometryLayout) -> Result<GeometryRecord, String> {
    let fields: Vec<&str> = line.split(',').collect();
    let columns = layout.columns();
    let Some(slice) = fields.get(columns.clone()) else {
        return Err(format!(
            "expected {GEOMETRY_DIM} geometry fields in columns {}..{}, line has {} field(s)",
            columns.start,
            columns.end,
            fields.len()
        ));
    };

    let mut values = [0.0; GEOMETRY_DIM];
    for (i, (slot, raw)) in values.iter_mut().zip(slice.iter()).enumerate() {
        *slot = raw.trim().parse::<f64>().map_err(|e| {
            format!("column {} ('{}') is not a number: {e}", columns.start + i, raw.trim())
        })?;
    }
    Ok(GeometryRecord(values))
}

/// Comma-joined geometry, as written to feature files.
pub fn format_geometry(record: &GeometryRecord) -> String {
    record
        .values()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

enum Pending {
    Path(PathBuf),
    Reader(String, Box<dyn BufRead + Send>),
}

struct OpenSource {
    name: String,
    lines: Lines<Box<dyn BufRead + Send>>,
    line_no: usize,
}

/// Lazy batched reader over one or more geometry files.
pub struct GeometryStream {
    pending: VecDeque<Pending>,
    current: Option<OpenSource>,
    layout: GeometryLayout,
    batch_size: usize,
    records_read: u64,
    finished: bool,
}

impl std::fmt::Debug for GeometryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryStream")
            .field("pending", &self.pending.len())
            .field("current", &self.current.as_ref().map(|s| &s.name))
            .field("layout", &self.layout)
            .field("batch_size", &self.batch_size)
            .field("records_read", &self.records_read)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Stream geometries from `paths` in batches of `batch_size`.
pub fn stream_geometries(
    paths: Vec<PathBuf>,
    layout: GeometryLayout,
    batch_size: usize,
) -> Result<GeometryStream, AppError> {
    GeometryStream::new(paths.into_iter().map(Pending::Path).collect(), layout, batch_size)
}

impl GeometryStream {
    fn new(
        pending: VecDeque<Pending>,
        layout: GeometryLayout,
        batch_size: usize,
    ) -> Result<Self, AppError> {
        if batch_size == 0 {
            return Err(AppError::new(
                ErrorKind::InvalidArgument,
                "stream: batch size must be > 0.",
            ));
        }
        Ok(Self {
            pending,
            current: None,
            layout,
            batch_size,
            records_read: 0,
            finished: false,
        })
    }

    /// Stream from in-memory readers; `name` is used in error messages.
    pub fn from_readers(
        readers: Vec<(String, Box<dyn BufRead + Send>)>,
        layout: GeometryLayout,
        batch_size: usize,
    ) -> Result<Self, AppError> {
        let pending = readers
            .into_iter()
            .map(|(name, r)| Pending::Reader(name, r))
            .collect();
        Self::new(pending, layout, batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Records parsed so far, including any in a dropped partial batch.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    fn open_next(&mut self) -> Result<bool, AppError> {
        let Some(next) = self.pending.pop_front() else {
            return Ok(false);
        };
        let (name, reader): (String, Box<dyn BufRead + Send>) = match next {
            Pending::Path(path) => {
                let file = File::open(&path).map_err(|e| {
                    AppError::new(
                        ErrorKind::Io,
                        format!("stream: failed to open '{}': {e}", path.display()),
                    )
                })?;
                (path.display().to_string(), Box::new(BufReader::new(file)))
            }
            Pending::Reader(name, reader) => (name, reader),
        };
        self.current = Some(OpenSource {
            name,
            lines: reader.lines(),
            line_no: 0,
        });
        Ok(true)
    }

    fn next_record(&mut self) -> Option<Result<GeometryRecord, AppError>> {
        loop {
            if self.current.is_none() {
                match self.open_next() {
                    Ok(true) => {}
                    Ok(false) => return None,
                    Err(e) => return Some(Err(e)),
                }
            }
            let source = self.current.as_mut()?;
            match source.lines.next() {
                None => {
                    self.current = None;
                }
                Some(Err(e)) => {
                    return Some(Err(AppError::new(
                        ErrorKind::Io,
                        format!(
                            "stream: failed to read '{}' line {}: {e}",
                            source.name,
                            source.line_no + 1
                        ),
                    )));
                }
                Some(Ok(line)) => {
                    source.line_no += 1;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parsed = parse_geometry_line(&line, self.layout).map_err(|msg| {
                        AppError::new(
                            ErrorKind::MalformedRecord,
                            format!("stream: '{}' line {}: {msg}", source.name, source.line_no),
                        )
                    });
                    if parsed.is_ok() {
                        self.records_read += 1;
                    }
                    return Some(parsed);
                }
            }
        }
    }
}

impl Iterator for GeometryStream {
    type Item = Result<Vec<GeometryRecord>, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.next_record() {
                Some(Ok(record)) => batch.push(record),
                Some(Err(e)) => {
                    self.finished = true;
                    self.current = None;
                    return Some(Err(e));
                }
                None => {
                    // Partial tail batch is dropped.
                    self.finished = true;
                    return None;
                }
            }
        }
        Some(Ok(batch))
    }
}

/// Resolve the geometries at the given 0-based line indices of `path`.
///
/// The result is positional with `records`. Fails if an index is past the end
/// of the file.
pub fn read_geometries_at(
    path: &Path,
    layout: GeometryLayout,
    records: &[usize],
) -> Result<Vec<GeometryRecord>, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("features: failed to open '{}': {e}", path.display()),
        )
    })?;
    read_geometries_from(BufReader::new(file), &path.display().to_string(), layout, records)
}

fn read_geometries_from<R: BufRead>(
    reader: R,
    name: &str,
    layout: GeometryLayout,
    records: &[usize],
) -> Result<Vec<GeometryRecord>, AppError> {
    let Some(&last) = records.iter().max() else {
        return Ok(Vec::new());
    };

    let mut wanted: HashMap<usize, Vec<usize>> = HashMap::new();
    for (pos, &rec) in records.iter().enumerate() {
        wanted.entry(rec).or_default().push(pos);
    }

    let mut out: Vec<Option<GeometryRecord>> = vec![None; records.len()];
    for (idx, line) in reader.lines().enumerate().take(last + 1) {
        let line = line.map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("features: failed to read '{name}' line {}: {e}", idx + 1),
            )
        })?;
        let Some(positions) = wanted.get(&idx) else {
            continue;
        };
        let record = parse_geometry_line(&line, layout).map_err(|msg| {
            AppError::new(
                ErrorKind::MalformedRecord,
                format!("features: '{name}' line {}: {msg}", idx + 1),
            )
        })?;
        for &pos in positions {
            out[pos] = Some(record);
        }
    }

    out.into_iter()
        .zip(records)
        .map(|(g, &rec)| {
            g.ok_or_else(|| {
                AppError::new(
                    ErrorKind::InvalidArgument,
                    format!("features: '{name}' has no record {rec}."),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(name: &str, text: &str) -> (String, Box<dyn BufRead + Send>) {
        (name.to_string(), Box::new(Cursor::new(text.to_string())))
    }

    fn grid_lines(n: usize) -> String {
        (0..n)
            .map(|i| format!("{i}.0,1.0,2.0,3.0,4.0,5.0,6.0,7.0\n"))
            .collect()
    }

    #[test]
    fn parses_offset_columns() {
        let rec = parse_geometry_line("7,run,1,2,3,4,5,6,7,8,0.5", GeometryLayout::WITH_IDS).unwrap();
        assert_eq!(rec.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert!(parse_geometry_line("1,2,3", GeometryLayout::BARE).is_err());
        assert!(parse_geometry_line("1,2,3,4,5,6,7,x", GeometryLayout::BARE).is_err());
    }

    #[test]
    fn drops_partial_tail_batch() {
        let stream = GeometryStream::from_readers(
            vec![reader("a", &grid_lines(10))],
            GeometryLayout::BARE,
            3,
        )
        .unwrap();
        let batches: Vec<_> = stream.map(Result::unwrap).collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 3));
        assert_eq!(batches[2][2].values()[0], 8.0);
    }

    #[test]
    fn batches_span_files_in_order() {
        let stream = GeometryStream::from_readers(
            vec![reader("a", &grid_lines(3)), reader("b", "\n9.0,1,2,3,4,5,6,7\n")],
            GeometryLayout::BARE,
            2,
        )
        .unwrap();
        let firsts: Vec<f64> = stream
            .flat_map(|b| b.unwrap())
            .map(|r| r.values()[0])
            .collect();
        assert_eq!(firsts, vec![0.0, 1.0, 2.0, 9.0]);
    }

    #[test]
    fn malformed_line_reports_location_and_fuses() {
        let mut stream = GeometryStream::from_readers(
            vec![reader("grid.csv", "0,0,0,0,0,0,0,0\n0,0,0,bad,0,0,0,0\n0,0,0,0,0,0,0,0\n")],
            GeometryLayout::BARE,
            1,
        )
        .unwrap();
        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRecord);
        assert!(err.message().contains("'grid.csv' line 2"));
        assert!(stream.next().is_none());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = stream_geometries(vec![], GeometryLayout::BARE, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn geometries_resolve_by_line_index() {
        let text = grid_lines(6);
        let got = read_geometries_from(Cursor::new(text), "f", GeometryLayout::BARE, &[4, 1, 4]).unwrap();
        let firsts: Vec<f64> = got.iter().map(|g| g.values()[0]).collect();
        assert_eq!(firsts, vec![4.0, 1.0, 4.0]);

        let err = read_geometries_from(Cursor::new(grid_lines(2)), "f", GeometryLayout::BARE, &[5])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn feature_lines_round_trip() {
        let rec = GeometryRecord([42.0, 42.8, 1.5, 0.0, 1.0, 2.0, 3.0, 4.25]);
        let line = format_geometry(&rec);
        assert_eq!(line, "42,42.8,1.5,0,1,2,3,4.25");
        assert_eq!(parse_geometry_line(&line, GeometryLayout::BARE).unwrap(), rec);
    }
}
