//! Export ranked lookup candidates to CSV.
//!
//! One row per candidate, best first, so the file can go straight into a
//! spreadsheet or a plotting script.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{AXIS_NAMES, Candidate, GeometryRecord};
use crate::error::{AppError, ErrorKind};

/// Write candidates (and their geometry when known) to `path`.
///
/// `geometries`, when given, is positional with `candidates`.
pub fn write_candidates_csv(
    path: &Path,
    candidates: &[Candidate],
    geometries: Option<&[GeometryRecord]>,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;
    let mut writer = BufWriter::new(file);
    write_candidates(&mut writer, candidates, geometries)
        .and_then(|_| writer.flush())
        .map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("Failed to write export CSV '{}': {e}", path.display()),
            )
        })
}

fn write_candidates<W: Write>(
    out: &mut W,
    candidates: &[Candidate],
    geometries: Option<&[GeometryRecord]>,
) -> std::io::Result<()> {
    let spectrum_len = candidates.first().map_or(0, |c| c.spectrum.len());

    // Header
    let mut header = vec!["rank".to_string(), "record".to_string(), "score".to_string()];
    if geometries.is_some() {
        header.extend(AXIS_NAMES.iter().map(|n| n.to_string()));
    }
    header.extend((0..spectrum_len).map(|i| format!("s{i}")));
    writeln!(out, "{}", header.join(","))?;

    for (rank, c) in candidates.iter().enumerate() {
        write!(out, "{},{},{:.10}", rank + 1, c.record, c.score)?;
        if let Some(g) = geometries.and_then(|g| g.get(rank)) {
            for v in g.values() {
                write!(out, ",{v}")?;
            }
        }
        for v in &c.spectrum {
            write!(out, ",{v}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_rank_order() {
        let candidates = vec![
            Candidate { record: 7, spectrum: vec![0.5, 0.25], score: 0.0 },
            Candidate { record: 2, spectrum: vec![1.0, 2.0], score: 1.5 },
        ];
        let geometry = vec![GeometryRecord([1.0; 8]), GeometryRecord([2.5; 8])];
        let mut buf = Vec::new();
        write_candidates(&mut buf, &candidates, Some(geometry.as_slice())).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "rank,record,score,h1,h2,h3,h4,r1,r2,r3,r4,s0,s1");
        assert_eq!(lines[1], "1,7,0.0000000000,1,1,1,1,1,1,1,1,0.5,0.25");
        assert!(lines[2].starts_with("2,2,1.5000000000,2.5,"));
    }

    #[test]
    fn geometry_columns_are_optional() {
        let candidates = vec![Candidate { record: 0, spectrum: vec![3.0], score: 0.25 }];
        let mut buf = Vec::new();
        write_candidates(&mut buf, &candidates, None).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "rank,record,score,s0\n1,0,0.2500000000,3\n");
    }
}
