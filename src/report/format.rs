//! Formatted terminal output for each subcommand.
//!
//! We keep formatting code in one place so:
//! - the grid/lookup code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use std::path::PathBuf;

use crate::data::{AugmentedFile, DatasetSplits};
use crate::domain::{AXIS_NAMES, GeometryRecord};
use crate::grid::GridSummary;
use crate::io::dataset::ImportedData;
use crate::lookup::LookupResult;

/// Summary of a grid run.
pub fn format_grid_summary(summary: &GridSummary) -> String {
    let mut out = String::new();
    out.push_str("=== nspec - grid ===\n");
    out.push_str(&format!("File: {}\n", summary.path.display()));
    out.push_str(&format!("Mode: {}\n", format!("{:?}", summary.mode).to_lowercase()));
    let counts: Vec<String> = AXIS_NAMES
        .iter()
        .zip(summary.axis_counts.iter())
        .map(|(n, c)| format!("{n}={c}"))
        .collect();
    out.push_str(&format!("Axes: {}\n", counts.join(" ")));
    out.push_str(&format!(
        "Records: {} in {:.2}s\n",
        summary.records,
        summary.elapsed.as_secs_f64()
    ));
    out
}

/// Summary of a candidate streaming pass.
pub fn format_stream_summary(files: &[PathBuf], batches: usize, batch_size: usize, records_read: u64) -> String {
    let mut out = String::new();
    out.push_str("=== nspec - stream ===\n");
    out.push_str(&format!("Files: {}\n", files.len()));
    for f in files {
        out.push_str(&format!("  {}\n", f.display()));
    }
    out.push_str(&format!(
        "Batches: {batches} x {batch_size} ({} records streamed, {} read)\n",
        batches * batch_size,
        records_read
    ));
    let dropped = records_read.saturating_sub((batches * batch_size) as u64);
    if dropped > 0 {
        out.push_str(&format!("Dropped partial batch: {dropped} record(s)\n"));
    }
    out
}

/// Summary of a dataset import and split.
pub fn format_import_summary(data: &ImportedData, splits: Option<&DatasetSplits>) -> String {
    let mut out = String::new();
    out.push_str("=== nspec - import ===\n");
    for (f, n) in data.files.iter().zip(data.rows_per_file.iter()) {
        out.push_str(&format!("  {:<48} {n:>8}\n", truncate(&f.display().to_string(), 48)));
    }
    out.push_str(&format!(
        "Samples: {} | features={} | labels={}\n",
        data.n_samples(),
        data.features.ncols(),
        data.labels.ncols()
    ));
    if let Some(s) = splits {
        let per_epoch = s.train_len() / s.batch_size();
        out.push_str(&format!(
            "Split: train={} valid={} | batch={} | train batches/epoch={} | valid batches={}\n",
            s.train_len(),
            s.valid_len(),
            s.batch_size(),
            per_epoch,
            s.valid_len() / s.batch_size()
        ));
    }
    out
}

/// Ranked lookup table; `geometries` is positional with the candidates.
pub fn format_lookup(result: &LookupResult, geometries: Option<&[GeometryRecord]>) -> String {
    let mut out = String::new();
    out.push_str("=== nspec - lookup ===\n");
    let points: Vec<String> = result
        .key_points
        .iter()
        .map(|(i, v)| format!("{i}={v}"))
        .collect();
    out.push_str(&format!(
        "Key points ({}): {}\n",
        points.len(),
        truncate(&points.join(", "), 96)
    ));
    out.push_str(&format!(
        "Scanned {} record(s) in {:.3}s\n\n",
        result.records_scanned,
        result.elapsed.as_secs_f64()
    ));

    let mut header = format!("{:>4} {:>10} {:>14}", "rank", "record", "mse");
    if geometries.is_some() {
        header.push_str("  geometry (h1..h4 | r1..r4)");
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&format!("{:-<4} {:-<10} {:-<14}\n", "", "", ""));

    for (rank, c) in result.candidates.iter().enumerate() {
        let mut row = format!("{:>4} {:>10} {:>14.6e}", rank + 1, c.record, c.score);
        if let Some(g) = geometries.and_then(|g| g.get(rank)) {
            row.push_str(&format!("  {} | {}", fmt_vec(g.heights()), fmt_vec(g.radii())));
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }
    if result.candidates.is_empty() {
        out.push_str("(no records)\n");
    }
    out
}

/// Per-file augmentation results.
pub fn format_augment_summary(files: &[AugmentedFile]) -> String {
    let mut out = String::new();
    out.push_str("=== nspec - augment ===\n");
    for f in files {
        out.push_str(&format!(
            "  {} -> {} ({} rows)\n",
            f.input.display(),
            f.output.display(),
            f.rows
        ));
    }
    let total: usize = files.iter().map(|f| f.rows).sum();
    out.push_str(&format!("Files: {} | rows: {total}\n", files.len()));
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.1}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, WriteMode};
    use std::time::Duration;

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn lookup_table_lists_ranks_with_geometry() {
        let result = LookupResult {
            candidates: vec![
                Candidate { record: 12, spectrum: vec![], score: 0.5 },
                Candidate { record: 3, spectrum: vec![], score: 1.25 },
            ],
            key_points: vec![(50, 0.7), (100, 0.2)],
            records_scanned: 40,
            elapsed: Duration::from_millis(2),
        };
        let geometry = [
            GeometryRecord([42.0, 42.8, 43.6, 44.4, 1.0, 1.5, 2.0, 2.5]),
            GeometryRecord([0.0; 8]),
        ];
        let txt = format_lookup(&result, Some(&geometry[..]));
        assert!(txt.contains("Key points (2): 50=0.7, 100=0.2"));
        assert!(txt.contains("Scanned 40 record(s)"));
        let rows: Vec<&str> = txt.lines().filter(|l| l.trim_start().starts_with(['1', '2'])).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("12"));
        assert!(rows[0].ends_with("[42.0, 42.8, 43.6, 44.4] | [1.0, 1.5, 2.0, 2.5]"));
    }

    #[test]
    fn grid_summary_names_axes() {
        let summary = GridSummary {
            path: PathBuf::from("out/grid.csv"),
            axis_counts: [2, 2, 1, 1, 1, 1, 1, 1],
            records: 4,
            mode: WriteMode::Truncate,
            elapsed: Duration::from_millis(1),
        };
        let txt = format_grid_summary(&summary);
        assert!(txt.contains("Axes: h1=2 h2=2 h3=1 h4=1 r1=1 r2=1 r3=1 r4=1"));
        assert!(txt.contains("Mode: truncate"));
        assert!(txt.contains("Records: 4"));
    }

    #[test]
    fn stream_summary_reports_dropped_tail() {
        let txt = format_stream_summary(&[PathBuf::from("grid.csv")], 3, 3, 10);
        assert!(txt.contains("Batches: 3 x 3 (9 records streamed, 10 read)"));
        assert!(txt.contains("Dropped partial batch: 1 record(s)"));
    }
}
