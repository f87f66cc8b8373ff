//! CSV file discovery.
//!
//! Every directory scan in the pipeline goes through here so that the order in
//! which files are consumed is the sorted file-name order, independent of how
//! the filesystem happens to list entries.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, ErrorKind};

/// `true` if `path` has a `.csv` extension (case-insensitive).
pub fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        == Some(true)
}

/// List the `*.csv` files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new(
            ErrorKind::Io,
            format!("Failed to read directory '{}': {e}", dir.display()),
        )
    })?;

    let mut out = Vec::new();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let path = entry.path();
        if file_type.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

/// Expand CLI inputs: directories become their sorted `*.csv` files, plain
/// files are kept as given. Input order is preserved.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            out.extend(list_csv_files(input)?);
        } else if input.exists() {
            out.push(input.clone());
        } else {
            return Err(AppError::new(
                ErrorKind::Io,
                format!("Input not found: {}", input.display()),
            ));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_is_case_insensitive() {
        assert!(has_csv_extension(Path::new("a/b/run_01.CSV")));
        assert!(has_csv_extension(Path::new("grid.csv")));
        assert!(!has_csv_extension(Path::new("grid.csv.json")));
        assert!(!has_csv_extension(Path::new("notes")));
    }

    #[test]
    fn listing_is_sorted_and_flat() {
        let dir = std::env::temp_dir().join(format!("nanospec-files-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["b.csv", "a.CSV", "c.txt", "nested/d.csv"] {
            fs::write(dir.join(name), "1\n").unwrap();
        }

        let files = list_csv_files(&dir).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.CSV", "b.csv"]);

        let missing = expand_inputs(&[dir.join("nope.csv")]).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Io);

        fs::remove_dir_all(&dir).unwrap();
    }
}
