use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Lists the statement exports in `dir`, ignoring the compiler's own outputs.
///
/// Only regular files ending in exactly `.csv` or `.CSV` qualify. The result is
/// sorted so runs are reproducible.
pub fn find_statement_files(dir: &Path, excluded: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if excluded.contains(&name) || !is_csv(&path) {
            continue;
        }
        files.push(path);
    }
    files.sort();

    if files.is_empty() {
        warn!("No statement files found in {}", dir.display());
    }
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("csv" | "CSV"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn finds_csv_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["usaa.CSV", "chase_jan.csv", "citi.csv", "notes.txt", "chase.Csv"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("archive.csv")).unwrap();

        let found = find_statement_files(dir.path(), &[]).unwrap();
        assert_eq!(names(&found), ["chase_jan.csv", "citi.csv", "usaa.CSV"]);
    }

    #[test]
    fn skips_excluded_outputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["chase.csv", "Compiled Income.csv", "Compiled expenses.csv"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let found =
            find_statement_files(dir.path(), &["Compiled Income.csv", "Compiled expenses.csv"])
                .unwrap();
        assert_eq!(names(&found), ["chase.csv"]);
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_statement_files(dir.path(), &[]).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_statement_files(&dir.path().join("nope"), &[]).is_err());
    }
}
