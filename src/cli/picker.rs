//! Interactive source picker.
//!
//! Used by `idash etl` when no source is given and the configured default does not
//! exist. Lists spreadsheet/CSV files under the current working directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::io::SourceFormat;

/// Default directory recursion depth for finding source files.
const DEFAULT_SEARCH_DEPTH: usize = 4;

/// Prompt the user to select a source file from the current directory tree.
///
/// Accepts a number from the list or an explicit path; `q` cancels.
pub fn prompt_for_source_path() -> Result<PathBuf, AppError> {
    let files = discover_source_files();
    if files.is_empty() {
        return Err(AppError::new(
            2,
            "No spreadsheet or CSV files found. Provide one with `idash etl --source <file>`.",
        ));
    }

    println!("Found {} source file(s):", files.len());
    for (idx, path) in files.iter().enumerate() {
        println!("{:>3}) {}", idx + 1, pretty_path(path));
    }

    loop {
        print!("Select a file by number (1-{}) or type a path (q to quit): ", files.len());
        io::stdout()
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write prompt: {e}")))?;

        let mut input = String::new();
        let bytes = io::stdin()
            .read_line(&mut input)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;

        if bytes == 0 {
            return Err(AppError::new(
                2,
                "No input received. Provide a source with `idash etl --source <file>`.",
            ));
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") {
            return Err(AppError::new(2, "Canceled."));
        }

        if let Ok(choice) = input.parse::<usize>() {
            if (1..=files.len()).contains(&choice) {
                return validate_source_path(&files[choice - 1]);
            }
            println!("Invalid choice: {choice}. Enter a number between 1 and {}.", files.len());
            continue;
        }

        match validate_source_path(Path::new(input)) {
            Ok(path) => return Ok(path),
            Err(err) => println!("{err}"),
        }
    }
}

/// Validate that `path` is an existing file in a supported format.
pub fn validate_source_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::new(2, format!("Source file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if SourceFormat::from_path(path).is_none() {
        return Err(AppError::new(
            2,
            format!(
                "Expected a spreadsheet (.xlsx, .xls, .ods) or .csv file (got: {}).",
                path.display()
            ),
        ));
    }

    Ok(path.to_path_buf())
}

/// Discover source files under the current directory (deterministic order).
pub fn discover_source_files() -> Vec<PathBuf> {
    find_source_files(Path::new("."), DEFAULT_SEARCH_DEPTH)
}

fn find_source_files(root: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    find_source_files_inner(root, 0, max_depth, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn find_source_files_inner(root: &Path, depth: usize, max_depth: usize, out: &mut Vec<PathBuf>) {
    if depth > max_depth {
        return;
    }

    let Ok(entries) = fs::read_dir(root) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                find_source_files_inner(&path, depth + 1, max_depth, out);
            }
            continue;
        }

        // Lock files left behind by office suites (`~$Dashboard.xlsx`) are not workbooks.
        let is_lock_file = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        if file_type.is_file() && !is_lock_file && SourceFormat::from_path(&path).is_some() {
            out.push(path);
        }
    }
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "node_modules")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_and_unsupported_paths() {
        let err = validate_source_path(Path::new("no/such/file.xlsx")).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = validate_source_path(Path::new("Cargo.toml")).unwrap_err();
        assert!(err.to_string().contains("Expected a spreadsheet"));
    }

    #[test]
    fn pretty_path_strips_leading_dot() {
        assert_eq!(pretty_path(Path::new("./data/in.csv")), "data/in.csv");
        assert_eq!(pretty_path(Path::new("in.csv")), "in.csv");
    }
}
