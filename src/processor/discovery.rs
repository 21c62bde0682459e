//! Input discovery for STDF files.
//!
//! Inputs may be explicit files, directories (walked recursively for STDF
//! files) or glob patterns. Order follows the inputs as given; directory
//! and glob matches are sorted so runs are repeatable.

use crate::constants::{GZIP_EXTENSION, STDF_EXTENSIONS};
use crate::error::{Result, StdfError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Check if a path names an STDF file, optionally gzip-compressed
pub fn is_stdf_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let name = name
        .strip_suffix(&format!(".{GZIP_EXTENSION}"))
        .unwrap_or(&name);

    STDF_EXTENSIONS
        .iter()
        .any(|ext| name.ends_with(&format!(".{ext}")))
}

fn has_glob_chars(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Recursively collect STDF files under a directory
fn discover_directory(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_stdf_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    debug!("Found {} STDF files under {}", files.len(), dir.display());
    files
}

fn discover_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| {
        StdfError::configuration(format!("invalid input pattern {pattern}: {e}"))
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable match for {}: {}", pattern, e),
        }
    }

    files.sort();
    debug!("Pattern {} matched {} files", pattern, files.len());
    Ok(files)
}

/// Resolve CLI inputs into a de-duplicated, ordered list of files
///
/// Explicit files are taken as given whatever their extension. An input
/// that is neither a file, a directory nor a glob pattern is an error.
pub fn discover_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let path = Path::new(input);
        let found = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            discover_directory(path)
        } else if has_glob_chars(input) {
            discover_glob(input)?
        } else {
            return Err(StdfError::InputNotFound {
                path: path.to_path_buf(),
            });
        };

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    Ok(files)
}
