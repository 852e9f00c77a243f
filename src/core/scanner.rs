//! Directory scanner module.
//!
//! Walks a library root for NFO files, never descending into excluded
//! directories (NAS metadata folders, recycle bins and the like).

use crate::utils::fs as fs_utils;
use crate::Result;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Result of scanning a directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// NFO files found, sorted by path.
    pub nfo_files: Vec<PathBuf>,
    /// Directories skipped because of the exclude list.
    pub excluded_dirs: Vec<PathBuf>,
    /// Total files scanned.
    pub total_files_scanned: usize,
    /// Total directories scanned.
    pub total_dirs_scanned: usize,
}

/// Check if a directory entry is on the exclude list.
fn is_excluded(entry: &DirEntry, exclude_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && exclude_dirs
            .iter()
            .any(|name| entry.file_name().to_string_lossy() == name.as_str())
}

/// Scan a directory for NFO files.
///
/// # Arguments
/// * `path` - The directory path to scan
/// * `exclude_dirs` - Directory names that are never entered
///
/// # Returns
/// A `ScanResult` with the NFO files in path order.
pub fn scan_directory(path: &Path, exclude_dirs: &[String]) -> Result<ScanResult> {
    fs_utils::ensure_directory(path)?;

    let mut result = ScanResult::default();
    let mut excluded = Vec::new();

    let walker = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if is_excluded(entry, exclude_dirs) {
                tracing::debug!("Excluded directory: {}", entry.path().display());
                excluded.push(entry.path().to_path_buf());
                false
            } else {
                true
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read directory entry: {}", e);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            result.total_dirs_scanned += 1;
        } else if entry.file_type().is_file() {
            result.total_files_scanned += 1;
            if fs_utils::is_nfo_file(entry.path()) {
                result.nfo_files.push(entry.into_path());
            }
        }
    }

    result.excluded_dirs = excluded;
    result.nfo_files.sort();
    result.excluded_dirs.sort();

    tracing::info!(
        "Scanned {} files in {} directories: {} NFO files, {} excluded dirs",
        result.total_files_scanned,
        result.total_dirs_scanned,
        result.nfo_files.len(),
        result.excluded_dirs.len()
    );

    Ok(result)
}
