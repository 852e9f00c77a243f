//! File system utilities.

use crate::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Replace `path` with `data` atomically.
///
/// The bytes go to a temporary file in the target directory, which is
/// synced and then renamed over `path`. Readers see either the previous
/// file or the complete new one.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    write_atomic_with(path, |file| file.write_all(data))
}

/// Like [`write_atomic`], with the content produced by `write`.
///
/// If `write` fails the temporary file is removed and `path` is untouched.
pub fn write_atomic_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
{
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    write(temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Rename a file, refusing to replace an existing target.
pub fn rename_no_clobber(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        return Err(crate::Error::FileAlreadyExists(to.display().to_string()));
    }
    std::fs::rename(from, to)?;
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a video file for the given extension list.
pub fn is_video_file(path: &Path, extensions: &[String]) -> bool {
    get_extension(path)
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Check if a file is an NFO file.
pub fn is_nfo_file(path: &Path) -> bool {
    get_extension(path).as_deref() == Some("nfo")
}
