//! Video file selection
//!
//! This module decides which input paths are taggable video files. Only a
//! fixed set of extensions is accepted; directories given on the command
//! line are expanded recursively.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File extensions we accept as input, compared case-insensitively
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "m4v"];

/// Errors that can occur during file selection
#[derive(Debug, Error)]
pub enum FileError {
    /// The file extension is not on the allow-list
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(PathBuf),

    /// Path does not exist
    #[error("Path does not exist: {0}")]
    NotFound(PathBuf),

    /// Failed to read directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },
}

/// Input paths split into accepted video files and rejected paths
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedFiles {
    pub videos: Vec<PathBuf>,
    pub rejected: Vec<PathBuf>,
}

/// True if the path carries a supported video extension
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_VIDEO_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
}

/// Checks every path against the allow-list
///
/// # Errors
///
/// Returns the first path whose extension is not supported.
pub fn ensure_supported(paths: &[PathBuf]) -> Result<(), FileError> {
    match paths.iter().find(|path| !is_supported_video(path)) {
        Some(path) => Err(FileError::UnsupportedExtension(path.clone())),
        None => Ok(()),
    }
}

/// Expands command line inputs into the list of files to process
///
/// Files are accepted or rejected by extension. Directories are scanned
/// recursively, where unsupported files are skipped silently. Accepted
/// videos keep the order of the inputs; files from one directory are sorted.
pub fn collect_video_files(inputs: &[PathBuf]) -> Result<CollectedFiles, FileError> {
    let mut collected = CollectedFiles::default();

    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            scan_directory_recursive(input, &mut found)?;
            found.sort();
            collected.videos.extend(found);
        } else if input.is_file() {
            if is_supported_video(input) {
                collected.videos.push(input.clone());
            } else {
                collected.rejected.push(input.clone());
            }
        } else {
            return Err(FileError::NotFound(input.clone()));
        }
    }

    Ok(collected)
}

/// Recursively scans a directory and collects video files
fn scan_directory_recursive(dir_path: &Path, video_files: &mut Vec<PathBuf>) -> Result<(), FileError> {
    let entries = fs::read_dir(dir_path).map_err(|e| FileError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let path = entry
            .map_err(|e| FileError::ReadDirectoryFailed {
                path: dir_path.to_path_buf(),
                source: e,
            })?
            .path();

        if path.is_dir() {
            scan_directory_recursive(&path, video_files)?;
        } else if path.is_file() && is_supported_video(&path) {
            video_files.push(path);
        }
    }

    Ok(())
}
