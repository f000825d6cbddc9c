//! File selection and free-text input handling

use super::menu::VideoFile;
use crate::error::{Result, ValidationError};
use std::path::{Path, PathBuf};

/// Extensions offered in the browse listing
const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "wmv"];

/// List video files directly inside `dir`, sorted by name
///
/// Only regular files with a known video extension are included; the
/// extension match ignores case.
pub fn list_video_files(dir: &Path) -> Result<Vec<VideoFile>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_file = entry.metadata().map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        if has_video_extension(&path) {
            files.push(VideoFile::new(path));
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Outcome of a browse scan
#[derive(Debug, Clone, PartialEq)]
pub enum BrowseDecision {
    Empty,
    /// A single match skips the selection prompt entirely
    AutoSelect(VideoFile),
    Choose(Vec<VideoFile>),
}

pub fn decide_browse(mut files: Vec<VideoFile>) -> BrowseDecision {
    match files.len() {
        0 => BrowseDecision::Empty,
        1 => BrowseDecision::AutoSelect(files.remove(0)),
        _ => BrowseDecision::Choose(files),
    }
}

/// Validate a manually entered file path
///
/// The empty check happens before any file-system access. Symlinks are
/// resolved, so the returned path is canonical.
pub fn validate_manual_path(raw: &str) -> std::result::Result<PathBuf, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    let path = PathBuf::from(trimmed);
    let resolved = path
        .canonicalize()
        .map_err(|_| ValidationError::PathDoesNotExist(path.clone()))?;

    let metadata = std::fs::metadata(&resolved)
        .map_err(|_| ValidationError::PathDoesNotExist(resolved.clone()))?;
    if !metadata.is_file() {
        return Err(ValidationError::NotRegularFile(resolved));
    }

    Ok(resolved)
}

/// Split a comma-separated tag string, trimming and dropping empties
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
