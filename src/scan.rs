//! Source discovery.
//!
//! Walks the source tree recursively and collects every file whose extension
//! is a supported input format. Matching is case-insensitive, so `IMG_01.JPG`
//! and `img_01.jpg` are both picked up.
//!
//! Entries within a directory are visited in file-name order, which makes the
//! discovery order (and so the report's failed-file order) stable across runs
//! and platforms.
//!
//! When the output directory lives inside the source tree, pass it to
//! [`discover_excluding`] so a second run does not re-convert its own output.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Input extensions, lower-case.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "webp", "gif"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// All supported images under `root`, in deterministic walk order.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    discover_excluding(root, &[])
}

/// Like [`discover`], skipping any directory in `excluded` and everything below it.
pub fn discover_excluding(root: &Path, excluded: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::SourceNotFound(root.to_path_buf()));
    }

    let excluded: Vec<PathBuf> = excluded
        .iter()
        .filter_map(|p| p.canonicalize().ok())
        .collect();

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() || excluded.is_empty() {
                return true;
            }
            entry
                .path()
                .canonicalize()
                .map(|p| !excluded.contains(&p))
                .unwrap_or(true)
        });

    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }

    tracing::debug!(root = %root.display(), count = files.len(), "discovered source images");
    Ok(files)
}
