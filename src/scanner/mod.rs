//! Filesystem scanner
//!
//! Enumerates language and project directories under the scan root and
//! measures the derived project attributes.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

use crate::models::{ProjectKey, ScanResult, VCS_MARKER};

/// Directory names directly under `root`, sorted
pub fn list_language_dirs(root: &Path) -> io::Result<Vec<String>> {
    list_dirs(root)
}

/// Directory names directly under `root/lang`, sorted
pub fn list_project_dirs(root: &Path, lang: &str) -> io::Result<Vec<String>> {
    list_dirs(&root.join(lang))
}

fn list_dirs(path: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        // Follows symlinks, like a plain directory listing would
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => {
                tracing::warn!(name = ?raw, parent = %path.display(), "skipping non UTF-8 directory name");
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Total bytes of regular files anywhere below `path`
///
/// Symlinks are not followed and not counted. Entries that vanish or cannot
/// be read during the walk are skipped.
pub fn folder_size(path: &Path) -> u64 {
    if !path.is_dir() {
        return 0;
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

/// True iff a `.git` directory sits directly under `path`
pub fn has_version_control_marker(path: &Path) -> bool {
    path.join(VCS_MARKER).is_dir()
}

/// Create `path` and its parents. Returns whether anything was created.
pub fn ensure_dir(path: &Path) -> io::Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path)?;
    Ok(true)
}

/// Measure one project directory
pub fn scan_project(root: &Path, key: &ProjectKey) -> ScanResult {
    let path = key.path(root);
    ScanResult {
        key: key.clone(),
        size: folder_size(&path),
        uses_git: has_version_control_marker(&path),
    }
}
