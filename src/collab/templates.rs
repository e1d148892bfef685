//! Project templates
//!
//! Templates live under `<templates>/<language>/<template>/` and are copied
//! wholesale into a new project directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::models::is_plain_segment;
use crate::scanner;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("No template '{name}' for language '{lang}'")]
    NotFound { lang: String, name: String },

    #[error("Failed to walk template: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to copy template: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template names available for `lang`, sorted; empty if there are none
    pub fn list(&self, lang: &str) -> Vec<String> {
        if !is_plain_segment(lang) || !self.root.join(lang).is_dir() {
            return Vec::new();
        }
        scanner::list_project_dirs(&self.root, lang).unwrap_or_else(|err| {
            tracing::warn!(language = %lang, error = %err, "failed to list templates");
            Vec::new()
        })
    }

    pub fn exists(&self, lang: &str, name: &str) -> bool {
        is_plain_segment(lang) && is_plain_segment(name) && self.root.join(lang).join(name).is_dir()
    }

    /// Copy the template's full subtree into `dest`, overwriting files that
    /// already exist. Returns the number of files copied.
    pub fn apply(&self, lang: &str, name: &str, dest: &Path) -> Result<usize, TemplateError> {
        let source = self.root.join(lang).join(name);
        if !self.exists(lang, name) {
            return Err(TemplateError::NotFound {
                lang: lang.to_string(),
                name: name.to_string(),
            });
        }

        fs::create_dir_all(dest)?;
        let mut copied = 0;
        for entry in WalkDir::new(&source).min_depth(1) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&source)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.path().is_file() {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
                copied += 1;
            }
        }

        tracing::info!(template = %name, language = %lang, files = copied, dest = %dest.display(), "applied template");
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_template() -> (TempDir, TemplateStore) {
        let dir = TempDir::new().unwrap();
        let tpl = dir.path().join("Rust/cli");
        fs::create_dir_all(tpl.join("src")).unwrap();
        fs::write(tpl.join("Cargo.toml"), "[package]\n").unwrap();
        fs::write(tpl.join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::create_dir_all(dir.path().join("Rust/lib")).unwrap();
        let store = TemplateStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_list_templates() {
        let (_dir, store) = store_with_template();
        assert_eq!(store.list("Rust"), vec!["cli", "lib"]);
        assert!(store.list("Go").is_empty());
    }

    #[test]
    fn test_apply_copies_subtree() {
        let (_dir, store) = store_with_template();
        let dest = TempDir::new().unwrap();
        let target = dest.path().join("tool");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("Cargo.toml"), "stale").unwrap();

        let copied = store.apply("Rust", "cli", &target).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(target.join("Cargo.toml")).unwrap(), "[package]\n");
        assert!(target.join("src/main.rs").is_file());
    }

    #[test]
    fn test_unknown_template() {
        let (_dir, store) = store_with_template();
        assert!(store.exists("Rust", "cli"));
        assert!(!store.exists("Rust", "web"));
        assert!(!store.exists("Rust", "../Rust/cli"));
        let dest = TempDir::new().unwrap();
        let err = store.apply("Rust", "web", dest.path()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }
}
