//! Reconciliation engine
//!
//! Merges the manifest with the directory tree under the scan root:
//!
//! 1. every manifest language gets a directory
//! 2. language directories on disk are appended to the manifest
//! 3. the registry is materialized from the manifest
//! 4. missing project directories are recreated (empty)
//! 5. size and git flag are refreshed for projects present on disk
//! 6. project directories without a record are appended as new projects
//! 7. users become the union of listed users and project owners
//! 8. the document is saved
//!
//! Discovery only ever adds. Records whose directory vanished are kept as
//! they are. With duplicate `(folderName, lang)` records only the first one
//! is refreshed. Running the pipeline twice without outside changes writes
//! the same bytes both times.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::{is_plain_segment, Document, Project, ProjectKey};
use crate::registry::Registry;
use crate::scanner;
use crate::store::{self, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Invalid projects root {root}: {reason}")]
    ConfigInvalid { root: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An item the pipeline could not process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub path: PathBuf,
    pub reason: String,
}

/// What one reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created_language_dirs: Vec<String>,
    pub discovered_languages: Vec<String>,
    pub restored_projects: Vec<ProjectKey>,
    pub refreshed: Vec<ProjectKey>,
    pub discovered_projects: Vec<ProjectKey>,
    pub skipped: Vec<SkippedItem>,
}

impl SyncReport {
    fn skip(&mut self, path: PathBuf, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(path = %path.display(), %reason, "skipping");
        self.skipped.push(SkippedItem { path, reason });
    }
}

/// Result of a reconciliation pass
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub registry: Registry,
    pub report: SyncReport,
}

/// Runs the pipeline against one scan root
#[derive(Debug, Clone)]
pub struct Reconciler {
    root: PathBuf,
}

impl Reconciler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reconcile `document` in place and persist it to `manifest`
    pub fn sync(
        &self,
        manifest: &Path,
        document: &mut Document,
    ) -> Result<Reconciliation, ReconcileError> {
        let result = self.reconcile(document)?;
        store::save(manifest, document)?;
        info!(
            manifest = %manifest.display(),
            projects = document.projects.len(),
            "manifest synchronized"
        );
        Ok(result)
    }

    /// Steps 1-7 without persisting
    pub fn reconcile(&self, document: &mut Document) -> Result<Reconciliation, ReconcileError> {
        self.check_root()?;
        let mut report = SyncReport::default();

        self.bootstrap_languages(document, &mut report);
        self.discover_languages(document, &mut report)?;

        let mut registry = Registry::materialize(document);

        self.restore_project_dirs(document, &mut registry, &mut report);
        self.refresh_derived(document, &mut registry, &mut report);
        self.discover_projects(document, &mut registry, &mut report);
        normalize_users(document, &mut registry);

        Ok(Reconciliation { registry, report })
    }

    fn check_root(&self) -> Result<(), ReconcileError> {
        if self.root.is_dir() {
            return Ok(());
        }
        let reason = if self.root.exists() {
            "not a directory"
        } else {
            "does not exist"
        };
        Err(ReconcileError::ConfigInvalid {
            root: self.root.clone(),
            reason: reason.to_string(),
        })
    }

    fn bootstrap_languages(&self, document: &Document, report: &mut SyncReport) {
        for lang in &document.languages {
            let path = self.root.join(lang);
            if !is_plain_segment(lang) {
                report.skip(path, format!("invalid language name {:?}", lang));
                continue;
            }
            match scanner::ensure_dir(&path) {
                Ok(true) => {
                    info!(path = %path.display(), "created language directory");
                    report.created_language_dirs.push(lang.clone());
                }
                Ok(false) => {}
                Err(err) => report.skip(path, err.to_string()),
            }
        }
    }

    fn discover_languages(
        &self,
        document: &mut Document,
        report: &mut SyncReport,
    ) -> Result<(), ReconcileError> {
        let on_disk =
            scanner::list_language_dirs(&self.root).map_err(|e| ReconcileError::ConfigInvalid {
                root: self.root.clone(),
                reason: e.to_string(),
            })?;

        for lang in on_disk {
            if document.has_language(&lang) {
                continue;
            }
            info!(language = %lang, "added language from filesystem");
            document.languages.push(lang.clone());
            report.discovered_languages.push(lang);
        }
        Ok(())
    }

    /// Recreate missing project directories. A restored language directory
    /// is listed in Languages right away so the next run sees nothing new.
    fn restore_project_dirs(
        &self,
        document: &mut Document,
        registry: &mut Registry,
        report: &mut SyncReport,
    ) {
        let keys: Vec<ProjectKey> = registry.projects.iter().map(|p| p.key()).collect();
        for key in keys {
            let path = key.path(&self.root);
            if !is_plain_segment(&key.lang) || !is_plain_segment(&key.folder_name) {
                report.skip(path, format!("invalid project identity {:?}", key.to_string()));
                continue;
            }
            let result = scanner::ensure_dir(&path);
            if self.root.join(&key.lang).is_dir() && !document.has_language(&key.lang) {
                info!(language = %key.lang, "added language of listed project");
                document.languages.push(key.lang.clone());
                registry.languages.push(key.lang.clone());
                report.discovered_languages.push(key.lang.clone());
            }
            match result {
                Ok(true) => {
                    info!(path = %path.display(), "created project directory");
                    report.restored_projects.push(key);
                }
                Ok(false) => {}
                Err(err) => report.skip(path, err.to_string()),
            }
        }
    }

    fn refresh_derived(
        &self,
        document: &mut Document,
        registry: &mut Registry,
        report: &mut SyncReport,
    ) {
        let mut seen = HashSet::new();
        for (idx, record) in document.projects.iter_mut().enumerate() {
            let key = record.key();
            if !seen.insert(key.clone()) {
                continue;
            }
            if !is_plain_segment(&key.lang) || !is_plain_segment(&key.folder_name) {
                continue;
            }
            if !key.path(&self.root).is_dir() {
                continue;
            }

            let scan = scanner::scan_project(&self.root, &key);
            record.apply_scan(&scan);
            if let Some(project) = registry.projects.get_mut(idx) {
                project.apply_scan(&scan);
            }
            report.refreshed.push(key);
        }
    }

    fn discover_projects(
        &self,
        document: &mut Document,
        registry: &mut Registry,
        report: &mut SyncReport,
    ) {
        let mut known = registry.keys();
        for lang in registry.languages.clone() {
            if !is_plain_segment(&lang) || !self.root.join(&lang).is_dir() {
                continue;
            }
            let folders = match scanner::list_project_dirs(&self.root, &lang) {
                Ok(folders) => folders,
                Err(err) => {
                    report.skip(self.root.join(&lang), err.to_string());
                    continue;
                }
            };

            for folder in folders {
                let key = ProjectKey::new(folder, lang.as_str());
                if known.contains(&key) {
                    continue;
                }
                let scan = scanner::scan_project(&self.root, &key);
                let project = Project::discovered(&scan);
                info!(project = %key.folder_name, language = %key.lang, "added project from filesystem");

                document.projects.push(project.to_record());
                registry.projects.push(project);
                known.insert(key.clone());
                report.discovered_projects.push(key);
            }
        }
    }
}

/// Replace the user list with listed users plus every project owner
pub(crate) fn normalize_users(document: &mut Document, registry: &mut Registry) {
    let users: BTreeSet<String> = document
        .users
        .iter()
        .cloned()
        .chain(
            registry
                .projects
                .iter()
                .map(|p| p.created_by.clone()),
        )
        .collect();

    document.users = users.iter().cloned().collect();
    registry.users = users;
}
