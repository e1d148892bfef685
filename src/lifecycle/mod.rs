//! Lifecycle controller
//!
//! Installs and loads the manifest, runs the reconciliation, and hands the
//! caller a [`Session`] holding everything later operations need. Nothing in
//! here terminates the process: an absent manifest is reported as
//! [`LifecycleError::ManifestAbsent`] or [`ManifestStatus::Absent`] and the
//! entry point decides what to do about it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::collab::git::GitClient;
use crate::collab::templates::{TemplateError, TemplateStore};
use crate::collab::ProcessRunner;
use crate::config::Config;
use crate::models::{is_plain_segment, now_minute, Document, Project, ProjectKey};
use crate::reconcile::{normalize_users, ReconcileError, Reconciler, SyncReport};
use crate::registry::Registry;
use crate::scanner;
use crate::store::{self, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("No manifest found at {0}")]
    ManifestAbsent(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Install failed: {0}")]
    Install(String),

    #[error("Language already exists: {0}")]
    LanguageExists(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Project {lang}/{folder_name} already exists")]
    ProjectExists { folder_name: String, lang: String },

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Filesystem error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether the loaded manifest has anything in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestStatus {
    Ready,
    Absent,
}

/// Where the default manifest comes from on install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// Write an empty manifest
    Empty,
    /// Clone `url` and copy `file` out of it
    Repository { url: String, file: String },
}

impl ManifestSource {
    pub fn from_config(config: &Config) -> Self {
        match &config.manifest_repo {
            Some(url) if !url.trim().is_empty() => ManifestSource::Repository {
                url: url.clone(),
                file: config.manifest_file.clone(),
            },
            _ => ManifestSource::Empty,
        }
    }
}

/// Write the default manifest to `manifest`, replacing whatever is there
pub fn install(
    manifest: &Path,
    source: &ManifestSource,
    runner: &dyn ProcessRunner,
) -> Result<(), LifecycleError> {
    if let Some(parent) = manifest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| LifecycleError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    match source {
        ManifestSource::Empty => {
            store::save(manifest, &Document::default())?;
            info!(manifest = %manifest.display(), "installed empty manifest");
        }
        ManifestSource::Repository { url, file } => {
            // Removed on drop
            let scratch = tempfile::tempdir().map_err(|source| LifecycleError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
            let checkout = scratch.path().join("defaults");

            info!(url = %url, "fetching default manifest");
            let status = GitClient::new(runner)
                .clone_repo(url, &checkout)
                .map_err(|e| LifecycleError::Install(format!("could not run git: {}", e)))?;
            if !status.success() {
                return Err(LifecycleError::Install(format!(
                    "failed to clone {} (exit status {:?})",
                    url, status.code
                )));
            }

            let fetched = checkout.join(file);
            if !fetched.is_file() {
                return Err(LifecycleError::Install(format!(
                    "{} not found in {}",
                    file, url
                )));
            }
            // Must parse before it replaces anything
            let document = store::load(&fetched)?;
            store::save(manifest, &document)?;
            info!(manifest = %manifest.display(), "installed default manifest");
        }
    }
    Ok(())
}

/// Load the manifest and reconcile it against `root`
///
/// A blank file (`{}` or `null`) that the reconciliation leaves empty is not
/// rewritten, so it keeps validating as absent until an install replaces it.
pub fn load(manifest: &Path, root: &Path) -> Result<Session, LifecycleError> {
    let loaded = match store::load_with_status(manifest) {
        Ok(loaded) => loaded,
        Err(StoreError::NotFound(path)) => return Err(LifecycleError::ManifestAbsent(path)),
        Err(err) => return Err(err.into()),
    };

    let mut session = Session {
        manifest: manifest.to_path_buf(),
        reconciler: Reconciler::new(root),
        document: loaded.document,
        blank: loaded.blank,
        registry: Registry::default(),
        report: SyncReport::default(),
    };
    session.sync()?;
    Ok(session)
}

/// Install the default manifest, then load it
pub fn install_and_load(
    manifest: &Path,
    root: &Path,
    source: &ManifestSource,
    runner: &dyn ProcessRunner,
) -> Result<Session, LifecycleError> {
    install(manifest, source, runner)?;
    load(manifest, root)
}

/// A request to create a project
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub lang: String,
    /// Explicit folder name; derived from `name` when absent
    pub folder_name: Option<String>,
    /// Derive the folder name with GitHub naming conventions
    pub github_names: bool,
    pub init_git: bool,
    pub template: Option<String>,
    /// Create `lang` if it isn't known yet
    pub create_language: bool,
    pub owner: String,
}

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));

/// Lowercase, spaces to hyphens, drop everything but ASCII alphanumerics
/// and hyphens
pub fn github_folder_name(name: &str) -> String {
    let lowered = name.to_lowercase().replace(' ', "-");
    NON_SLUG.replace_all(&lowered, "").into_owned()
}

/// A loaded, reconciled manifest and everything derived from it
#[derive(Debug)]
pub struct Session {
    manifest: PathBuf,
    reconciler: Reconciler,
    document: Document,
    /// The file on disk had no keys at all
    blank: bool,
    registry: Registry,
    report: SyncReport,
}

impl Session {
    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    pub fn root(&self) -> &Path {
        self.reconciler.root()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Report of the most recent reconciliation
    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    /// `Absent` only for a blank manifest that still holds nothing
    pub fn validate(&self) -> ManifestStatus {
        if self.blank && self.document.is_empty() {
            ManifestStatus::Absent
        } else {
            ManifestStatus::Ready
        }
    }

    /// The manifest exactly as it is persisted
    pub fn to_json_string(&self) -> Result<String, LifecycleError> {
        Ok(store::to_string(&self.document)?)
    }

    /// Reconcile again and persist
    pub fn sync(&mut self) -> Result<&SyncReport, LifecycleError> {
        let result = if self.blank {
            let result = self.reconciler.reconcile(&mut self.document)?;
            if !self.document.is_empty() {
                self.save()?;
            }
            result
        } else {
            self.reconciler.sync(&self.manifest, &mut self.document)?
        };
        self.registry = result.registry;
        self.report = result.report;
        Ok(&self.report)
    }

    fn save(&mut self) -> Result<(), LifecycleError> {
        store::save(&self.manifest, &self.document)?;
        self.blank = false;
        Ok(())
    }

    fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> LifecycleError + '_ {
        move |source| LifecycleError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Add a language: directory, manifest entry, save
    pub fn create_language(&mut self, lang: &str) -> Result<(), LifecycleError> {
        if !is_plain_segment(lang) {
            return Err(LifecycleError::InvalidName(lang.to_string()));
        }
        if self.document.has_language(lang) || self.registry.has_language(lang) {
            return Err(LifecycleError::LanguageExists(lang.to_string()));
        }

        let path = self.root().join(lang);
        if scanner::ensure_dir(&path).map_err(Self::io_error(&path))? {
            info!(path = %path.display(), "created language directory");
        }

        self.document.languages.push(lang.to_string());
        self.registry.languages.push(lang.to_string());
        self.save()?;
        info!(language = %lang, "added language");
        Ok(())
    }

    /// Create a project directory, fill it, record it and save
    pub fn create_project(
        &mut self,
        request: &NewProject,
        templates: &TemplateStore,
        git: &GitClient<'_>,
    ) -> Result<Project, LifecycleError> {
        if request.name.trim().is_empty() {
            return Err(LifecycleError::InvalidName(request.name.clone()));
        }
        if !self.registry.has_language(&request.lang) {
            if !request.create_language {
                return Err(LifecycleError::UnknownLanguage(request.lang.clone()));
            }
            self.create_language(&request.lang)?;
        }

        let folder_name = match &request.folder_name {
            Some(folder) => folder.clone(),
            None if request.github_names => github_folder_name(&request.name),
            None => request.name.clone(),
        };
        if !is_plain_segment(&folder_name) {
            return Err(LifecycleError::InvalidName(folder_name));
        }

        let key = ProjectKey::new(folder_name.as_str(), request.lang.as_str());
        if self.registry.contains(&key) || self.document.projects.iter().any(|r| r.key() == key) {
            return Err(LifecycleError::ProjectExists {
                folder_name: key.folder_name,
                lang: key.lang,
            });
        }

        if let Some(template) = &request.template {
            if !templates.exists(&request.lang, template) {
                return Err(TemplateError::NotFound {
                    lang: request.lang.clone(),
                    name: template.clone(),
                }
                .into());
            }
        }

        let path = key.path(self.root());
        if scanner::ensure_dir(&path).map_err(Self::io_error(&path))? {
            info!(path = %path.display(), "created project directory");
        } else {
            info!(path = %path.display(), "project directory already exists");
        }

        if let Some(template) = &request.template {
            templates.apply(&request.lang, template, &path)?;
        }

        if request.init_git {
            match git.init(&path) {
                Ok(status) if status.success() => {
                    info!(path = %path.display(), "initialized git repository")
                }
                Ok(status) => {
                    warn!(path = %path.display(), code = ?status.code, "git init failed")
                }
                Err(err) => warn!(path = %path.display(), error = %err, "could not run git"),
            }
        }

        let scan = scanner::scan_project(self.root(), &key);
        let mut project = Project {
            name: request.name.clone(),
            folder_name,
            lang: request.lang.clone(),
            created_by: request.owner.clone(),
            created_at: now_minute(),
            size: 0,
            uses_git: false,
        };
        project.apply_scan(&scan);

        self.document.projects.push(project.to_record());
        self.registry.projects.push(project.clone());
        normalize_users(&mut self.document, &mut self.registry);
        self.save()?;

        info!(project = %project.name, language = %project.lang, "created project");
        Ok(project)
    }
}
