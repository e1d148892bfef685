//! Configuration management for devmap
//!
//! Handles the ~/.devmap/ directory structure and config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::UNKNOWN_USER;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Scan root, relative to the home directory unless absolute
    pub projects_path: String,
    /// Template root, relative to the home directory unless absolute
    pub templates_path: String,
    /// Git repository holding the default manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_repo: Option<String>,
    /// Manifest file name inside `manifest_repo`
    pub manifest_file: String,
    /// Owner recorded for new projects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects_path: "Projects".to_string(),
            templates_path: ".devmap/templates".to_string(),
            manifest_repo: None,
            manifest_file: "devmap.json".to_string(),
            user: None,
        }
    }
}

impl Config {
    pub fn projects_root(&self, home: &Path) -> PathBuf {
        resolve(home, &self.projects_path)
    }

    pub fn templates_root(&self, home: &Path) -> PathBuf {
        resolve(home, &self.templates_path)
    }

    /// Owner for projects created from this machine
    pub fn owner(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}

fn resolve(home: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

/// Returns paths to all devmap files
#[derive(Debug, Clone)]
pub struct DevmapPaths {
    pub home: PathBuf,
    pub root: PathBuf,
    pub config: PathBuf,
    pub manifest: PathBuf,
}

impl DevmapPaths {
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::with_home(home))
    }

    /// Layout under an explicit home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let root = home.join(".devmap");
        Self {
            config: root.join("config.toml"),
            manifest: root.join("devmap.json"),
            root,
            home,
        }
    }

    /// Create the devmap directory if it doesn't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).context("Failed to create devmap root")?;
        Ok(())
    }
}

/// Load configuration from disk, falling back to defaults when absent
pub fn load_config(paths: &DevmapPaths) -> Result<Config> {
    if !paths.config.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&paths.config).context("Failed to read config.toml")?;
    toml::from_str(&content).context("Failed to parse config.toml")
}

/// Save configuration to disk
pub fn save_config(paths: &DevmapPaths, config: &Config) -> Result<()> {
    paths.ensure_dirs()?;
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(&paths.config, content).context("Failed to write config.toml")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let paths = DevmapPaths::with_home(dir.path());
        let config = load_config(&paths).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.projects_root(dir.path()), dir.path().join("Projects"));
    }

    #[test]
    fn test_partial_config_and_absolute_paths() {
        let dir = TempDir::new().unwrap();
        let paths = DevmapPaths::with_home(dir.path());
        paths.ensure_dirs().unwrap();
        fs::write(
            &paths.config,
            "projects_path = \"/srv/code\"\nuser = \"ann\"\n",
        )
        .unwrap();

        let config = load_config(&paths).unwrap();
        assert_eq!(config.projects_root(dir.path()), PathBuf::from("/srv/code"));
        assert_eq!(config.templates_root(dir.path()), dir.path().join(".devmap/templates"));
        assert_eq!(config.owner(), "ann");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let paths = DevmapPaths::with_home(dir.path());
        let config = Config {
            manifest_repo: Some("https://example.com/defaults.git".to_string()),
            ..Config::default()
        };
        save_config(&paths, &config).unwrap();
        assert_eq!(load_config(&paths).unwrap(), config);
    }

    #[test]
    fn test_bad_toml() {
        let dir = TempDir::new().unwrap();
        let paths = DevmapPaths::with_home(dir.path());
        paths.ensure_dirs().unwrap();
        fs::write(&paths.config, "projects_path = [").unwrap();
        assert!(load_config(&paths).is_err());
    }
}
