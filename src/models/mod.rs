//! Data models for devmap
//!
//! Two shapes meet during reconciliation: `ProjectRecord` is what the manifest
//! says (authoritative for identity, name, owner and timestamp) and
//! `ScanResult` is what the filesystem says (authoritative for size and the
//! version-control flag). `Project` is the registry's typed view of a record.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Timestamp layout used in the manifest, minute resolution
pub const TIMESTAMP_FORMAT: &str = "%H:%M %d-%m-%Y";

/// Owner recorded for projects discovered on disk
pub const UNKNOWN_USER: &str = "unknown";

/// Directory whose presence marks a project as version controlled
pub const VCS_MARKER: &str = ".git";

/// Identity of a project: `(folderName, lang)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey {
    pub folder_name: String,
    pub lang: String,
}

impl ProjectKey {
    pub fn new(folder_name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            lang: lang.into(),
        }
    }

    /// Backing directory of the project under `root`
    pub fn path(&self, root: &Path) -> PathBuf {
        root.join(&self.lang).join(&self.folder_name)
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.lang, self.folder_name)
    }
}

/// Derived attributes of one project directory, as measured on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub key: ProjectKey,
    pub size: u64,
    pub uses_git: bool,
}

/// A project entry as persisted in the manifest
///
/// Missing fields fall back to their defaults; keys this model does not know
/// are carried through in `extra` so a save never drops hand-written data.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "folderName", default)]
    pub folder_name: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub git: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProjectRecord {
    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(&self.folder_name, &self.lang)
    }

    /// Overwrite the filesystem-owned fields
    pub fn apply_scan(&mut self, scan: &ScanResult) {
        self.size = scan.size;
        self.git = scan.uses_git;
    }
}

/// The full manifest document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(rename = "Languages", default)]
    pub languages: Vec<String>,
    #[serde(rename = "Projects", default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(rename = "Users", default)]
    pub users: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Document {
    /// True when the document carries nothing at all
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
            && self.projects.is_empty()
            && self.users.is_empty()
            && self.extra.is_empty()
    }

    pub fn has_language(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }
}

/// A tracked project as held by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub folder_name: String,
    pub lang: String,
    pub created_by: String,
    pub created_at: DateTime<Local>,
    pub size: u64,
    pub uses_git: bool,
}

impl Project {
    /// Materialize a manifest record. An unreadable `created_at` becomes the
    /// current time instead of failing the load.
    pub fn from_record(record: &ProjectRecord) -> Self {
        Self {
            name: record.name.clone(),
            folder_name: record.folder_name.clone(),
            lang: record.lang.clone(),
            created_by: record.created_by.clone(),
            created_at: parse_timestamp_or_now(&record.created_at),
            size: record.size,
            uses_git: record.git,
        }
    }

    /// A project found on disk with no manifest record
    pub fn discovered(scan: &ScanResult) -> Self {
        Self {
            name: scan.key.folder_name.clone(),
            folder_name: scan.key.folder_name.clone(),
            lang: scan.key.lang.clone(),
            created_by: UNKNOWN_USER.to_string(),
            created_at: now_minute(),
            size: scan.size,
            uses_git: scan.uses_git,
        }
    }

    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(&self.folder_name, &self.lang)
    }

    pub fn apply_scan(&mut self, scan: &ScanResult) {
        self.size = scan.size;
        self.uses_git = scan.uses_git;
    }

    pub fn to_record(&self) -> ProjectRecord {
        ProjectRecord {
            name: self.name.clone(),
            folder_name: self.folder_name.clone(),
            lang: self.lang.clone(),
            created_by: self.created_by.clone(),
            created_at: format_timestamp(&self.created_at),
            size: self.size,
            git: self.uses_git,
            extra: BTreeMap::new(),
        }
    }
}

/// True when `name` is exactly one plain path segment, so joining it onto
/// the root can never escape it
pub fn is_plain_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

/// Format a timestamp as `HH:MM DD-MM-YYYY` in local time
pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `HH:MM DD-MM-YYYY` local timestamp
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

pub fn parse_timestamp_or_now(s: &str) -> DateTime<Local> {
    parse_timestamp(s).unwrap_or_else(now_minute)
}

/// The current local time truncated to the minute
pub fn now_minute() -> DateTime<Local> {
    let now = Local::now();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_timestamp_round_trip() {
        let ts = parse_timestamp("14:30 05-06-2024").unwrap();
        assert_eq!(ts.hour(), 14);
        assert_eq!(ts.minute(), 30);
        assert_eq!(ts.day(), 5);
        assert_eq!(ts.month(), 6);
        assert_eq!(ts.year(), 2024);
        assert_eq!(format_timestamp(&ts), "14:30 05-06-2024");
        assert_eq!(parse_timestamp(&format_timestamp(&ts)), Some(ts));
    }

    #[test]
    fn test_bad_timestamp_falls_back_to_now() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());

        let before = now_minute();
        let ts = parse_timestamp_or_now("not a time");
        assert!(ts >= before);
    }

    #[test]
    fn test_record_defaults_missing_fields() {
        let record: ProjectRecord =
            serde_json::from_str(r#"{"folderName": "tool", "lang": "Go"}"#).unwrap();
        assert_eq!(record.key(), ProjectKey::new("tool", "Go"));
        assert_eq!(record.name, "");
        assert_eq!(record.size, 0);
        assert!(!record.git);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_unknown_keys_survive() {
        let json = r#"{"Languages": [], "Projects": [{"folderName": "a", "lang": "C", "notes": "keep me"}], "Users": [], "Version": 2}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.extra.get("Version"), Some(&Value::from(2)));
        assert_eq!(
            doc.projects[0].extra.get("notes"),
            Some(&Value::from("keep me"))
        );

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["Version"], 2);
        assert_eq!(back["Projects"][0]["notes"], "keep me");
    }

    #[test]
    fn test_discovered_project_defaults() {
        let scan = ScanResult {
            key: ProjectKey::new("my-tool", "Go"),
            size: 42,
            uses_git: true,
        };
        let project = Project::discovered(&scan);
        assert_eq!(project.name, "my-tool");
        assert_eq!(project.created_by, UNKNOWN_USER);
        assert_eq!(project.size, 42);
        assert!(project.uses_git);

        let record = project.to_record();
        assert_eq!(record.key(), scan.key);
        assert_eq!(parse_timestamp(&record.created_at), Some(project.created_at));
    }

    #[test]
    fn test_plain_segments() {
        assert!(is_plain_segment("C++"));
        assert!(is_plain_segment("my tool"));
        assert!(!is_plain_segment(""));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("a/b"));
        assert!(!is_plain_segment("/etc"));
    }

    #[test]
    fn test_empty_document() {
        assert!(Document::default().is_empty());
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert!(doc.is_empty());
        let doc: Document = serde_json::from_str(r#"{"Users": ["ann"]}"#).unwrap();
        assert!(!doc.is_empty());
    }
}
