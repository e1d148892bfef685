//! Manifest store: reading and writing the devmap.json document
//!
//! Pure data I/O. Output is deterministic: struct field order, sorted extra
//! keys and 4-space indentation.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::Document;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to access manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read and parse the manifest at `path`
pub fn load(path: &Path) -> Result<Document, StoreError> {
    Ok(load_with_status(path)?.document)
}

/// A parsed manifest plus whether the file was blank
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub document: Document,
    /// The file held `null` or an object with no keys at all
    pub blank: bool,
}

/// Read and parse the manifest, noting whether it carried any keys
pub fn load_with_status(path: &Path) -> Result<Loaded, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(path.to_path_buf())
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let parse_err = |source: serde_json::Error| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let value: Value = serde_json::from_str(&content).map_err(parse_err)?;
    let blank = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    let document = if value.is_null() {
        Document::default()
    } else {
        serde_json::from_value(value).map_err(parse_err)?
    };
    Ok(Loaded { document, blank })
}

/// Render the document exactly as `save` writes it
pub fn to_string(document: &Document) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write the document to `path`, replacing the previous file
///
/// The document is written to a sibling temp file first and renamed over
/// the target, so a crash mid-write leaves the old manifest intact. A
/// symlinked manifest is written through the link, and the existing file
/// mode is kept.
pub fn save(path: &Path, document: &Document) -> Result<(), StoreError> {
    let content = to_string(document)?;
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(content.as_bytes()).map_err(io_err)?;
    if let Ok(meta) = fs::metadata(&target) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(&target).map_err(|e| io_err(e.error))?;

    tracing::debug!(path = %path.display(), "manifest written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectRecord;
    use tempfile::TempDir;

    fn sample() -> Document {
        Document {
            languages: vec!["C++".to_string(), "Java".to_string()],
            projects: vec![ProjectRecord {
                name: "DevCore Project Manager".to_string(),
                folder_name: "DevCore-project-manager".to_string(),
                lang: "C++".to_string(),
                created_by: "Huplo".to_string(),
                created_at: "23:04 17-03-2025".to_string(),
                size: 25042,
                git: true,
                ..Default::default()
            }],
            users: vec!["Huplo".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/devmap.json");

        save(&path, &sample()).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_four_space_indent_and_key_order() {
        let text = to_string(&sample()).unwrap();
        assert!(text.starts_with("{\n    \"Languages\": [\n        \"C++\","));
        let langs = text.find("\"Languages\"").unwrap();
        let projects = text.find("\"Projects\"").unwrap();
        let users = text.find("\"Users\"").unwrap();
        assert!(langs < projects && projects < users);
        assert!(text.contains("            \"folderName\": \"DevCore-project-manager\","));
    }

    #[test]
    fn test_blank_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devmap.json");

        for text in ["{}", "null", " { } "] {
            fs::write(&path, text).unwrap();
            let loaded = load_with_status(&path).unwrap();
            assert!(loaded.blank, "{text:?} should be blank");
            assert!(loaded.document.is_empty());
        }

        save(&path, &Document::default()).unwrap();
        let loaded = load_with_status(&path).unwrap();
        assert!(!loaded.blank);
        assert!(loaded.document.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_mode_and_symlink() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.json");
        let link = dir.path().join("devmap.json");
        save(&real, &Document::default()).unwrap();
        fs::set_permissions(&real, fs::Permissions::from_mode(0o644)).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        save(&link, &sample()).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(load(&real).unwrap(), sample());
        let mode = fs::metadata(&real).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_malformed_file_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devmap.json");
        fs::write(&path, "{ \"Languages\": [ ").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
        assert!(err.to_string().contains("Failed to parse manifest"));
    }
}
