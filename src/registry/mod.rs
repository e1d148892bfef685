//! In-memory project registry
//!
//! Materialized from the manifest document at the start of a reconciliation
//! and kept index-aligned with `Document::projects` for its whole lifetime:
//! `projects[i]` is the typed view of `document.projects[i]`.

use std::collections::{BTreeSet, HashSet};

use crate::models::{format_timestamp, Document, Project, ProjectKey};

/// Known languages, projects and users
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub languages: Vec<String>,
    pub projects: Vec<Project>,
    pub users: BTreeSet<String>,
}

impl Registry {
    /// Build the registry from a document. Timestamps that fail to parse
    /// are replaced by the current time.
    pub fn materialize(document: &Document) -> Self {
        Self {
            languages: document.languages.clone(),
            projects: document.projects.iter().map(Project::from_record).collect(),
            users: document.users.iter().cloned().collect(),
        }
    }

    pub fn has_language(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    /// First project with the given identity
    pub fn find(&self, key: &ProjectKey) -> Option<&Project> {
        self.projects.iter().find(|p| p.key() == *key)
    }

    pub fn contains(&self, key: &ProjectKey) -> bool {
        self.find(key).is_some()
    }

    pub fn keys(&self) -> HashSet<ProjectKey> {
        self.projects.iter().map(Project::key).collect()
    }

    /// Projects table, short or extended form
    pub fn projects_table(&self, extra: bool) -> Table {
        let (header, rows) = if extra {
            (
                vec![
                    "Created By",
                    "Name",
                    "Folder",
                    "Language",
                    "Created At",
                    "Size",
                    "Git",
                ],
                self.projects
                    .iter()
                    .map(|p| {
                        vec![
                            p.created_by.clone(),
                            p.name.clone(),
                            p.folder_name.clone(),
                            p.lang.clone(),
                            format_timestamp(&p.created_at),
                            p.size.to_string(),
                            if p.uses_git { "Yes" } else { "No" }.to_string(),
                        ]
                    })
                    .collect(),
            )
        } else {
            (
                vec!["Created By", "Name", "Language"],
                self.projects
                    .iter()
                    .map(|p| vec![p.created_by.clone(), p.name.clone(), p.lang.clone()])
                    .collect(),
            )
        };
        Table::new("Projects", header, rows)
    }

    pub fn users_table(&self) -> Table {
        Table::new(
            "",
            vec!["Users"],
            self.users.iter().map(|u| vec![u.clone()]).collect(),
        )
    }

    pub fn languages_table(&self) -> Table {
        Table::new(
            "",
            vec!["Languages"],
            self.languages.iter().map(|l| vec![l.clone()]).collect(),
        )
    }
}

/// Header labels and row data, ready for a console renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(title: &str, header: Vec<&str>, rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.to_string(),
            header: header.into_iter().map(str::to_string).collect(),
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Width of each column: the longest cell or header label
    pub fn column_widths(&self) -> Vec<usize> {
        self.header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectRecord;

    fn doc() -> Document {
        Document {
            languages: vec!["Go".to_string(), "Rust".to_string()],
            projects: vec![
                ProjectRecord {
                    name: "Tool".to_string(),
                    folder_name: "tool".to_string(),
                    lang: "Go".to_string(),
                    created_by: "ann".to_string(),
                    created_at: "09:05 01-02-2023".to_string(),
                    size: 1234,
                    git: true,
                    ..Default::default()
                },
                ProjectRecord {
                    name: "Broken clock".to_string(),
                    folder_name: "clock".to_string(),
                    lang: "Rust".to_string(),
                    created_by: "bob".to_string(),
                    created_at: "garbage".to_string(),
                    ..Default::default()
                },
            ],
            users: vec!["carol".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_materialize_keeps_order_and_tolerates_bad_dates() {
        let registry = Registry::materialize(&doc());
        assert_eq!(registry.projects.len(), 2);
        assert_eq!(registry.projects[0].folder_name, "tool");
        assert_eq!(format_timestamp(&registry.projects[0].created_at), "09:05 01-02-2023");
        assert_eq!(registry.projects[1].folder_name, "clock");
        assert!(registry.contains(&ProjectKey::new("clock", "Rust")));
        assert!(!registry.contains(&ProjectKey::new("clock", "Go")));
        assert!(registry.has_language("Rust"));
    }

    #[test]
    fn test_projects_table_forms() {
        let registry = Registry::materialize(&doc());

        let short = registry.projects_table(false);
        assert_eq!(short.header, vec!["Created By", "Name", "Language"]);
        assert_eq!(short.rows[0], vec!["ann", "Tool", "Go"]);

        let long = registry.projects_table(true);
        assert_eq!(long.header.len(), 7);
        assert_eq!(
            long.rows[0],
            vec!["ann", "Tool", "tool", "Go", "09:05 01-02-2023", "1234", "Yes"]
        );
        assert_eq!(long.rows[1][6], "No");
    }

    #[test]
    fn test_column_widths() {
        let registry = Registry::materialize(&doc());
        let table = registry.projects_table(false);
        assert_eq!(table.column_widths(), vec![10, 12, 8]);
    }
}
