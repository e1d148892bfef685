//! CLI commands for devmap

use anyhow::{bail, Context as _, Result};
use std::path::PathBuf;

use crate::collab::git::GitClient;
use crate::collab::templates::TemplateStore;
use crate::collab::SystemRunner;
use crate::config::{load_config, Config, DevmapPaths};
use crate::lifecycle::{self, LifecycleError, ManifestSource, ManifestStatus, NewProject, Session};
use crate::reconcile::SyncReport;
use crate::registry::Table;

/// Resolved locations for one invocation
pub struct Invocation {
    pub paths: DevmapPaths,
    pub config: Config,
    pub manifest: PathBuf,
    pub root: PathBuf,
}

impl Invocation {
    pub fn new(manifest: Option<PathBuf>, root: Option<PathBuf>) -> Result<Self> {
        let paths = DevmapPaths::new()?;
        let config = load_config(&paths)?;
        let manifest = manifest.unwrap_or_else(|| paths.manifest.clone());
        let root = root.unwrap_or_else(|| config.projects_root(&paths.home));
        Ok(Self {
            paths,
            config,
            manifest,
            root,
        })
    }

    pub fn templates(&self) -> TemplateStore {
        TemplateStore::new(self.config.templates_root(&self.paths.home))
    }

    /// Load and reconcile, refusing to continue on an empty manifest
    pub fn session(&self) -> Result<Session> {
        let session = match lifecycle::load(&self.manifest, &self.root) {
            Ok(session) => session,
            Err(LifecycleError::ManifestAbsent(path)) => bail!(
                "No manifest found at {}. Run `devmap install` to create the default one.",
                path.display()
            ),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to load manifest {}", self.manifest.display())
                })
            }
        };

        if session.validate() == ManifestStatus::Absent {
            bail!(
                "The manifest at {} is empty. Run `devmap install` to install the default one, or edit it by hand.",
                self.manifest.display()
            );
        }
        Ok(session)
    }
}

/// Install the default manifest and reconcile it
pub fn install(ctx: &Invocation) -> Result<()> {
    let source = ManifestSource::from_config(&ctx.config);
    std::fs::create_dir_all(&ctx.root)
        .with_context(|| format!("Failed to create projects root {}", ctx.root.display()))?;

    let session = lifecycle::install_and_load(&ctx.manifest, &ctx.root, &source, &SystemRunner)
        .context("Failed to install the default manifest")?;

    println!("Installed manifest at {}", session.manifest_path().display());
    print_report(session.report());
    println!();
    println!("Next steps:");
    println!("  devmap list --extra           List tracked projects");
    println!("  devmap new <lang> <name>      Create a project");
    println!("  devmap sync                   Reconcile with the filesystem");
    Ok(())
}

pub fn sync(ctx: &Invocation) -> Result<()> {
    let session = ctx.session()?;
    println!("Synchronized {}", session.manifest_path().display());
    print_report(session.report());
    Ok(())
}

pub fn list(ctx: &Invocation, extra: bool) -> Result<()> {
    let session = ctx.session()?;
    let table = session.registry().projects_table(extra);
    if table.is_empty() {
        println!("No projects found.");
        println!("Create one with: devmap new <lang> <name>");
        return Ok(());
    }
    print_table(&table);
    Ok(())
}

pub fn users(ctx: &Invocation) -> Result<()> {
    let session = ctx.session()?;
    print_table(&session.registry().users_table());
    Ok(())
}

pub fn languages(ctx: &Invocation) -> Result<()> {
    let session = ctx.session()?;
    print_table(&session.registry().languages_table());
    Ok(())
}

pub fn show(ctx: &Invocation) -> Result<()> {
    let session = ctx.session()?;
    println!("{}", session.to_json_string()?);
    Ok(())
}

pub fn add_language(ctx: &Invocation, lang: &str) -> Result<()> {
    let mut session = ctx.session()?;
    match session.create_language(lang) {
        Ok(()) => println!("✓ Added language {}", lang),
        Err(LifecycleError::LanguageExists(_)) => println!("Language already exists: {}", lang),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

pub fn templates(ctx: &Invocation, lang: &str) -> Result<()> {
    let store = ctx.templates();
    let names = store.list(lang);
    if names.is_empty() {
        println!("No templates available for '{}' in {}", lang, store.root().display());
        return Ok(());
    }
    let rows = names.into_iter().map(|n| vec![n]).collect();
    print_table(&Table::new(&format!("Templates ({})", lang), vec!["Template"], rows));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn new_project(
    ctx: &Invocation,
    lang: &str,
    name: &str,
    folder: Option<String>,
    github_names: bool,
    init_git: bool,
    template: Option<String>,
    create_lang: bool,
) -> Result<()> {
    let mut session = ctx.session()?;
    let request = NewProject {
        name: name.to_string(),
        lang: lang.to_string(),
        folder_name: folder,
        github_names,
        init_git,
        template,
        create_language: create_lang,
        owner: ctx.config.owner(),
    };

    let runner = SystemRunner;
    let git = GitClient::new(&runner);
    let project = session
        .create_project(&request, &ctx.templates(), &git)
        .with_context(|| format!("Failed to create project '{}'", name))?;

    println!("✓ Created project: {}", project.name);
    println!("  Folder:   {}", project.key().path(session.root()).display());
    println!("  Language: {}", project.lang);
    println!("  Size:     {} bytes", project.size);
    println!("  Git:      {}", if project.uses_git { "yes" } else { "no" });
    Ok(())
}

fn print_report(report: &SyncReport) {
    let counts = [
        ("language directories created", report.created_language_dirs.len()),
        ("languages discovered", report.discovered_languages.len()),
        ("project directories restored", report.restored_projects.len()),
        ("projects refreshed", report.refreshed.len()),
        ("projects discovered", report.discovered_projects.len()),
    ];
    for (label, count) in counts {
        println!("  {:<30} {}", label, count);
    }
    for key in &report.discovered_projects {
        println!("  + {}", key);
    }
    if !report.skipped.is_empty() {
        println!("  ⚠ {} item(s) skipped:", report.skipped.len());
        for item in &report.skipped {
            println!("    {}: {}", item.path.display(), item.reason);
        }
    }
}

/// Render a table as aligned text
pub fn render_table(table: &Table) -> String {
    let widths = table.column_widths();
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    if !table.title.is_empty() {
        out.push_str(&table.title);
        out.push('\n');
    }
    out.push_str(&line(table.header.as_slice()));
    out.push('\n');
    let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"-".repeat(total));
    out.push('\n');
    for row in &table.rows {
        out.push_str(&line(row.as_slice()));
        out.push('\n');
    }
    out
}

fn print_table(table: &Table) {
    print!("{}", render_table(table));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_alignment() {
        let table = Table::new(
            "Projects",
            vec!["Created By", "Name"],
            vec![
                vec!["ann".to_string(), "Tool".to_string()],
                vec!["unknown".to_string(), "x".to_string()],
            ],
        );
        let rendered = render_table(&table);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Projects");
        assert_eq!(lines[1], "Created By  Name");
        assert_eq!(lines[2], "----------------");
        assert_eq!(lines[3], "ann         Tool");
        assert_eq!(lines[4], "unknown     x");
    }
}
