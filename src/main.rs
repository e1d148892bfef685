//! devmap - keep a manifest of local projects in step with the disk

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use devmap::commands::{self, Invocation};

#[derive(Parser)]
#[command(name = "devmap")]
#[command(author, version, about = "Track local development projects by language and owner")]
struct Cli {
    /// Manifest file (defaults to ~/.devmap/devmap.json)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Projects root (defaults to projects_path from config.toml)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log debug details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the default manifest (first-time setup)
    Install,

    /// Reconcile the manifest with the filesystem
    Sync,

    /// List projects
    List {
        /// Show folder, creation time, size and git columns
        #[arg(short, long)]
        extra: bool,
    },

    /// List users
    Users,

    /// List languages
    Languages,

    /// Print the manifest as JSON
    Show,

    /// Add a language
    Lang {
        /// Language name (also the directory name)
        name: String,
    },

    /// Create a project
    New {
        /// Project language
        lang: String,

        /// Display name (spaces allowed)
        name: String,

        /// Folder name (defaults to the display name)
        #[arg(short, long)]
        folder: Option<String>,

        /// Derive the folder name using GitHub naming conventions
        #[arg(long, conflicts_with = "folder")]
        github_names: bool,

        /// Initialize a git repository
        #[arg(long)]
        git: bool,

        /// Template to copy into the new project
        #[arg(short, long)]
        template: Option<String>,

        /// Create the language if it does not exist
        #[arg(long)]
        create_lang: bool,
    },

    /// List templates available for a language
    Templates {
        /// Language name
        lang: String,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let ctx = Invocation::new(cli.manifest, cli.root)?;

    match cli.command {
        Commands::Install => commands::install(&ctx)?,
        Commands::Sync => commands::sync(&ctx)?,
        Commands::List { extra } => commands::list(&ctx, extra)?,
        Commands::Users => commands::users(&ctx)?,
        Commands::Languages => commands::languages(&ctx)?,
        Commands::Show => commands::show(&ctx)?,
        Commands::Lang { name } => commands::add_language(&ctx, &name)?,
        Commands::New {
            lang,
            name,
            folder,
            github_names,
            git,
            template,
            create_lang,
        } => commands::new_project(
            &ctx,
            &lang,
            &name,
            folder,
            github_names,
            git,
            template,
            create_lang,
        )?,
        Commands::Templates { lang } => commands::templates(&ctx, &lang)?,
    }

    Ok(())
}
