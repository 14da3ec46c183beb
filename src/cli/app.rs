//! Main CLI application structure

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{check, dep, logging, task};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "depgate")]
#[command(author, version, about = "Dependency scheduling and date-conflict validation")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new depgate project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// First day of the project range
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Last day of the project range
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Set the project date range
    Range {
        start: String,
        end: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(dep::DepCommands),

    /// Check proposed dates for a task without changing anything
    Check {
        /// Task ID
        id: String,

        /// Proposed start date (YYYY-MM-DD)
        start: String,

        /// Proposed deadline (YYYY-MM-DD)
        end: String,
    },

    /// Push downstream tasks later until their dependencies hold
    Reschedule {
        /// Task whose successors should be moved
        id: String,

        /// Show the plan without saving it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()
            .map(|config| config.global.default_format.into())
            .unwrap_or_default(),
    };
    let output = Output::new(format);

    debug!(?format, "depgate starting");

    match cli.command {
        Commands::Init { path, start, end } => init(&output, &path, start.as_deref(), end.as_deref()),
        Commands::Range { start, end } => set_range(&output, &start, &end),
        Commands::Task(cmd) => task::run(cmd, &output),
        Commands::Dep(cmd) => dep::run(cmd, &output),
        Commands::Check { id, start, end } => check::check(&output, &id, &start, &end),
        Commands::Reschedule { id, dry_run } => check::reschedule(&output, &id, dry_run),
    }
}

fn init(output: &Output, path: &str, start: Option<&str>, end: Option<&str>) -> Result<()> {
    let mut project = Project::init(path)?;
    debug!(root = %project.root().display(), "created project directory");

    if let (Some(start), Some(end)) = (start, end) {
        write_range(&mut project, start, end)?;
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "root": project.root().display().to_string(),
            "project": project.config().project.project,
        }));
    } else {
        output.success(&format!(
            "Initialized depgate project at {}",
            project.root().display()
        ));
    }

    Ok(())
}

fn set_range(output: &Output, start: &str, end: &str) -> Result<()> {
    let mut project = Project::open_current()?;
    let _lock = project.lock()?;
    let range = write_range(&mut project, start, end)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "start": range.start(),
            "end": range.end(),
        }));
    } else {
        output.success(&format!("Project range set to {}", range));
    }

    Ok(())
}

fn write_range(project: &mut Project, start: &str, end: &str) -> Result<crate::domain::DateRange> {
    let range = super::parse_range(start, end)?;

    let config = project.config_mut();
    config.project.project.start = Some(range.start());
    config.project.project.end = Some(range.end());
    config.save_project().context("Failed to save project range")?;

    Ok(range)
}
