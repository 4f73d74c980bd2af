//! Command-line interface module for dirsort.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Log file setup
//! - Organization, dry run and undo handling

use crate::config::{Config, ConfigError};
use crate::duplicate::DuplicateAction;
use crate::journal::{self, JournalError, MoveJournal};
use crate::messages::{ConsoleReporter, MessageKey, Reporter};
use crate::organizer::{Organizer, RunReport};
use crate::output::OutputFormatter;
use clap::Parser;
use indicatif::MultiProgress;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

/// Sort the files of a folder tree into category folders by extension.
#[derive(Debug, Parser)]
#[command(name = "dirsort", version)]
pub struct Cli {
    /// Folder whose files are organized (searched recursively; ignored by --undo)
    pub source_folder: PathBuf,

    /// Folder that receives one sub-folder per category
    pub target_folder: PathBuf,

    /// What to do when a file with the same name already exists [default: skip]
    #[arg(short = 'd', long, value_enum)]
    pub duplicate_action: Option<DuplicateAction>,

    /// Append log records to this file
    #[arg(short = 'l', long = "log", value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Configuration file (default: ./.dirsortrc.toml, then ~/.config/dirsort/config.toml)
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of parallel moves; 0 uses one per CPU
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Show where files would go without moving anything
    #[arg(long, conflicts_with = "undo")]
    pub dry_run: bool,

    /// Move the files of the last run recorded in TARGET_FOLDER back; SOURCE_FOLDER is ignored
    #[arg(long)]
    pub undo: bool,
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    Organize,
    /// Simulate the run without making changes.
    DryRun,
    /// Revert the last run recorded in the target folder.
    Undo,
}

impl Cli {
    pub fn mode(&self) -> OrganizeCommand {
        if self.undo {
            OrganizeCommand::Undo
        } else if self.dry_run {
            OrganizeCommand::DryRun
        } else {
            OrganizeCommand::Organize
        }
    }
}

/// Errors that stop the program before or outside a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not open log file {}: {source}", path.display())]
    LogFile { path: PathBuf, source: io::Error },

    #[error("could not initialize logging: {0}")]
    Logging(#[from] TryInitError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Installs the global `tracing` subscriber.
///
/// With a log file, records at `info` and above are appended to it without
/// colors. Without one, nothing is logged unless `RUST_LOG` asks for it; the
/// console status lines already cover warnings and errors.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), CliError> {
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| CliError::LogFile {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()?;
        }
        None => {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}

/// Runs the CLI application.
///
/// Configuration is resolved first; `-d` and `-j` win over the `[run]`
/// section. A run that fails during bootstrap prints the failure line and
/// still returns `Ok`: only setup problems and a failed undo are errors.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use dirsort::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["dirsort", "/home/me/Downloads", "/home/me/Sorted", "-d", "rename"]);
/// if let Err(e) = run_cli(&cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let (categories, subfolders) = config.tables()?;
    let filters = config.filters.compile()?;
    let catalog = config.catalog()?;

    let action = cli.duplicate_action.unwrap_or(config.run.duplicate_action);
    let jobs = cli.jobs.unwrap_or(config.run.jobs);
    tracing::debug!(%action, jobs, command = ?cli.mode(), "starting");

    match cli.mode() {
        OrganizeCommand::Undo => {
            let reporter = ConsoleReporter::new(catalog);
            undo_organization(&cli.target_folder, &reporter)
        }
        OrganizeCommand::DryRun => {
            let reporter = ConsoleReporter::new(catalog);
            let organizer = Organizer::new(&categories, &subfolders, &filters, &reporter)
                .with_duplicate_action(action)
                .with_jobs(jobs);
            organize_dry_run(&organizer, cli, action, &reporter);
            Ok(())
        }
        OrganizeCommand::Organize => {
            let progress = MultiProgress::new();
            let bar = progress.add(OutputFormatter::create_progress_bar(0));
            let reporter = ConsoleReporter::new(catalog).with_progress(progress);
            let organizer = Organizer::new(&categories, &subfolders, &filters, &reporter)
                .with_duplicate_action(action)
                .with_jobs(jobs);

            OutputFormatter::info(&format!(
                "Organizing {} into {}",
                cli.source_folder.display(),
                cli.target_folder.display()
            ));
            match organizer.organize(&cli.source_folder, &cli.target_folder, &bar) {
                Ok(report) => finish_run(&report, &reporter),
                Err(e) => {
                    bar.finish_and_clear();
                    tracing::error!(error = %e, "run failed");
                    reporter.report(Level::ERROR, MessageKey::RunFailed, &[]);
                }
            }
            Ok(())
        }
    }
}

/// Prints the summary of a finished run and records its journal.
fn finish_run(report: &RunReport, reporter: &dyn Reporter) {
    OutputFormatter::summary_table(&report.category_counts(), report.moved());
    if report.skipped() > 0 || report.failed() > 0 {
        OutputFormatter::warning(&format!(
            "{} skipped, {} failed",
            report.skipped(),
            report.failed()
        ));
    }

    if let Some(journal) = MoveJournal::from_report(report) {
        match journal.save() {
            Ok(path) => {
                reporter.report(Level::INFO, MessageKey::JournalSaved, &[&path.display()]);
            }
            Err(e) => {
                reporter.report(Level::WARN, MessageKey::JournalFailed, &[&e]);
            }
        }
    }

    let message = reporter.format(MessageKey::RunSucceeded, &[]);
    reporter.log(Level::INFO, &message);
    OutputFormatter::success(&message);
}

/// Prints where every file would go. Nothing is created or moved.
fn organize_dry_run(
    organizer: &Organizer<'_>,
    cli: &Cli,
    action: DuplicateAction,
    reporter: &dyn Reporter,
) {
    OutputFormatter::dry_run_notice(&format!(
        "Planning {} into {}",
        cli.source_folder.display(),
        cli.target_folder.display()
    ));

    let plan = match organizer.plan(&cli.source_folder, &cli.target_folder) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!(error = %e, "dry run failed");
            reporter.report(Level::ERROR, MessageKey::RunFailed, &[]);
            return;
        }
    };

    let mut category_counts: HashMap<String, usize> = HashMap::new();
    for planned in &plan {
        let source = planned.source.display();
        let destination = planned.destination.display();
        let line = if planned.collides {
            reporter.format(
                MessageKey::PlannedCollision,
                &[&source, &destination, &action],
            )
        } else {
            reporter.format(MessageKey::Planned, &[&source, &destination])
        };
        reporter.emit(Level::INFO, &line);
        *category_counts.entry(planned.category.clone()).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&category_counts, plan.len());
    OutputFormatter::success(&reporter.format(MessageKey::DryRunComplete, &[]));
}

/// Undoes the run recorded in `target`.
fn undo_organization(target: &Path, reporter: &dyn Reporter) -> Result<(), CliError> {
    OutputFormatter::info("Undoing previous organization...");

    let report = journal::undo(target, reporter)?;
    let summary = reporter.format(
        MessageKey::UndoComplete,
        &[&report.restored, &report.skipped.len(), &report.failed.len()],
    );
    reporter.log(Level::INFO, &summary);

    if report.is_complete_success() {
        OutputFormatter::success(&summary);
    } else {
        OutputFormatter::warning(&summary);
        OutputFormatter::warning("The journal was kept; fix the issues above and run --undo again.");
    }
    Ok(())
}
