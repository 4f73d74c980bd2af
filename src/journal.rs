//! Move journal and undo.
//!
//! After a run that moved at least one file, the moves are written to
//! `<target>/.dirsort_journal.json`. [`undo`] reads that file back and puts
//! every file where it came from, newest move first.

use crate::duplicate;
use crate::messages::{MessageKey, Reporter};
use crate::mover::{self, MoveOutcome};
use crate::organizer::RunReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

pub const JOURNAL_FILE_NAME: &str = ".dirsort_journal.json";

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("no journal found at {}; nothing to undo", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read journal {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write journal {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("journal {} is corrupted: {source}", path.display())]
    Corrupted {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize journal: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One recorded move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub category: String,
}

/// The moves of one run, in the order they completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveJournal {
    pub timestamp: DateTime<Utc>,
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub entries: Vec<JournalEntry>,
}

impl MoveJournal {
    /// Builds the journal of a run; `None` when nothing moved.
    pub fn from_report(report: &RunReport) -> Option<Self> {
        let entries: Vec<_> = report
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                MoveOutcome::Moved {
                    source,
                    destination,
                    category,
                } => Some(JournalEntry {
                    source: source.clone(),
                    destination: destination.clone(),
                    category: category.clone(),
                }),
                _ => None,
            })
            .collect();

        if entries.is_empty() {
            return None;
        }

        Some(Self {
            timestamp: Utc::now(),
            source_root: report.source_root.clone(),
            target_root: report.target_root.clone(),
            entries,
        })
    }

    pub fn path(target_root: &Path) -> PathBuf {
        target_root.join(JOURNAL_FILE_NAME)
    }

    /// Writes the journal into its target root, replacing any older one.
    pub fn save(&self) -> Result<PathBuf, JournalError> {
        let path = Self::path(&self.target_root);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| JournalError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    pub fn load(target_root: &Path) -> Result<Self, JournalError> {
        let path = Self::path(target_root);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(JournalError::NotFound(path));
            }
            Err(e) => return Err(JournalError::Read { path, source: e }),
        };
        serde_json::from_str(&json).map_err(|e| JournalError::Corrupted { path, source: e })
    }

    pub fn delete(target_root: &Path) -> io::Result<()> {
        fs::remove_file(Self::path(target_root))
    }
}

/// What an undo did.
#[derive(Debug, Default)]
pub struct UndoReport {
    pub restored: usize,
    /// Moved files that are no longer where the journal left them.
    pub skipped: Vec<(PathBuf, String)>,
    pub failed: Vec<(PathBuf, String)>,
}

impl UndoReport {
    pub fn is_complete_success(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Reverts the run recorded in `target_root`'s journal.
///
/// Entries are restored newest first. A file that is no longer at its
/// recorded destination is skipped. A file whose original location is
/// occupied again is a failure; nothing is ever overwritten. The journal is
/// only removed when every entry was restored.
///
/// # Examples
///
/// ```no_run
/// use dirsort::journal;
/// use dirsort::messages::MemoryReporter;
/// use std::path::Path;
///
/// let reporter = MemoryReporter::new();
/// match journal::undo(Path::new("/home/me/Sorted"), &reporter) {
///     Ok(report) => println!("restored {} files", report.restored),
///     Err(e) => eprintln!("undo failed: {}", e),
/// }
/// ```
pub fn undo(target_root: &Path, reporter: &dyn Reporter) -> Result<UndoReport, JournalError> {
    let journal = MoveJournal::load(target_root)?;
    let mut report = UndoReport::default();

    for entry in journal.entries.iter().rev() {
        match restore(entry) {
            Ok(()) => {
                reporter.report(
                    Level::INFO,
                    MessageKey::Restored,
                    &[&entry.destination.display(), &entry.source.display()],
                );
                report.restored += 1;
            }
            Err(Restore::Skipped(reason)) => {
                reporter.report(
                    Level::WARN,
                    MessageKey::RestoreSkipped,
                    &[&entry.destination.display(), &reason],
                );
                report.skipped.push((entry.destination.clone(), reason));
            }
            Err(Restore::Failed(reason)) => {
                reporter.report(
                    Level::ERROR,
                    MessageKey::RestoreFailed,
                    &[&entry.destination.display(), &reason],
                );
                report.failed.push((entry.destination.clone(), reason));
            }
        }
    }

    if report.is_complete_success()
        && let Err(e) = MoveJournal::delete(target_root)
    {
        tracing::warn!(error = %e, "could not delete journal");
    }

    Ok(report)
}

enum Restore {
    Skipped(String),
    Failed(String),
}

fn restore(entry: &JournalEntry) -> Result<(), Restore> {
    if !duplicate::exists_on_disk(&entry.destination) {
        return Err(Restore::Skipped(
            "file not found at its organized location".to_string(),
        ));
    }
    if duplicate::exists_on_disk(&entry.source) {
        return Err(Restore::Failed(format!(
            "{} is occupied",
            entry.source.display()
        )));
    }

    if let Some(parent) = entry.source.parent() {
        fs::create_dir_all(parent).map_err(|e| Restore::Failed(e.to_string()))?;
    }
    mover::relocate(&entry.destination, &entry.source).map_err(|e| Restore::Failed(e.to_string()))
}
