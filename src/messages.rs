//! User-visible messages and the reporting capability.
//!
//! Every line dirsort prints has a [`MessageKey`]. A [`Catalog`] turns keys
//! into text (English by default, overridable per key from the `[messages]`
//! configuration table), and a [`Reporter`] is the capability the organizer
//! is handed to format, log and print those lines. Nothing here is global:
//! tests pass a [`MemoryReporter`] and inspect what was said.

use crate::output::OutputFormatter;
use indicatif::MultiProgress;
use std::collections::HashMap;
use std::fmt::{self, Display, Write as _};
use std::sync::{Mutex, PoisonError};
use tracing::Level;

/// Identifies one user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Moved,
    Skipped,
    AlreadyInPlace,
    MoveFailed,
    SourceMissing,
    SourceNotDirectory,
    FolderCreationFailed,
    SubfolderCreationFailed,
    EnumerationFailed,
    RunSucceeded,
    RunFailed,
    Planned,
    PlannedCollision,
    DryRunComplete,
    JournalSaved,
    JournalFailed,
    Restored,
    RestoreSkipped,
    RestoreFailed,
    UndoComplete,
}

impl MessageKey {
    pub const ALL: [MessageKey; 20] = [
        MessageKey::Moved,
        MessageKey::Skipped,
        MessageKey::AlreadyInPlace,
        MessageKey::MoveFailed,
        MessageKey::SourceMissing,
        MessageKey::SourceNotDirectory,
        MessageKey::FolderCreationFailed,
        MessageKey::SubfolderCreationFailed,
        MessageKey::EnumerationFailed,
        MessageKey::RunSucceeded,
        MessageKey::RunFailed,
        MessageKey::Planned,
        MessageKey::PlannedCollision,
        MessageKey::DryRunComplete,
        MessageKey::JournalSaved,
        MessageKey::JournalFailed,
        MessageKey::Restored,
        MessageKey::RestoreSkipped,
        MessageKey::RestoreFailed,
        MessageKey::UndoComplete,
    ];

    /// The key as written in the `[messages]` configuration table.
    pub fn name(self) -> &'static str {
        match self {
            MessageKey::Moved => "moved",
            MessageKey::Skipped => "skipped",
            MessageKey::AlreadyInPlace => "already_in_place",
            MessageKey::MoveFailed => "move_failed",
            MessageKey::SourceMissing => "source_missing",
            MessageKey::SourceNotDirectory => "source_not_directory",
            MessageKey::FolderCreationFailed => "folder_creation_failed",
            MessageKey::SubfolderCreationFailed => "subfolder_creation_failed",
            MessageKey::EnumerationFailed => "enumeration_failed",
            MessageKey::RunSucceeded => "run_succeeded",
            MessageKey::RunFailed => "run_failed",
            MessageKey::Planned => "planned",
            MessageKey::PlannedCollision => "planned_collision",
            MessageKey::DryRunComplete => "dry_run_complete",
            MessageKey::JournalSaved => "journal_saved",
            MessageKey::JournalFailed => "journal_failed",
            MessageKey::Restored => "restored",
            MessageKey::RestoreSkipped => "restore_skipped",
            MessageKey::RestoreFailed => "restore_failed",
            MessageKey::UndoComplete => "undo_complete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }

    /// English template. `{n}` is replaced by the n-th argument.
    pub fn default_template(self) -> &'static str {
        match self {
            MessageKey::Moved => "Moved {0} to {1}",
            MessageKey::Skipped => "Skipped {0}: {1} already exists",
            MessageKey::AlreadyInPlace => "Kept {0}: already in place",
            MessageKey::MoveFailed => "Failed to organize {0}: {1}",
            MessageKey::SourceMissing => "The source folder '{0}' does not exist.",
            MessageKey::SourceNotDirectory => "The source '{0}' is not a folder.",
            MessageKey::FolderCreationFailed => "Error creating folders: {0}",
            MessageKey::SubfolderCreationFailed => "Could not create sub-folder {0}: {1}",
            MessageKey::EnumerationFailed => "Could not read {0}: {1}",
            MessageKey::RunSucceeded => "Files organized successfully!",
            MessageKey::RunFailed => {
                "File organization unsuccessful. Please check the source and target folder paths."
            }
            MessageKey::Planned => "{0} -> {1}",
            MessageKey::PlannedCollision => "{0} -> {1} (exists, would {2})",
            MessageKey::DryRunComplete => "Dry run complete. No files were modified.",
            MessageKey::JournalSaved => "Journal saved to {0}. Use --undo to revert this run.",
            MessageKey::JournalFailed => "Could not save journal: {0}",
            MessageKey::Restored => "Restored {0} to {1}",
            MessageKey::RestoreSkipped => "Skipped restoring {0}: {1}",
            MessageKey::RestoreFailed => "Failed to restore {0}: {1}",
            MessageKey::UndoComplete => "Undo complete: {0} restored, {1} skipped, {2} failed",
        }
    }
}

impl Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Message templates, defaulting to English.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    overrides: HashMap<MessageKey, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the template of one key.
    pub fn with_template(mut self, key: MessageKey, template: impl Into<String>) -> Self {
        self.overrides.insert(key, template.into());
        self
    }

    pub fn template(&self, key: MessageKey) -> &str {
        self.overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_template())
    }

    pub fn format(&self, key: MessageKey, args: &[&dyn Display]) -> String {
        render(self.template(key), args)
    }
}

/// Substitutes `{0}`, `{1}`, ... in `template`.
///
/// Placeholders without a matching argument, and any other braces, are kept
/// verbatim.
///
/// ```
/// use dirsort::messages::render;
///
/// assert_eq!(render("Moved {0} to {1}", &[&"a.txt", &"t/a.txt"]), "Moved a.txt to t/a.txt");
/// assert_eq!(render("{0} {5} {x}", &[&1]), "1 {5} {x}");
/// ```
pub fn render(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = after.find('}').and_then(|close| {
            let digits = &after[..close];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some((digits.parse::<usize>().ok()?, close))
        });

        match placeholder {
            Some((index, close)) if index < args.len() => {
                let _ = write!(out, "{}", args[index]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The message-formatting and logging capability handed to the organizer.
///
/// `log` feeds the structured log; `emit` prints a human-readable status line.
/// `report` does both for one catalog message.
pub trait Reporter: Send + Sync {
    fn format(&self, key: MessageKey, args: &[&dyn Display]) -> String;

    fn log(&self, level: Level, message: &str);

    fn emit(&self, level: Level, message: &str);

    fn report(&self, level: Level, key: MessageKey, args: &[&dyn Display]) -> String {
        let message = self.format(key, args);
        self.log(level, &message);
        self.emit(level, &message);
        message
    }
}

/// Forwards a message to `tracing` at a level chosen at runtime.
pub fn log_event(level: Level, message: &str) {
    if level == Level::ERROR {
        tracing::error!("{message}");
    } else if level == Level::WARN {
        tracing::warn!("{message}");
    } else if level == Level::INFO {
        tracing::info!("{message}");
    } else if level == Level::DEBUG {
        tracing::debug!("{message}");
    } else {
        tracing::trace!("{message}");
    }
}

/// Reporter for the terminal.
///
/// Lines go through the attached [`MultiProgress`] when there is one, so they
/// scroll above the progress bar instead of tearing it.
pub struct ConsoleReporter {
    catalog: Catalog,
    progress: Option<MultiProgress>,
}

impl ConsoleReporter {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Reporter for ConsoleReporter {
    fn format(&self, key: MessageKey, args: &[&dyn Display]) -> String {
        self.catalog.format(key, args)
    }

    fn log(&self, level: Level, message: &str) {
        log_event(level, message);
    }

    fn emit(&self, level: Level, message: &str) {
        let line = OutputFormatter::decorate(level, message);
        match &self.progress {
            Some(progress) if !progress.is_hidden() => {
                let _ = progress.println(line);
            }
            _ if level <= Level::WARN => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }
}

/// Reporter that keeps every emitted line in memory.
///
/// Log records are forwarded to `tracing` as usual.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    catalog: Catalog,
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog,
            lines: Mutex::default(),
        }
    }

    /// Every emitted line, in emission order.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Emitted lines at exactly `level`.
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line)
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn format(&self, key: MessageKey, args: &[&dyn Display]) -> String {
        self.catalog.format(key, args)
    }

    fn log(&self, level: Level, message: &str) {
        log_event(level, message);
    }

    fn emit(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}
