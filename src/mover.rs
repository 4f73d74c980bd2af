//! Moving one file into its category folder.
//!
//! The [`Mover`] is shared by every worker of a run. For each file it resolves
//! the category, makes sure the category folder exists, settles duplicate
//! names through the shared reservation table and relocates the file. Every
//! filesystem error stays inside [`Mover::process`]: it is reported and turned
//! into [`MoveOutcome::Failed`], so one bad file never stops the batch.
use crate::category::CategoryTable;
use crate::duplicate::DuplicateAction;
use crate::messages::{MessageKey, Reporter};
use crate::reservation::DestinationReservations;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The file now lives at `destination`.
    Moved {
        source: PathBuf,
        destination: PathBuf,
        category: String,
    },
    /// A file already occupied `existing` and the action was skip.
    Skipped { source: PathBuf, existing: PathBuf },
    /// The file was left at its source.
    Failed { source: PathBuf, reason: String },
}

impl MoveOutcome {
    pub fn source(&self) -> &Path {
        match self {
            MoveOutcome::Moved { source, .. }
            | MoveOutcome::Skipped { source, .. }
            | MoveOutcome::Failed { source, .. } => source,
        }
    }

    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

/// Errors that can occur while organizing a single file.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("failed to create directory {}: {source}", path.display())]
    FolderCreation { path: PathBuf, source: io::Error },

    #[error("{} has no file name component", path.display())]
    MissingFileName { path: PathBuf },

    #[error("failed to remove existing {}: {source}", path.display())]
    RemoveExisting { path: PathBuf, source: io::Error },

    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("copied {} to {} but could not remove the original: {source}", from.display(), to.display())]
    SourceRemoval {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Relocates `from` to `to`, preserving content.
///
/// A plain rename is tried first. When source and destination sit on
/// different filesystems, the file is copied (keeping its modification time)
/// and the original removed. If the original cannot be removed, the copy is
/// deleted again so the file exists in exactly one place.
///
/// `to` must not exist; callers settle collisions beforehand.
pub fn relocate(from: &Path, to: &Path) -> Result<(), MoveError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(from, to),
        Err(e) => Err(MoveError::Relocation {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        }),
    }
}

fn copy_then_remove(from: &Path, to: &Path) -> Result<(), MoveError> {
    tracing::debug!(from = %from.display(), to = %to.display(), "rename crossed devices, copying");

    let relocation_error = |source| MoveError::Relocation {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let modified = fs::metadata(from)
        .map_err(relocation_error)?
        .modified()
        .ok();

    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(relocation_error(e));
    }

    if let Some(mtime) = modified {
        let _ = filetime::set_file_mtime(to, FileTime::from_system_time(mtime));
    }

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(MoveError::SourceRemoval {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        });
    }

    Ok(())
}

/// True when `source` and `proposed` name the same file, which happens when a
/// file already sits in its category folder of the target.
fn already_in_place(source: &Path, proposed: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(proposed)) {
        (Ok(source), Ok(proposed)) => source == proposed,
        _ => false,
    }
}

/// Moves files into `target_root/<category>/`.
pub struct Mover<'a> {
    target_root: &'a Path,
    categories: &'a CategoryTable,
    action: DuplicateAction,
    reporter: &'a dyn Reporter,
    reservations: DestinationReservations,
}

impl<'a> Mover<'a> {
    pub fn new(
        target_root: &'a Path,
        categories: &'a CategoryTable,
        action: DuplicateAction,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            target_root,
            categories,
            action,
            reporter,
            reservations: DestinationReservations::new(),
        }
    }

    /// Organizes one file and reports the result with exactly one status line.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::category::CategoryTable;
    /// use dirsort::duplicate::DuplicateAction;
    /// use dirsort::messages::MemoryReporter;
    /// use dirsort::mover::Mover;
    /// use std::path::Path;
    ///
    /// let categories = CategoryTable::default();
    /// let reporter = MemoryReporter::new();
    /// let mover = Mover::new(Path::new("/sorted"), &categories, DuplicateAction::Rename, &reporter);
    /// let outcome = mover.process(Path::new("/downloads/photo.jpg"));
    /// println!("{:?}", outcome);
    /// ```
    pub fn process(&self, source: &Path) -> MoveOutcome {
        match self.try_process(source) {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = e.to_string();
                self.reporter.report(
                    Level::ERROR,
                    MessageKey::MoveFailed,
                    &[&source.display(), &reason],
                );
                MoveOutcome::Failed {
                    source: source.to_path_buf(),
                    reason,
                }
            }
        }
    }

    fn try_process(&self, source: &Path) -> Result<MoveOutcome, MoveError> {
        let category = self.categories.resolve(source);
        let category_path = self.target_root.join(category.as_ref());

        fs::create_dir_all(&category_path).map_err(|e| MoveError::FolderCreation {
            path: category_path.clone(),
            source: e,
        })?;

        let file_name = source.file_name().ok_or_else(|| MoveError::MissingFileName {
            path: source.to_path_buf(),
        })?;
        let proposed = category_path.join(file_name);

        if already_in_place(source, &proposed) {
            self.reporter
                .report(Level::INFO, MessageKey::AlreadyInPlace, &[&source.display()]);
            return Ok(MoveOutcome::Skipped {
                source: source.to_path_buf(),
                existing: proposed,
            });
        }

        let Some(reservation) = self.reservations.reserve(&proposed, self.action) else {
            self.reporter.report(
                Level::INFO,
                MessageKey::Skipped,
                &[&source.display(), &proposed.display()],
            );
            return Ok(MoveOutcome::Skipped {
                source: source.to_path_buf(),
                existing: proposed,
            });
        };
        let destination = reservation.path();

        if reservation.replaces_existing() {
            fs::remove_file(destination).map_err(|e| MoveError::RemoveExisting {
                path: destination.to_path_buf(),
                source: e,
            })?;
        }

        relocate(source, destination)?;

        self.reporter.report(
            Level::INFO,
            MessageKey::Moved,
            &[&source.display(), &destination.display()],
        );
        Ok(MoveOutcome::Moved {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            category: category.into_owned(),
        })
    }
}
