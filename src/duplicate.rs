//! Duplicate-name resolution.
//!
//! When a file's proposed destination is already taken, the run-wide
//! [`DuplicateAction`] decides what happens. Resolution is pure: whether a
//! path is "taken" is answered by a probe supplied by the caller, so the same
//! policy works against the real filesystem and against in-flight moves.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Policy applied when the destination of a file already exists.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    /// Replace the existing file.
    Overwrite,
    /// Keep both, numbering the newcomer `name_1.ext`, `name_2.ext`, ...
    Rename,
    /// Leave the file at its source.
    #[default]
    Skip,
}

impl fmt::Display for DuplicateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateAction::Overwrite => write!(f, "overwrite"),
            DuplicateAction::Rename => write!(f, "rename"),
            DuplicateAction::Skip => write!(f, "skip"),
        }
    }
}

/// What the mover should do with one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Move to this path; nothing is in the way.
    Proceed(PathBuf),
    /// Remove the file currently at this path, then move there.
    Replace(PathBuf),
    /// Do nothing.
    Skip,
}

impl Resolution {
    /// The final destination, if the file is going to move.
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Resolution::Proceed(path) | Resolution::Replace(path) => Some(path),
            Resolution::Skip => None,
        }
    }
}

/// Decides the final destination for a file proposed to land at `proposed`.
///
/// `is_taken` reports whether a path is unavailable. A free proposed path is
/// used as-is whatever the action.
pub fn resolve<F>(proposed: &Path, action: DuplicateAction, is_taken: F) -> Resolution
where
    F: Fn(&Path) -> bool,
{
    if !is_taken(proposed) {
        return Resolution::Proceed(proposed.to_path_buf());
    }

    match action {
        DuplicateAction::Overwrite => Resolution::Replace(proposed.to_path_buf()),
        DuplicateAction::Skip => Resolution::Skip,
        DuplicateAction::Rename => {
            // Only terminates once a free name exists; every probe is a new name.
            let free = (1u64..)
                .map(|index| numbered_path(proposed, index))
                .find(|candidate| !is_taken(candidate));
            match free {
                Some(path) => Resolution::Proceed(path),
                None => Resolution::Skip,
            }
        }
    }
}

/// Builds `stem_<index>.ext` next to `path`.
///
/// The suffix goes before the last extension only, so `a.tar.gz` becomes
/// `a.tar_1.gz`. Names without an extension get a bare suffix.
///
/// ```
/// use dirsort::duplicate::numbered_path;
/// use std::path::Path;
///
/// assert_eq!(numbered_path(Path::new("out/photo.jpg"), 2), Path::new("out/photo_2.jpg"));
/// assert_eq!(numbered_path(Path::new("out/README"), 1), Path::new("out/README_1"));
/// ```
pub fn numbered_path(path: &Path, index: u64) -> PathBuf {
    let mut name: OsString = path.file_stem().map(OsString::from).unwrap_or_default();
    name.push(format!("_{index}"));
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }
    path.with_file_name(name)
}

/// Probe that treats any existing filesystem entry (including a dangling
/// symlink) as taken.
pub fn exists_on_disk(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
