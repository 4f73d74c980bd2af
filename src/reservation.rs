//! In-flight destination reservations.
//!
//! Checking whether a destination is free and moving a file there are two
//! separate filesystem operations. With several workers, two files that map to
//! the same name could both see the path as free and the second move would
//! silently replace the first. Every worker therefore resolves its destination
//! under one mutex, treating paths other workers are still moving into as
//! taken, and holds a [`Reservation`] on the result until its file is in
//! place. Only resolution is serialized; the moves themselves run in parallel.

use crate::duplicate::{self, DuplicateAction, Resolution};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Destinations currently being written by some worker.
#[derive(Debug, Default)]
pub struct DestinationReservations {
    in_flight: Mutex<HashSet<PathBuf>>,
    released: Condvar,
}

/// A claim on one destination path, released on drop.
#[derive(Debug)]
pub struct Reservation<'a> {
    table: &'a DestinationReservations,
    path: PathBuf,
    replaces_existing: bool,
}

impl Reservation<'_> {
    /// The final destination of the move.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when an existing file must be removed before moving.
    pub fn replaces_existing(&self) -> bool {
        self.replaces_existing
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.table.lock().remove(&self.path);
        self.table.released.notify_all();
    }
}

impl DestinationReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `proposed` against the filesystem and all in-flight moves, and
    /// reserves the result.
    ///
    /// Returns `None` when the file should be skipped. Under
    /// [`DuplicateAction::Overwrite`], a destination another worker is still
    /// moving into is waited for rather than replaced mid-write.
    pub fn reserve(&self, proposed: &Path, action: DuplicateAction) -> Option<Reservation<'_>> {
        let mut in_flight = self.lock();

        while action == DuplicateAction::Overwrite && in_flight.contains(proposed) {
            in_flight = self
                .released
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let resolution = duplicate::resolve(proposed, action, |path| {
            in_flight.contains(path) || duplicate::exists_on_disk(path)
        });

        let (path, replaces_existing) = match resolution {
            Resolution::Proceed(path) => (path, false),
            Resolution::Replace(path) => (path, true),
            Resolution::Skip => return None,
        };

        in_flight.insert(path.clone());
        Some(Reservation {
            table: self,
            path,
            replaces_existing,
        })
    }

    /// Number of destinations currently reserved.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
