//! Enumerating the source tree and fanning moves out to a worker pool.

use crate::config::CompiledFilters;
use crate::messages::{MessageKey, Reporter};
use crate::mover::{MoveOutcome, Mover};
use crate::organizer::OrganizeError;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Level;
use walkdir::WalkDir;

/// Receives progress while a batch runs.
///
/// `on_task_completed` is called from worker threads, once per file, with a
/// strictly increasing `completed` count.
pub trait ProgressObserver: Sync {
    fn on_started(&self, _total: usize) {}

    fn on_task_completed(&self, completed: usize, total: usize);

    fn on_finished(&self) {}
}

/// Observer that ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_task_completed(&self, _completed: usize, _total: usize) {}
}

/// One discovered file waiting to be organized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub path: PathBuf,
}

/// Walks a source tree and runs one move per file on a bounded pool.
pub struct Scheduler<'a> {
    jobs: usize,
    filters: &'a CompiledFilters,
    reporter: &'a dyn Reporter,
}

impl<'a> Scheduler<'a> {
    /// `jobs` is the number of workers; 0 picks one per CPU.
    pub fn new(jobs: usize, filters: &'a CompiledFilters, reporter: &'a dyn Reporter) -> Self {
        Self {
            jobs,
            filters,
            reporter,
        }
    }

    /// Lists every regular file under `source_root`.
    ///
    /// Symlinks are not followed. Entries listed in `prune` (the target when
    /// it sits inside the source, the run journal) are neither returned nor
    /// descended into. Unreadable entries are reported and left out. Files
    /// rejected by the filters are left out silently.
    pub fn enumerate(&self, source_root: &Path, prune: &[&Path]) -> Vec<FileTask> {
        let walker = WalkDir::new(source_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !prune.iter().any(|pruned| entry.path() == *pruned));

        let mut tasks = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| source_root.to_path_buf());
                    self.reporter.report(
                        Level::WARN,
                        MessageKey::EnumerationFailed,
                        &[&path.display(), &e],
                    );
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source_root)
                .unwrap_or_else(|_| entry.path());
            if self.filters.should_include(relative) {
                tasks.push(FileTask {
                    path: entry.into_path(),
                });
            }
        }
        tasks
    }

    /// Runs `mover` over every task and returns the outcomes.
    ///
    /// The outcomes are collected for reporting only; a batch is never
    /// judged by them.
    pub fn dispatch(
        &self,
        tasks: &[FileTask],
        mover: &Mover<'_>,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<MoveOutcome>, OrganizeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|index| format!("dirsort-worker-{index}"))
            .build()
            .map_err(OrganizeError::WorkerPool)?;

        let total = tasks.len();
        let completed = AtomicUsize::new(0);
        observer.on_started(total);
        tracing::debug!(total, workers = pool.current_num_threads(), "dispatching moves");

        let outcomes = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let outcome = mover.process(&task.path);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    observer.on_task_completed(done, total);
                    outcome
                })
                .collect()
        });

        observer.on_finished();
        Ok(outcomes)
    }

    /// Enumerates `source_root` and dispatches every file found.
    pub fn run(
        &self,
        source_root: &Path,
        prune: &[&Path],
        mover: &Mover<'_>,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<MoveOutcome>, OrganizeError> {
        let tasks = self.enumerate(source_root, prune);
        self.dispatch(&tasks, mover, observer)
    }
}
