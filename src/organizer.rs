//! Run orchestration.
//!
//! An [`Organizer`] validates the source, scaffolds the target's category
//! folders and hands the source tree to the [`Scheduler`]. Only the bootstrap
//! steps can fail a run; once files start moving, the run succeeds no matter
//! how individual files fare.

use crate::category::{CategoryTable, SubfolderTable};
use crate::config::CompiledFilters;
use crate::duplicate::{self, DuplicateAction};
use crate::journal::MoveJournal;
use crate::messages::{MessageKey, Reporter};
use crate::mover::{MoveOutcome, Mover};
use crate::scheduler::{ProgressObserver, Scheduler};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

/// Conditions that abort a whole run.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("source folder {} does not exist", .0.display())]
    SourceNotFound(PathBuf),

    #[error("source {} is not a folder", .0.display())]
    SourceNotDirectory(PathBuf),

    #[error("failed to create target folder {}: {source}", path.display())]
    TargetCreation { path: PathBuf, source: io::Error },

    #[error("failed to create category folder {}: {source}", path.display())]
    CategoryFolderCreation { path: PathBuf, source: io::Error },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[source] rayon::ThreadPoolBuildError),
}

/// Stages of one run. Each transition happens at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    ValidatingSource,
    CreatingFolders,
    Running,
    Completed,
    Failed,
}

/// The result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub outcomes: Vec<MoveOutcome>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn moved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_moved()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MoveOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MoveOutcome::Failed { .. }))
            .count()
    }

    /// Moved files per category.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for outcome in &self.outcomes {
            if let MoveOutcome::Moved { category, .. } = outcome {
                *counts.entry(category.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Where one file would go, as computed by a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub category: String,
    pub destination: PathBuf,
    /// Something already exists at `destination`.
    pub collides: bool,
}

/// Organizes a source tree into a target folder.
pub struct Organizer<'a> {
    categories: &'a CategoryTable,
    subfolders: &'a SubfolderTable,
    filters: &'a CompiledFilters,
    reporter: &'a dyn Reporter,
    duplicate_action: DuplicateAction,
    jobs: usize,
}

impl<'a> Organizer<'a> {
    pub fn new(
        categories: &'a CategoryTable,
        subfolders: &'a SubfolderTable,
        filters: &'a CompiledFilters,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            categories,
            subfolders,
            filters,
            reporter,
            duplicate_action: DuplicateAction::default(),
            jobs: 0,
        }
    }

    pub fn with_duplicate_action(mut self, action: DuplicateAction) -> Self {
        self.duplicate_action = action;
        self
    }

    /// Worker count; 0 picks one per CPU.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Runs the whole organization.
    ///
    /// 1. Fails if `source` is not an existing folder, without touching `target`
    /// 2. Creates `target` and one folder per category (fatal on error)
    /// 3. Creates declared sub-folders (best-effort)
    /// 4. Moves every file, reporting progress to `observer`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dirsort::category::{CategoryTable, SubfolderTable};
    /// use dirsort::config::CompiledFilters;
    /// use dirsort::duplicate::DuplicateAction;
    /// use dirsort::messages::MemoryReporter;
    /// use dirsort::organizer::Organizer;
    /// use dirsort::scheduler::NoProgress;
    /// use std::path::Path;
    ///
    /// let categories = CategoryTable::default();
    /// let subfolders = SubfolderTable::new();
    /// let filters = CompiledFilters::allow_all();
    /// let reporter = MemoryReporter::new();
    ///
    /// let report = Organizer::new(&categories, &subfolders, &filters, &reporter)
    ///     .with_duplicate_action(DuplicateAction::Rename)
    ///     .organize(Path::new("/home/me/Downloads"), Path::new("/home/me/Sorted"), &NoProgress);
    /// match report {
    ///     Ok(report) => println!("moved {} of {} files", report.moved(), report.total()),
    ///     Err(e) => eprintln!("run failed: {}", e),
    /// }
    /// ```
    pub fn organize(
        &self,
        source: &Path,
        target: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<RunReport, OrganizeError> {
        let mut state = RunState::NotStarted;
        let result = self.run_stages(source, target, observer, &mut state);
        if result.is_err() {
            Self::advance(&mut state, RunState::Failed);
        }
        result
    }

    fn run_stages(
        &self,
        source: &Path,
        target: &Path,
        observer: &dyn ProgressObserver,
        state: &mut RunState,
    ) -> Result<RunReport, OrganizeError> {
        Self::advance(state, RunState::ValidatingSource);
        let source_root = self.validate_source(source)?;

        Self::advance(state, RunState::CreatingFolders);
        self.create_folders(target)?;
        let target_root = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());

        Self::advance(state, RunState::Running);
        let mover = Mover::new(
            &target_root,
            self.categories,
            self.duplicate_action,
            self.reporter,
        );
        let journal = MoveJournal::path(&target_root);
        let outcomes = self.scheduler().run(
            &source_root,
            &Self::pruned(&source_root, &target_root, &journal),
            &mover,
            observer,
        )?;

        Self::advance(state, RunState::Completed);
        Ok(RunReport {
            source_root,
            target_root,
            outcomes,
        })
    }

    /// Computes where every file would go without touching the filesystem.
    pub fn plan(&self, source: &Path, target: &Path) -> Result<Vec<PlannedMove>, OrganizeError> {
        let source_root = self.validate_source(source)?;
        let target_root = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());

        let journal = MoveJournal::path(&target_root);
        let tasks = self.scheduler().enumerate(
            &source_root,
            &Self::pruned(&source_root, &target_root, &journal),
        );

        Ok(tasks
            .into_iter()
            .map(|task| {
                let category = self.categories.resolve(&task.path).into_owned();
                let mut destination = target_root.join(&category);
                if let Some(name) = task.path.file_name() {
                    destination.push(name);
                }
                let collides = duplicate::exists_on_disk(&destination);
                PlannedMove {
                    source: task.path,
                    category,
                    destination,
                    collides,
                }
            })
            .collect())
    }

    fn scheduler(&self) -> Scheduler<'a> {
        Scheduler::new(self.jobs, self.filters, self.reporter)
    }

    fn validate_source(&self, source: &Path) -> Result<PathBuf, OrganizeError> {
        if !source.exists() {
            self.reporter
                .report(Level::ERROR, MessageKey::SourceMissing, &[&source.display()]);
            return Err(OrganizeError::SourceNotFound(source.to_path_buf()));
        }
        if !source.is_dir() {
            self.reporter.report(
                Level::ERROR,
                MessageKey::SourceNotDirectory,
                &[&source.display()],
            );
            return Err(OrganizeError::SourceNotDirectory(source.to_path_buf()));
        }
        Ok(fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf()))
    }

    fn create_folders(&self, target: &Path) -> Result<(), OrganizeError> {
        fs::create_dir_all(target).map_err(|e| {
            self.reporter
                .report(Level::ERROR, MessageKey::FolderCreationFailed, &[&e]);
            OrganizeError::TargetCreation {
                path: target.to_path_buf(),
                source: e,
            }
        })?;

        for name in self.categories.names() {
            let path = target.join(name);
            fs::create_dir_all(&path).map_err(|e| {
                self.reporter
                    .report(Level::ERROR, MessageKey::FolderCreationFailed, &[&e]);
                OrganizeError::CategoryFolderCreation { path, source: e }
            })?;
        }

        for (category, subfolders) in self.subfolders.iter() {
            for subfolder in subfolders {
                let path = target.join(category).join(subfolder);
                if let Err(e) = fs::create_dir_all(&path) {
                    self.reporter.report(
                        Level::WARN,
                        MessageKey::SubfolderCreationFailed,
                        &[&path.display(), &e],
                    );
                }
            }
        }

        Ok(())
    }

    /// Paths the walk must skip: the journal of an earlier run, and the
    /// target when it lies strictly inside the source tree.
    fn pruned<'p>(
        source_root: &Path,
        target_root: &'p Path,
        journal: &'p Path,
    ) -> Vec<&'p Path> {
        let mut prune = vec![journal];
        if target_root != source_root && target_root.starts_with(source_root) {
            prune.push(target_root);
        }
        prune
    }

    fn advance(state: &mut RunState, next: RunState) {
        tracing::debug!(from = ?*state, to = ?next, "run state");
        *state = next;
    }
}
