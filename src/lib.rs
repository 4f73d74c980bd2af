//! dirsort - sort a directory tree into category folders by file extension
//!
//! This library provides the extension-to-category mapping, the duplicate-name
//! policy, the parallel mover that applies them to every file of a source
//! tree, a move journal with undo, and TOML configuration for categories,
//! filters and message templates.

pub mod category;
pub mod cli;
pub mod config;
pub mod duplicate;
pub mod journal;
pub mod messages;
pub mod mover;
pub mod organizer;
pub mod output;
pub mod reservation;
pub mod scheduler;

pub use category::{CategoryTable, SubfolderTable};
pub use config::{CompiledFilters, Config, ConfigError};
pub use duplicate::DuplicateAction;
pub use journal::{JournalError, MoveJournal, UndoReport};
pub use messages::{Catalog, ConsoleReporter, MemoryReporter, MessageKey, Reporter};
pub use mover::{MoveError, MoveOutcome, Mover};
pub use organizer::{OrganizeError, Organizer, PlannedMove, RunReport};
pub use scheduler::{NoProgress, ProgressObserver, Scheduler};

pub use cli::{Cli, run_cli};
