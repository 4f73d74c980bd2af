//! Configuration loading.
//!
//! dirsort reads an optional TOML file describing the category table, run
//! defaults, enumeration filters and message overrides. Every section is
//! optional; an empty file behaves exactly like the built-in defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [[categories]]
//! name = "text_files"
//! extensions = ["txt", ".md"]
//! subfolders = ["drafts", "final"]
//!
//! [run]
//! jobs = 4
//! duplicate_action = "rename"
//!
//! [filters]
//! include_hidden = true
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db", ".DS_Store"]
//! patterns = ["node_modules/**"]
//! extensions = ["tmp", "part"]
//! regex = ['^~\$']
//!
//! [filters.include]
//! patterns = []
//!
//! [messages]
//! moved = "Verschoben: {0} -> {1}"
//! ```
//!
//! When `[[categories]]` is present it replaces the default table entirely,
//! in the order written.

use crate::category::{CategoryTable, SubfolderTable};
use crate::duplicate::DuplicateAction;
use crate::messages::{Catalog, MessageKey};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".dirsortrc.toml";

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("invalid configuration {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    /// IO error while reading configuration.
    #[error("could not read configuration {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    /// A category entry that cannot be turned into a folder.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    #[error("unknown message key '{0}' in [messages]")]
    UnknownMessageKey(String),
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Category declarations; empty means the built-in table.
    #[serde(default)]
    pub categories: Vec<CategoryRule>,

    #[serde(default)]
    pub run: RunSettings,

    #[serde(default)]
    pub filters: FilterRules,

    /// Message template overrides keyed by message name.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

/// One `[[categories]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub extensions: Vec<String>,
    /// Sub-folders pre-created under this category.
    #[serde(default)]
    pub subfolders: Vec<String>,
}

/// Defaults for a run; command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Worker count, 0 for one per CPU.
    #[serde(default)]
    pub jobs: usize,

    #[serde(default)]
    pub duplicate_action: DuplicateAction,
}

/// Rules deciding which source files are enumerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether files whose name starts with "." are organized. Defaults to true.
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist overriding every exclude rule.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_include_hidden() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            include_hidden: default_include_hidden(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for leaving files out of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact file names (e.g. "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the path relative to the source root.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions, with or without the dot, case-insensitive.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    /// Loads configuration, falling back to defaults.
    ///
    /// Tried in order:
    /// 1. `config_path`, when given (must exist and parse)
    /// 2. `.dirsortrc.toml` in the current directory
    /// 3. `~/.config/dirsort/config.toml`
    /// 4. built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Builds the category and sub-folder tables.
    ///
    /// Rejects empty or path-like category names, repeated names and empty
    /// extensions.
    pub fn tables(&self) -> Result<(CategoryTable, SubfolderTable), ConfigError> {
        if self.categories.is_empty() {
            return Ok((CategoryTable::default(), SubfolderTable::new()));
        }

        let mut seen = HashSet::new();
        let mut categories = CategoryTable::empty();
        let mut subfolders = SubfolderTable::new();

        for rule in &self.categories {
            let name = rule.name.trim();
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(ConfigError::InvalidCategory(format!(
                    "'{}' is not a usable folder name",
                    rule.name
                )));
            }
            if !seen.insert(name) {
                return Err(ConfigError::InvalidCategory(format!(
                    "'{}' is declared more than once",
                    name
                )));
            }
            if let Some(ext) = rule
                .extensions
                .iter()
                .find(|ext| ext.trim().trim_start_matches('.').is_empty())
            {
                return Err(ConfigError::InvalidCategory(format!(
                    "'{}' lists an empty extension '{}'",
                    name, ext
                )));
            }

            categories = categories.with_category(name, &rule.extensions);
            if !rule.subfolders.is_empty() {
                subfolders = subfolders.with_subfolders(name, rule.subfolders.iter().cloned());
            }
        }

        Ok((categories, subfolders))
    }

    /// Builds the message catalog from `[messages]`.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        self.messages
            .iter()
            .try_fold(Catalog::new(), |catalog, (name, template)| {
                MessageKey::from_name(name)
                    .map(|key| catalog.with_template(key, template.clone()))
                    .ok_or_else(|| ConfigError::UnknownMessageKey(name.clone()))
            })
    }
}

impl FilterRules {
    /// Compiles the rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex pattern is invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        let globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                        pattern: pattern.clone(),
                        reason: e.msg.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = self
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledFilters {
            include_hidden: self.include_hidden,
            exclude_filenames: self.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: self
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: globs(&self.exclude.patterns)?,
            exclude_regexes,
            include_patterns: globs(&self.include.patterns)?,
        })
    }
}

/// Compiled filter rules, ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Filters that let every file through.
    pub fn allow_all() -> Self {
        Self {
            include_hidden: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }

    /// Decides whether a file takes part in the run.
    ///
    /// `relative_path` is the file's path below the source root. Checks run in
    /// this order, first decisive one wins:
    /// 1. include patterns: always included
    /// 2. hidden files, when disabled: excluded
    /// 3. exact file name, extension, glob, regex: excluded
    /// 4. otherwise included
    pub fn should_include(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return true;
        }

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = relative_path.extension()
            && self
                .exclude_extensions
                .contains(&ext.to_string_lossy().to_lowercase())
        {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(relative_path))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
    }
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self::allow_all()
    }
}
