//! Extension-based categorization.
//!
//! A [`CategoryTable`] maps category names to the extensions they claim, and
//! resolves any path to the name of the folder it belongs in. Lookup walks the
//! categories in the order they were declared, so an extension claimed twice
//! always resolves to the first category.
//!
//! # Examples
//!
//! ```
//! use dirsort::category::CategoryTable;
//! use std::path::Path;
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.resolve(Path::new("report.PDF")), "pdf_files");
//! assert_eq!(table.resolve(Path::new("notes.txt")), "txt");
//! assert_eq!(table.resolve(Path::new("Makefile")), "");
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// The built-in categories, in lookup order.
pub const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("word_files", &[".docx", ".doc"]),
    ("video_files", &[".mkv", ".mp4", ".webm"]),
    ("image_files", &[".jpg", ".jpeg", ".png", ".gif", ".bmp"]),
    ("pdf_files", &[".pdf"]),
    ("zip_files", &[".zip", ".rar", ".7z"]),
];

/// A named bucket of extensions sharing one target folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    extensions: HashSet<String>,
}

impl Category {
    /// The folder name of this category.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `extension` (lower-cased, with leading dot) belongs here.
    pub fn claims(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// The normalized extensions claimed by this category.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }
}

/// Ordered mapping from category name to its extension set.
///
/// Built once per run and shared by reference; there is no way to mutate a
/// table after construction other than rebuilding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl CategoryTable {
    /// Creates an empty table. Every file resolves to its fallback category.
    pub fn empty() -> Self {
        Self {
            categories: Vec::new(),
        }
    }

    /// Returns this table with one more category appended.
    ///
    /// Extensions are normalized with [`normalize_extension`]. Declaring a name
    /// that already exists merges the new extensions into it, keeping its
    /// original position.
    pub fn with_category<I, S>(mut self, name: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()));

        match self.categories.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.extensions.extend(normalized),
            None => self.categories.push(Category {
                name: name.to_string(),
                extensions: normalized.collect(),
            }),
        }
        self
    }

    /// Category names in lookup order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    /// Categories in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Resolves the category folder name for a file.
    ///
    /// The extension is compared case-insensitively against every category in
    /// declaration order. When nothing matches, the extension itself (without
    /// the dot, original case) is the category. A file with no extension
    /// resolves to the empty string, which places it directly in the target
    /// root.
    pub fn resolve(&self, path: &Path) -> Cow<'_, str> {
        let Some(extension) = path.extension() else {
            return Cow::Borrowed("");
        };
        let extension = extension.to_string_lossy();
        let key = format!(".{}", extension.to_lowercase());

        match self.categories.iter().find(|c| c.claims(&key)) {
            Some(category) => Cow::Borrowed(category.name()),
            None => Cow::Owned(extension.into_owned()),
        }
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        DEFAULT_CATEGORIES
            .iter()
            .fold(Self::empty(), |table, (name, extensions)| {
                table.with_category(name, extensions.iter())
            })
    }
}

/// Lower-cases an extension and makes sure it carries exactly one leading dot.
///
/// ```
/// use dirsort::category::normalize_extension;
///
/// assert_eq!(normalize_extension("JPG"), ".jpg");
/// assert_eq!(normalize_extension(" .Tar "), ".tar");
/// ```
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

/// Sub-folders to pre-create under each category folder.
///
/// Purely cosmetic scaffolding: files are only ever placed in the top-level
/// category folder. Keys are not required to be categories of the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubfolderTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl SubfolderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends sub-folder names under `category`, keeping declaration order.
    pub fn with_subfolders<I, S>(mut self, category: &str, subfolders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(category.to_string())
            .or_default()
            .extend(subfolders.into_iter().map(Into::into));
        self
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.entries.get(category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(category, subfolders)| (category.as_str(), subfolders.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }
}
