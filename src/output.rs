//! Output formatting and styling module.
//!
//! Centralizes how dirsort styles terminal output: status marks, the progress
//! bar shown while files move, and the per-category summary table.

use crate::scheduler::ProgressObserver;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tracing::Level;

/// Manages CLI output with consistent styling and formatting.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Progress bars and summary tables
pub struct OutputFormatter;

impl OutputFormatter {
    /// Styles a status line for its level.
    ///
    /// Info lines stay plain so a long run of "Moved ..." lines is readable.
    pub fn decorate(level: Level, message: &str) -> String {
        if level == Level::ERROR {
            format!("{} {}", "✗".red(), message)
        } else if level == Level::WARN {
            format!("{} {}", "⚠".yellow(), message)
        } else {
            message.to_string()
        }
    }

    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::success("Files organized successfully!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{}", Self::decorate(Level::ERROR, message));
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{}", Self::decorate(Level::WARN, message));
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar counting organized files.
    ///
    /// The length is set once enumeration knows the total.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(0);
    /// pb.set_length(100);
    /// pb.inc(1);
    /// pb.finish();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} files")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb
    }

    /// Prints a summary table with file counts by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("pdf_files".to_string(), 15);
    /// counts.insert("image_files".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let mut categories: Vec<_> = category_counts
            .iter()
            .map(|(name, count)| (Self::category_label(name), *count))
            .collect();
        categories.sort();

        let max_category_len = categories
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max(8); // At least "Category" width

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                Self::file_word(*count),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            Self::file_word(total_files),
            width = max_category_len
        );
    }

    /// The empty category places files in the target root; show it as such.
    fn category_label(name: &str) -> String {
        if name.is_empty() {
            "(target root)".to_string()
        } else {
            name.to_string()
        }
    }

    fn file_word(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }
}

impl ProgressObserver for ProgressBar {
    fn on_started(&self, total: usize) {
        self.set_length(total as u64);
        self.set_position(0);
    }

    fn on_task_completed(&self, completed: usize, _total: usize) {
        self.set_position(completed as u64);
    }

    fn on_finished(&self) {
        self.finish_and_clear();
    }
}
