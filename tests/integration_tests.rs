/// Integration tests for dirsort
///
/// These tests drive whole runs against real temporary folders, through the
/// library API and through the CLI entry point.
///
/// Test categories:
/// 1. Basic organization workflows
/// 2. Duplicate actions
/// 3. Failures and edge cases
/// 4. Configuration and filtering
/// 5. Dry run, journal and undo
use clap::Parser;
use dirsort::cli::{Cli, run_cli};
use dirsort::journal::{self, JOURNAL_FILE_NAME};
use dirsort::{
    CategoryTable, CompiledFilters, Config, DuplicateAction, MemoryReporter, NoProgress,
    OrganizeError, Organizer, RunReport, SubfolderTable,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::Level;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary workspace with a `source` and a `target` folder.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("source")).expect("Failed to create source");
        TestFixture { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn source(&self) -> PathBuf {
        self.root().join("source")
    }

    fn target(&self) -> PathBuf {
        self.root().join("target")
    }

    /// Create a file (and its parent folders) under the source folder.
    fn create_file(&self, rel_path: &str, content: &str) {
        let path = self.source().join(rel_path);
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create parent");
        fs::write(&path, content).expect("Failed to write file content");
    }

    /// Write a configuration file into the workspace and return its path.
    fn write_config(&self, content: &str) -> PathBuf {
        let path = self.root().join("dirsort.toml");
        fs::write(&path, content).expect("Failed to write config");
        path
    }

    fn organize(&self, action: DuplicateAction) -> (Result<RunReport, OrganizeError>, MemoryReporter) {
        self.organize_with(CategoryTable::default(), action)
    }

    fn organize_with(
        &self,
        categories: CategoryTable,
        action: DuplicateAction,
    ) -> (Result<RunReport, OrganizeError>, MemoryReporter) {
        let subfolders = SubfolderTable::new();
        let filters = CompiledFilters::allow_all();
        let reporter = MemoryReporter::new();
        let result = Organizer::new(&categories, &subfolders, &filters, &reporter)
            .with_duplicate_action(action)
            .with_jobs(4)
            .organize(&self.source(), &self.target(), &NoProgress);
        (result, reporter)
    }

    /// Run the CLI with the workspace's folders and extra arguments.
    fn run_cli(&self, extra: &[&str]) -> Result<(), dirsort::cli::CliError> {
        let source = self.source();
        let target = self.target();
        let mut args: Vec<String> = vec![
            "dirsort".into(),
            source.to_string_lossy().into_owned(),
            target.to_string_lossy().into_owned(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        // An explicit, empty config keeps the user's own files out of the run.
        if !extra.contains(&"-c") {
            let config = self.write_config("");
            args.push("-c".into());
            args.push(config.to_string_lossy().into_owned());
        }
        run_cli(&Cli::parse_from(args))
    }

    fn assert_target_file(&self, rel_path: &str, content: &str) {
        let path = self.target().join(rel_path);
        assert_eq!(
            fs::read_to_string(&path)
                .unwrap_or_else(|_| panic!("File should exist: {}", path.display())),
            content
        );
    }

    fn assert_source_file(&self, rel_path: &str) {
        let path = self.source().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_not_in_source(&self, rel_path: &str) {
        let path = self.source().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// Names of the regular files directly inside a target sub-folder.
    fn target_files(&self, rel_dir: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.target().join(rel_dir))
            .expect("Failed to read directory")
            .filter_map(|entry| {
                let entry = entry.ok()?;
                entry
                    .file_type()
                    .ok()?
                    .is_file()
                    .then(|| entry.file_name().to_string_lossy().into_owned())
            })
            .collect();
        names.sort();
        names
    }

    /// Every regular file left anywhere under the source folder.
    fn source_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        Self::walk_dir(&self.source(), &mut files);
        files.sort();
        files
    }

    fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.push(path);
                } else if path.is_dir() {
                    Self::walk_dir(&path, files);
                }
            }
        }
    }
}

// ============================================================================
// Test Suite 1: Basic Organization
// ============================================================================

#[test]
fn test_pdf_jpg_zip_land_in_their_folders() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    fixture.create_file("photo.jpg", "jpg");
    fixture.create_file("bundle.zip", "zip");

    let (result, _) = fixture.organize(DuplicateAction::Skip);

    let report = result.expect("run should succeed");
    assert_eq!(report.moved(), 3);
    fixture.assert_target_file("pdf_files/report.pdf", "pdf");
    fixture.assert_target_file("image_files/photo.jpg", "jpg");
    fixture.assert_target_file("zip_files/bundle.zip", "zip");
    fixture.assert_not_in_source("report.pdf");
    assert!(fixture.source_files().is_empty());
}

#[test]
fn test_every_default_category_folder_is_created() {
    let fixture = TestFixture::new();

    let (result, _) = fixture.organize(DuplicateAction::Skip);

    assert!(result.is_ok());
    for name in [
        "word_files",
        "video_files",
        "image_files",
        "pdf_files",
        "zip_files",
    ] {
        assert!(fixture.target().join(name).is_dir(), "{} missing", name);
    }
}

#[test]
fn test_extensions_match_case_insensitively() {
    let fixture = TestFixture::new();
    fixture.create_file("LETTER.DOCX", "w");
    fixture.create_file("Clip.MkV", "v");
    fixture.create_file("old.Doc", "w2");

    let (result, _) = fixture.organize(DuplicateAction::Skip);

    assert!(result.is_ok());
    assert_eq!(fixture.target_files("word_files"), vec!["LETTER.DOCX", "old.Doc"]);
    assert_eq!(fixture.target_files("video_files"), vec!["Clip.MkV"]);
}

#[test]
fn test_unknown_and_missing_extensions() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.txt", "t");
    fixture.create_file("data.CSV", "c");
    fixture.create_file("README", "r");

    let (result, _) = fixture.organize(DuplicateAction::Skip);

    assert!(result.is_ok());
    fixture.assert_target_file("txt/notes.txt", "t");
    fixture.assert_target_file("CSV/data.CSV", "c");
    fixture.assert_target_file("README", "r");
}

#[test]
fn test_nested_source_is_flattened() {
    let fixture = TestFixture::new();
    fixture.create_file("a/b/c/deep.png", "deep");
    fixture.create_file("top.png", "top");

    let (result, _) = fixture.organize(DuplicateAction::Skip);

    assert!(result.is_ok());
    assert_eq!(fixture.target_files("image_files"), vec!["deep.png", "top.png"]);
}

#[test]
fn test_many_files_in_parallel() {
    let fixture = TestFixture::new();
    for i in 0..100 {
        let ext = ["png", "pdf", "zip", "mp4", "txt"][i % 5];
        fixture.create_file(&format!("dir{}/file_{}.{}", i % 7, i, ext), "x");
    }

    let (result, reporter) = fixture.organize(DuplicateAction::Skip);

    let report = result.expect("run should succeed");
    assert_eq!(report.moved(), 100);
    assert_eq!(reporter.lines_at(Level::INFO).len(), 100);
    for folder in ["image_files", "pdf_files", "zip_files", "video_files", "txt"] {
        assert_eq!(fixture.target_files(folder).len(), 20);
    }
}

// ============================================================================
// Test Suite 2: Duplicate Actions
// ============================================================================

#[test]
fn test_skip_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_file("photo.jpg", "first");
    let (result, _) = fixture.organize(DuplicateAction::Skip);
    assert!(result.is_ok());

    fixture.create_file("photo.jpg", "second");
    let (result, reporter) = fixture.organize(DuplicateAction::Skip);

    let report = result.expect("run should succeed");
    assert_eq!(report.skipped(), 1);
    fixture.assert_target_file("image_files/photo.jpg", "first");
    fixture.assert_source_file("photo.jpg");
    assert_eq!(fs::read_to_string(fixture.source().join("photo.jpg")).unwrap(), "second");
    assert!(reporter.lines_at(Level::INFO)[0].contains("already exists"));
}

#[test]
fn test_overwrite_duplicate_text_files() {
    let fixture = TestFixture::new();
    fixture.create_file("one/duplicate_file.txt", "same");
    fixture.create_file("two/duplicate_file.txt", "same");
    let categories = CategoryTable::empty().with_category("text_files", [".txt"]);

    let (result, _) = fixture.organize_with(categories, DuplicateAction::Overwrite);

    let report = result.expect("run should succeed");
    assert_eq!(report.moved(), 2);
    assert_eq!(fixture.target_files("text_files"), vec!["duplicate_file.txt"]);
    assert!(fixture.source_files().is_empty());
}

#[test]
fn test_overwrite_keeps_last_content_across_runs() {
    let fixture = TestFixture::new();
    fixture.create_file("clip.webm", "old");
    fixture.organize(DuplicateAction::Overwrite).0.unwrap();

    fixture.create_file("clip.webm", "new");
    fixture.organize(DuplicateAction::Overwrite).0.unwrap();

    assert_eq!(fixture.target_files("video_files"), vec!["clip.webm"]);
    fixture.assert_target_file("video_files/clip.webm", "new");
}

#[test]
fn test_rename_numbers_every_duplicate() {
    let fixture = TestFixture::new();
    for i in 0..10 {
        fixture.create_file(&format!("d{}/scan.pdf", i), &format!("scan {}", i));
    }

    let (result, _) = fixture.organize(DuplicateAction::Rename);

    assert_eq!(result.unwrap().moved(), 10);
    let mut expected: Vec<String> = (1..10).map(|i| format!("scan_{}.pdf", i)).collect();
    expected.push("scan.pdf".to_string());
    expected.sort();
    assert_eq!(fixture.target_files("pdf_files"), expected);
}

#[test]
fn test_rename_without_extension() {
    let fixture = TestFixture::new();
    fixture.create_file("a/LICENSE", "a");
    fixture.create_file("b/LICENSE", "b");

    fixture.organize(DuplicateAction::Rename).0.unwrap();

    assert_eq!(fixture.target_files(""), vec!["LICENSE", "LICENSE_1"]);
}

// ============================================================================
// Test Suite 3: Failures and Edge Cases
// ============================================================================

#[test]
fn test_missing_source_fails_and_leaves_no_target() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.source()).unwrap();

    let (result, reporter) = fixture.organize(DuplicateAction::Skip);

    assert!(matches!(result, Err(OrganizeError::SourceNotFound(_))));
    assert!(!fixture.target().exists());
    assert!(reporter.lines_at(Level::ERROR)[0].contains("does not exist"));
}

#[test]
fn test_cli_missing_source_still_exits_cleanly() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.source()).unwrap();

    assert!(fixture.run_cli(&[]).is_ok());
    assert!(!fixture.target().exists());
}

#[test]
fn test_target_inside_source_is_left_alone() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "a");
    let target = fixture.source().join("sorted");
    let categories = CategoryTable::default();
    let subfolders = SubfolderTable::new();
    let filters = CompiledFilters::allow_all();
    let reporter = MemoryReporter::new();
    let organizer = Organizer::new(&categories, &subfolders, &filters, &reporter);

    organizer
        .organize(&fixture.source(), &target, &NoProgress)
        .unwrap();
    let second = organizer
        .organize(&fixture.source(), &target, &NoProgress)
        .unwrap();

    assert_eq!(second.total(), 0);
    assert!(target.join("pdf_files/a.pdf").is_file());
}

#[test]
fn test_file_as_source_is_rejected() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.source()).unwrap();
    fs::write(fixture.source(), "not a folder").unwrap();

    let (result, reporter) = fixture.organize(DuplicateAction::Overwrite);

    assert!(matches!(result, Err(OrganizeError::SourceNotDirectory(_))));
    assert!(!fixture.target().exists());
    assert_eq!(fs::read_to_string(fixture.source()).unwrap(), "not a folder");
    assert!(reporter.lines_at(Level::ERROR)[0].contains("is not a folder"));
    assert!(fixture.run_cli(&[]).is_ok());
    assert!(!fixture.target().exists());
}

#[test]
fn test_cli_organizing_a_folder_into_itself_twice() {
    for action in ["overwrite", "rename", "skip"] {
        let fixture = TestFixture::new();
        fixture.create_file("report.pdf", "report");
        fixture.create_file("notes.txt", "notes");
        let folder = fixture.source().to_string_lossy().into_owned();
        let config = fixture.write_config("");
        let config = config.to_string_lossy().into_owned();
        let args = [
            "dirsort",
            folder.as_str(),
            folder.as_str(),
            "-d",
            action,
            "-c",
            config.as_str(),
        ];

        run_cli(&Cli::parse_from(args)).unwrap();
        run_cli(&Cli::parse_from(args)).unwrap();

        let source = fixture.source();
        assert_eq!(fs::read_to_string(source.join("pdf_files/report.pdf")).unwrap(), "report");
        assert_eq!(fs::read_to_string(source.join("txt/notes.txt")).unwrap(), "notes");
        assert_eq!(fs::read_dir(source.join("pdf_files")).unwrap().count(), 1);
        assert_eq!(fs::read_dir(source.join("txt")).unwrap().count(), 1);
        assert!(source.join(JOURNAL_FILE_NAME).is_file());
        assert!(!source.join("json").exists());
    }
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_followed() {
    let fixture = TestFixture::new();
    let outside = fixture.root().join("outside");
    fs::create_dir(&outside).unwrap();
    fs::write(outside.join("secret.pdf"), "s").unwrap();
    std::os::unix::fs::symlink(&outside, fixture.source().join("link")).unwrap();
    fixture.create_file("mine.pdf", "m");

    let (result, _) = fixture.organize(DuplicateAction::Skip);

    assert_eq!(result.unwrap().total(), 1);
    assert!(outside.join("secret.pdf").is_file());
}

// ============================================================================
// Test Suite 4: Configuration and Filtering
// ============================================================================

#[test]
fn test_cli_uses_configured_categories_and_subfolders() {
    let fixture = TestFixture::new();
    fixture.create_file("notes.md", "md");
    fixture.create_file("photo.jpg", "jpg");
    let config = fixture.write_config(
        r#"
        [[categories]]
        name = "text_files"
        extensions = ["txt", ".MD"]
        subfolders = ["drafts", "final"]
        "#,
    );

    fixture
        .run_cli(&["-c", &config.to_string_lossy()])
        .expect("cli should succeed");

    fixture.assert_target_file("text_files/notes.md", "md");
    fixture.assert_target_file("jpg/photo.jpg", "jpg");
    assert!(fixture.target().join("text_files/drafts").is_dir());
    assert!(!fixture.target().join("pdf_files").exists());
}

#[test]
fn test_cli_applies_filters() {
    let fixture = TestFixture::new();
    fixture.create_file("keep.pdf", "k");
    fixture.create_file("download.pdf.tmp", "t");
    fixture.create_file("cache/cached.pdf", "c");
    fixture.create_file(".hidden.pdf", "h");
    let config = fixture.write_config(
        r#"
        [filters]
        include_hidden = false
        [filters.exclude]
        extensions = ["tmp"]
        patterns = ["cache/**"]
        "#,
    );

    fixture
        .run_cli(&["-c", &config.to_string_lossy()])
        .expect("cli should succeed");

    assert_eq!(fixture.target_files("pdf_files"), vec!["keep.pdf"]);
    fixture.assert_source_file("download.pdf.tmp");
    fixture.assert_source_file("cache/cached.pdf");
    fixture.assert_source_file(".hidden.pdf");
}

#[test]
fn test_cli_flag_overrides_configured_action() {
    let fixture = TestFixture::new();
    fixture.create_file("a/x.zip", "1");
    fixture.create_file("b/x.zip", "2");
    let config = fixture.write_config(
        r#"
        [run]
        duplicate_action = "skip"
        jobs = 2
        "#,
    );

    fixture
        .run_cli(&["-c", &config.to_string_lossy(), "-d", "rename"])
        .expect("cli should succeed");

    assert_eq!(fixture.target_files("zip_files"), vec!["x.zip", "x_1.zip"]);
}

#[test]
fn test_cli_rejects_missing_or_invalid_config() {
    let fixture = TestFixture::new();
    let missing = fixture.root().join("nope.toml");
    assert!(fixture.run_cli(&["-c", &missing.to_string_lossy()]).is_err());

    let invalid = fixture.write_config("[[categories]]\nname = \"\"\nextensions = [\"a\"]\n");
    assert!(fixture.run_cli(&["-c", &invalid.to_string_lossy()]).is_err());
    assert!(!fixture.target().exists());
}

#[test]
fn test_config_message_override_reaches_reporter() {
    let config: Config = toml::from_str(
        r#"
        [messages]
        moved = "MOVED {0}"
        "#,
    )
    .unwrap();
    let fixture = TestFixture::new();
    fixture.create_file("a.gif", "g");
    let categories = CategoryTable::default();
    let subfolders = SubfolderTable::new();
    let filters = CompiledFilters::allow_all();
    let reporter = MemoryReporter::with_catalog(config.catalog().unwrap());

    Organizer::new(&categories, &subfolders, &filters, &reporter)
        .organize(&fixture.source(), &fixture.target(), &NoProgress)
        .unwrap();

    let lines = reporter.lines_at(Level::INFO);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("MOVED "));
    assert!(lines[0].ends_with("a.gif"));
}

// ============================================================================
// Test Suite 5: Dry Run, Journal and Undo
// ============================================================================

#[test]
fn test_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "a");
    fixture.create_file("b/c.png", "c");

    fixture.run_cli(&["--dry-run"]).expect("cli should succeed");

    assert!(!fixture.target().exists());
    assert_eq!(fixture.source_files().len(), 2);
}

#[test]
fn test_organize_then_undo_restores_everything() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf", "a");
    fixture.create_file("nested/b.jpg", "b");
    fixture.create_file("nested/deeper/c", "c");

    fixture.run_cli(&[]).expect("cli should succeed");
    assert!(fixture.target().join(JOURNAL_FILE_NAME).is_file());
    assert!(fixture.source_files().is_empty());

    fixture.run_cli(&["--undo"]).expect("undo should succeed");

    fixture.assert_source_file("a.pdf");
    fixture.assert_source_file("nested/b.jpg");
    fixture.assert_source_file("nested/deeper/c");
    assert!(!fixture.target().join(JOURNAL_FILE_NAME).exists());
    assert!(fixture.target_files("pdf_files").is_empty());
}

#[test]
fn test_undo_after_rename_restores_both_copies() {
    let fixture = TestFixture::new();
    fixture.create_file("one/report.pdf", "1");
    fixture.create_file("two/report.pdf", "2");

    fixture.run_cli(&["-d", "rename"]).expect("cli should succeed");
    fixture.run_cli(&["--undo"]).expect("undo should succeed");

    assert_eq!(fs::read_to_string(fixture.source().join("one/report.pdf")).unwrap(), "1");
    assert_eq!(fs::read_to_string(fixture.source().join("two/report.pdf")).unwrap(), "2");
}

#[test]
fn test_run_without_moves_writes_no_journal() {
    let fixture = TestFixture::new();

    fixture.run_cli(&[]).expect("cli should succeed");

    assert!(fixture.target().is_dir());
    assert!(!fixture.target().join(JOURNAL_FILE_NAME).exists());
    assert!(fixture.run_cli(&["--undo"]).is_err());
}

#[test]
fn test_undo_keeps_journal_when_a_source_is_occupied() {
    let fixture = TestFixture::new();
    fixture.create_file("a.zip", "organized");
    fixture.run_cli(&[]).expect("cli should succeed");
    fixture.create_file("a.zip", "newcomer");

    let reporter = MemoryReporter::new();
    let report = journal::undo(&fixture.target(), &reporter).expect("undo should run");

    assert_eq!(report.failed.len(), 1);
    assert!(fixture.target().join(JOURNAL_FILE_NAME).is_file());
    fixture.assert_target_file("zip_files/a.zip", "organized");
    assert_eq!(fs::read_to_string(fixture.source().join("a.zip")).unwrap(), "newcomer");
}
