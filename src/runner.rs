//! Running a migration over a directory tree.

use crate::codemod::Migration;
use crate::diff::{DiffSummary, colorized_diff, unified_diff};
use crate::document::Document;
use crate::edit::Diagnostic;
use crate::error::{MigrateError, Result};
use crate::lang::LanguageRegistry;
use crate::pipeline::{PassFailure, Pipeline, Status};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Unchanged,
    Transformed,
    PartiallyTransformed,
    /// The file could not be read, parsed or rewritten.
    Failed,
}

impl From<Status> for FileStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Unchanged => FileStatus::Unchanged,
            Status::Transformed => FileStatus::Transformed,
            Status::PartiallyTransformed => FileStatus::PartiallyTransformed,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Unchanged => write!(f, "unchanged"),
            FileStatus::Transformed => write!(f, "transformed"),
            FileStatus::PartiallyTransformed => write!(f, "partially transformed"),
            FileStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The outcome for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<PassFailure>,
    /// Why the file failed, for [`FileStatus::Failed`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub original: String,
    #[serde(skip)]
    pub output: String,
}

impl FileReport {
    fn failed(path: &Path, original: String, error: &MigrateError) -> Self {
        warn!(path = %path.display(), error = %error, "skipping file");
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            diagnostics: Vec::new(),
            failures: Vec::new(),
            error: Some(error.to_string()),
            output: original.clone(),
            original,
        }
    }

    /// Marks a file whose rewrite could not be saved. It keeps its original
    /// text so that it no longer counts as modified.
    fn write_failed(&mut self, error: &MigrateError) {
        warn!(path = %self.path.display(), error = %error, "could not write file");
        self.status = FileStatus::Failed;
        self.error = Some(error.to_string());
        self.output = self.original.clone();
    }

    /// Returns true if the rewritten text differs from the original.
    pub fn is_modified(&self) -> bool {
        self.original != self.output
    }
}

/// The result of running a migration.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub migration: String,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    pub summary: DiffSummary,
}

impl RunResult {
    /// Returns the number of files that were modified.
    pub fn files_modified(&self) -> usize {
        self.files.iter().filter(|f| f.is_modified()).count()
    }

    /// Returns the reports of files that could not be processed.
    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Failed)
    }

    /// Returns the number of dropped edits across all files.
    pub fn diagnostics_count(&self) -> usize {
        self.files.iter().map(|f| f.diagnostics.len()).sum()
    }

    /// Generates a unified diff of all changes.
    pub fn diff(&self) -> String {
        self.modified()
            .map(|f| unified_diff(&f.original, &f.output, &f.path))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generates a colorized diff for terminal display.
    pub fn colorized_diff(&self) -> String {
        self.modified()
            .map(|f| colorized_diff(&f.original, &f.output, &f.path))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn modified(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.is_modified())
    }
}

/// Applies a [`Migration`] to every matching file under a root.
///
/// ```rust,no_run
/// use migrate_dsl::codemod::zod_v4;
/// use migrate_dsl::runner::Runner;
///
/// let result = Runner::in_dir("./web").migration(zod_v4()).dry_run().run()?;
/// println!("{}", result.diff());
/// # Ok::<(), migrate_dsl::error::MigrateError>(())
/// ```
pub struct Runner {
    root: PathBuf,
    migration: Option<Box<dyn Migration>>,
    languages: LanguageRegistry,
    dry_run: bool,
}

impl Runner {
    /// Creates a runner rooted at the given directory or file.
    pub fn in_dir(path: impl Into<PathBuf>) -> Self {
        Self {
            root: path.into(),
            migration: None,
            languages: LanguageRegistry::new(),
            dry_run: false,
        }
    }

    /// Creates a runner in the current directory.
    pub fn current_dir() -> Result<Self> {
        Ok(Self::in_dir(std::env::current_dir()?))
    }

    /// Sets the migration to run.
    pub fn migration(self, migration: impl Migration + 'static) -> Self {
        self.boxed_migration(Box::new(migration))
    }

    pub fn boxed_migration(mut self, migration: Box<dyn Migration>) -> Self {
        self.migration = Some(migration);
        self
    }

    /// Enables dry-run mode (preview changes without writing them).
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs the migration and returns a report for every matched file.
    ///
    /// Files are processed in parallel and written afterwards, one at a time.
    /// A file that fails, including one that cannot be written, is reported
    /// and left untouched; the run goes on.
    pub fn run(self) -> Result<RunResult> {
        let migration = self
            .migration
            .ok_or_else(|| MigrateError::InvalidConfig("no migration selected".to_string()))?;

        let files = migration.files().collect(&self.root)?;
        if files.is_empty() {
            return Err(MigrateError::NoFilesMatched);
        }

        info!(
            migration = migration.name(),
            root = %self.root.display(),
            files = files.len(),
            dry_run = self.dry_run,
            "running migration"
        );

        let pipeline = migration.pipeline();
        let mut reports: Vec<FileReport> = files
            .par_iter()
            .map(|path| process_file(path, &pipeline, &self.languages))
            .collect();

        let summary = write_reports(&mut reports, self.dry_run);

        Ok(RunResult {
            migration: migration.name().to_string(),
            dry_run: self.dry_run,
            files: reports,
            summary,
        })
    }

    /// Runs in preview mode and returns the diff.
    pub fn preview(self) -> Result<String> {
        Ok(self.dry_run().run()?.diff())
    }
}

/// Writes every modified file unless `dry_run`, and sums up the changes
/// that were kept.
fn write_reports(reports: &mut [FileReport], dry_run: bool) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for report in reports.iter_mut().filter(|r| r.is_modified()) {
        if !dry_run {
            if let Err(err) = fs::write(&report.path, &report.output) {
                report.write_failed(&err.into());
                continue;
            }
            info!(path = %report.path.display(), status = %report.status, "wrote file");
        }
        summary.merge(&DiffSummary::from_diff(&report.original, &report.output));
    }
    summary
}

fn process_file(path: &Path, pipeline: &Pipeline, languages: &LanguageRegistry) -> FileReport {
    let original = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => return FileReport::failed(path, String::new(), &err.into()),
    };

    let Some(lang) = languages.detect(path) else {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("unknown");
        return FileReport::failed(path, original, &MigrateError::UnsupportedLanguage(ext.to_string()));
    };

    let doc = match Document::parse(original.as_str(), lang) {
        Ok(doc) => doc.with_path(path),
        Err(err) => return FileReport::failed(path, original, &err),
    };

    if doc.has_errors() {
        let err = MigrateError::Parse {
            path: path.to_path_buf(),
            message: "source contains syntax errors".to_string(),
        };
        return FileReport::failed(path, original, &err);
    }

    match pipeline.run_settled(&doc, lang) {
        Ok(outcome) => FileReport {
            path: path.to_path_buf(),
            status: outcome.status.into(),
            diagnostics: outcome.diagnostics,
            failures: outcome.failures,
            error: None,
            original,
            output: outcome.output,
        },
        Err(err) => FileReport::failed(path, original, &err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemod::{react_unsafe_lifecycles, zod_v4};
    use tempfile::TempDir;

    const SCHEMA: &str = "import { z } from \"zod\";\nexport const Name = z.string().default(\"x\");\n";

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/schema.ts"), SCHEMA).unwrap();
        fs::write(dir.path().join("src/plain.ts"), "export const n = 1;\n").unwrap();
        dir
    }

    #[test]
    fn test_dry_run_leaves_files_alone() {
        let dir = project();

        let result = Runner::in_dir(dir.path())
            .migration(zod_v4())
            .dry_run()
            .run()
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files_modified(), 1);
        assert!(result.diff().contains("+export const Name = z.string().optional().default(\"x\");"));
        assert_eq!(
            fs::read_to_string(dir.path().join("src/schema.ts")).unwrap(),
            SCHEMA
        );
    }

    #[test]
    fn test_run_writes_changes() {
        let dir = project();

        let result = Runner::in_dir(dir.path()).migration(zod_v4()).run().unwrap();

        assert_eq!(result.files[0].status, FileStatus::Transformed);
        assert_eq!(result.summary.files_changed, 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("src/schema.ts")).unwrap(),
            "import { z } from \"zod/v4\";\nexport const Name = z.string().optional().default(\"x\");\n"
        );
    }

    #[test]
    fn test_no_matching_files() {
        let dir = project();
        let err = Runner::in_dir(dir.path())
            .migration(react_unsafe_lifecycles())
            .run()
            .unwrap_err();
        assert!(matches!(err, MigrateError::NoFilesMatched));
    }

    #[test]
    fn test_missing_migration() {
        let dir = project();
        assert!(Runner::in_dir(dir.path()).run().is_err());
    }

    #[test]
    fn test_syntax_errors_fail_only_that_file() {
        let dir = project();
        fs::write(
            dir.path().join("src/broken.ts"),
            "import { z } from \"zod\";\nconst = z.string(;\n",
        )
        .unwrap();

        let result = Runner::in_dir(dir.path())
            .migration(zod_v4())
            .dry_run()
            .run()
            .unwrap();

        assert_eq!(result.files.len(), 2);
        assert_eq!(result.failed().count(), 1);
        assert_eq!(result.files_modified(), 1);
    }

    #[test]
    fn test_unwritable_file_is_reported_and_run_goes_on() {
        let dir = project();
        let report = |path: PathBuf| FileReport {
            path,
            status: FileStatus::Transformed,
            diagnostics: Vec::new(),
            failures: Vec::new(),
            error: None,
            original: "a\n".to_string(),
            output: "b\n".to_string(),
        };
        let mut reports = vec![
            report(dir.path().join("missing/a.ts")),
            report(dir.path().join("src/b.ts")),
        ];

        let summary = write_reports(&mut reports, false);

        assert_eq!(reports[0].status, FileStatus::Failed);
        assert!(reports[0].error.is_some());
        assert!(!reports[0].is_modified());
        assert_eq!(reports[1].status, FileStatus::Transformed);
        assert_eq!(fs::read_to_string(dir.path().join("src/b.ts")).unwrap(), "b\n");
        assert_eq!(summary.files_changed, 1);
    }

    #[test]
    fn test_nested_rewrites_finish_in_one_run() {
        let dir = project();
        fs::write(
            dir.path().join("src/schema.ts"),
            "import { z } from \"zod\";\nexport const Name = z.string().min(1, \"x\").default(\"\");\n",
        )
        .unwrap();

        let result = Runner::in_dir(dir.path()).migration(zod_v4()).run().unwrap();

        assert_eq!(result.files[0].status, FileStatus::Transformed);
        assert_eq!(result.diagnostics_count(), 0);
        assert_eq!(
            fs::read_to_string(dir.path().join("src/schema.ts")).unwrap(),
            "import { z } from \"zod/v4\";\nexport const Name = z.string().min(1, { message: \"x\" }).optional().default(\"\");\n"
        );
    }

    #[test]
    fn test_result_serializes() {
        let dir = project();
        let result = Runner::in_dir(dir.path())
            .migration(zod_v4())
            .dry_run()
            .run()
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["migration"], "zod-v4");
        assert_eq!(json["files"][0]["status"], "transformed");
        assert!(json["files"][0].get("original").is_none());
    }
}
