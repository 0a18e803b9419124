//! Diff generation for previewing migrations.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::fmt;
use std::path::Path;

const CONTEXT_LINES: usize = 3;

/// Generates a unified diff between two strings.
pub fn unified_diff(original: &str, modified: &str, path: &Path) -> String {
    let a = format!("a/{}", path.display());
    let b = format!("b/{}", path.display());

    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&a, &b)
        .to_string()
}

/// Colorized diff output for terminal display.
pub fn colorized_diff(original: &str, modified: &str, path: &Path) -> String {
    const RED: &str = "\x1b[31m";
    const GREEN: &str = "\x1b[32m";
    const CYAN: &str = "\x1b[36m";
    const RESET: &str = "\x1b[0m";

    let diff = TextDiff::from_lines(original, modified);
    let mut output = format!(
        "{CYAN}--- a/{path}{RESET}\n{CYAN}+++ b/{path}{RESET}\n",
        path = path.display()
    );

    for hunk in diff.unified_diff().context_radius(CONTEXT_LINES).iter_hunks() {
        output.push_str(&format!("{CYAN}{}{RESET}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let line = change.to_string_lossy();
            let line = line.strip_suffix('\n').unwrap_or(&line);
            match change.tag() {
                ChangeTag::Delete => output.push_str(&format!("{RED}-{line}{RESET}\n")),
                ChangeTag::Insert => output.push_str(&format!("{GREEN}+{line}{RESET}\n")),
                ChangeTag::Equal => output.push_str(&format!(" {line}\n")),
            }
        }
    }

    output
}

/// Line counts of a set of changes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffSummary {
    /// Creates a summary from original and modified content.
    pub fn from_diff(original: &str, modified: &str) -> Self {
        let diff = TextDiff::from_lines(original, modified);
        let mut insertions = 0;
        let mut deletions = 0;

        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => insertions += 1,
                ChangeTag::Delete => deletions += 1,
                ChangeTag::Equal => {}
            }
        }

        Self {
            files_changed: usize::from(insertions > 0 || deletions > 0),
            insertions,
            deletions,
        }
    }

    /// Combines two summaries.
    pub fn merge(&mut self, other: &DiffSummary) {
        self.files_changed += other.files_changed;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s) changed, {} insertions(+), {} deletions(-)",
            self.files_changed, self.insertions, self.deletions
        )
    }
}
