//! Selection of the files a migration runs over.

use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Predicates for choosing source files under a root directory.
#[derive(Debug, Default, Clone)]
pub struct FileMatcher {
    extensions: Vec<String>,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,
    content_patterns: Vec<String>,
}

/// A [`FileMatcher`] with its globs and regexes compiled.
struct Compiled<'m> {
    matcher: &'m FileMatcher,
    include: GlobSet,
    exclude: GlobSet,
    content: Vec<Regex>,
}

impl FileMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches files with the given extension (without dot).
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Matches files with any of the given extensions.
    pub fn extensions(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions.extend(exts.into_iter().map(Into::into));
        self
    }

    /// Includes only files matching the glob, relative to the root.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_globs.push(pattern.into());
        self
    }

    /// Excludes files matching the glob, relative to the root.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_globs.push(pattern.into());
        self
    }

    /// Matches files whose content matches the regex.
    ///
    /// Useful to skip files that cannot contain anything to migrate, such as
    /// files that never mention the library being upgraded.
    pub fn contains_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.content_patterns.push(pattern.into());
        self
    }

    /// Collects all matching files under `root`, sorted by path.
    ///
    /// If `root` is itself a file, it is returned when it matches.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let compiled = self.compile()?;

        if root.is_file() {
            let base = root.parent().unwrap_or(root);
            return Ok(if compiled.is_match(root, base) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        let mut matched: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|path| compiled.is_match(path, root))
            .collect();

        matched.sort();
        Ok(matched)
    }

    /// Tests a single path against every predicate.
    pub fn matches(&self, path: &Path, root: &Path) -> Result<bool> {
        Ok(self.compile()?.is_match(path, root))
    }

    fn compile(&self) -> Result<Compiled<'_>> {
        Ok(Compiled {
            matcher: self,
            include: build_glob_set(&self.include_globs)?,
            exclude: build_glob_set(&self.exclude_globs)?,
            content: self
                .content_patterns
                .iter()
                .map(|p| Ok(Regex::new(p)?))
                .collect::<Result<_>>()?,
        })
    }
}

impl Compiled<'_> {
    fn is_match(&self, path: &Path, root: &Path) -> bool {
        let m = self.matcher;

        if !m.extensions.is_empty() {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !m.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                return false;
            }
        }

        let rel_path = path.strip_prefix(root).unwrap_or(path);

        if !m.include_globs.is_empty() && !self.include.is_match(rel_path) {
            return false;
        }

        if !m.exclude_globs.is_empty() && self.exclude.is_match(rel_path) {
            return false;
        }

        // Reading content is the expensive check, so it goes last.
        if !self.content.is_empty() {
            match fs::read_to_string(path) {
                Ok(content) => {
                    if !self.content.iter().any(|re| re.is_match(&content)) {
                        return false;
                    }
                }
                Err(_) => return false,
            }
        }

        true
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
