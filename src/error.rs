//! Error types for the migration DSL.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for migration operations.
///
/// Only buffer-level invariant violations and environment failures live here.
/// A chain that does not parse, or an edit that loses a conflict, is an
/// ordinary outcome and is reported through [`crate::chain::ChainError`] or
/// [`crate::edit::Diagnostic`] instead.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tree-sitter parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Tree-sitter query error: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Edit range [{start}, {end}) is outside a source of {len} bytes")]
    OffsetOutOfBounds { start: usize, end: usize, len: usize },

    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Edit offset {offset} does not fall on a character boundary")]
    NotCharBoundary { offset: usize },

    #[error("Edits are not sorted and disjoint at offset {offset}")]
    UnorderedEdits { offset: usize },

    #[error("Unknown migration: {0}")]
    UnknownMigration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No files matched the specified criteria")]
    NoFilesMatched,

    #[error("Pass '{pass}' failed: {message}")]
    PassFailed { pass: String, message: String },
}

impl MigrateError {
    /// Returns true if this error invalidates the whole document being processed.
    pub fn is_fatal_for_document(&self) -> bool {
        matches!(
            self,
            MigrateError::OffsetOutOfBounds { .. }
                | MigrateError::InvalidRange { .. }
                | MigrateError::NotCharBoundary { .. }
                | MigrateError::UnorderedEdits { .. }
        )
    }
}

/// A specialized Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_errors_are_fatal() {
        let err = MigrateError::OffsetOutOfBounds {
            start: 4,
            end: 12,
            len: 10,
        };
        assert!(err.is_fatal_for_document());
        assert_eq!(
            err.to_string(),
            "Edit range [4, 12) is outside a source of 10 bytes"
        );
    }

    #[test]
    fn test_pass_failure_is_not_fatal() {
        let err = MigrateError::PassFailed {
            pass: "zod-imports".to_string(),
            message: "bad query".to_string(),
        };
        assert!(!err.is_fatal_for_document());
    }
}
