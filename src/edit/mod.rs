//! The edit model: byte ranges over an immutable source and replacements
//! proposed against them.
//!
//! Every pass reads the same original text and emits [`Edit`]s whose offsets
//! refer to that text. Nothing is applied until the [`Compositor`] has merged
//! the edits from all passes, which is what lets independent passes compose
//! without re-parsing in between.
//!
//! ## Example
//!
//! ```rust
//! use migrate_dsl::edit::{Compositor, Edit, Range};
//!
//! let source = "z.string().describe(\"id\")";
//! let edits = vec![
//!     Edit::replace(Range::new(0, 25)?, "z.string().meta({description: \"id\"})"),
//!     Edit::replace(Range::new(2, 8)?, "text"),
//! ];
//!
//! let commit = Compositor::new().commit(source, edits)?;
//! assert_eq!(commit.output, "z.string().meta({description: \"id\"})");
//! assert_eq!(commit.diagnostics.len(), 1);
//! # Ok::<(), migrate_dsl::error::MigrateError>(())
//! ```

mod compositor;

pub use compositor::{Commit, Compositor, Merged, Segment};

use crate::error::{MigrateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open byte interval `[start, end)` over the original source.
///
/// A zero-length range is a pure insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Range {
    start: usize,
    end: usize,
}

impl Range {
    /// Creates a range, rejecting `start > end`.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(MigrateError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a zero-length range at `offset`.
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Returns the byte range covered by a syntax node.
    pub fn of_node(node: &tree_sitter::Node<'_>) -> Self {
        Self {
            start: node.start_byte(),
            end: node.end_byte(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Returns the number of bytes covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true for an insertion point.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if the two ranges share at least one byte.
    ///
    /// An insertion point overlaps a range only when it lies strictly inside
    /// it; inserting at either boundary leaves the range untouched.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `other` lies entirely within this range.
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns a copy moved `delta` bytes to the right.
    pub fn shifted(&self, delta: usize) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Returns the slice of `source` this range covers, if it is in bounds.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl From<Range> for std::ops::Range<usize> {
    fn from(range: Range) -> Self {
        range.start..range.end
    }
}

/// A replacement of one [`Range`] of the original source.
///
/// Edits are created by exactly one pass and are not modified once handed to
/// the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    range: Range,
    replacement: String,
    origin: Option<String>,
}

impl Edit {
    /// Creates an edit replacing `range` with `replacement`.
    pub fn new(range: Range, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
            origin: None,
        }
    }

    /// Creates a replacement edit.
    pub fn replace(range: Range, replacement: impl Into<String>) -> Self {
        Self::new(range, replacement)
    }

    /// Creates an insertion at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(Range::point(offset), text)
    }

    /// Creates an edit removing `range`.
    pub fn delete(range: Range) -> Self {
        Self::new(range, String::new())
    }

    /// Records the name of the pass that produced this edit.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Returns the name of the pass that produced this edit, when known.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns true if both edits touch at least one common byte.
    pub fn overlaps(&self, other: &Edit) -> bool {
        self.range.overlaps(&other.range)
    }

    /// Returns true if both edits make the same change, whoever proposed them.
    pub fn same_change(&self, other: &Edit) -> bool {
        self.range == other.range && self.replacement == other.replacement
    }
}

/// Why the compositor dropped an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictReason {
    /// The edit partially overlapped an accepted edit.
    Overlap,
    /// The edit lay inside an accepted edit that supersedes it.
    Contained,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::Overlap => write!(f, "overlap"),
            ConflictReason::Contained => write!(f, "contained"),
        }
    }
}

/// Report of an edit the compositor dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Range of the dropped edit.
    pub range: Range,
    pub reason: ConflictReason,
    /// Range of the accepted edit that won.
    pub kept: Range,
    /// Pass that produced the dropped edit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dropped edit {} ({}, kept {})",
            self.range, self.reason, self.kept
        )?;
        if let Some(origin) = &self.origin {
            write!(f, " from pass '{origin}'")?;
        }
        Ok(())
    }
}
