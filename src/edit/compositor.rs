//! Merging edits from independent passes and materializing the result.

use super::{ConflictReason, Diagnostic, Edit, Range};
use crate::error::{MigrateError, Result};
use std::cmp::Reverse;
use tracing::{debug, warn};

/// Edits that survived merging, plus a diagnostic for every edit that did not.
#[derive(Debug, Default)]
pub struct Merged {
    /// Non-overlapping edits in ascending start order.
    pub accepted: Vec<Edit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// One step of walking the original source during application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Original text copied verbatim.
    Copy(Range),
    /// Original text replaced by an edit.
    Replace { range: Range, text: &'a str },
}

impl Segment<'_> {
    /// Returns the range of the original source this segment accounts for.
    pub fn range(&self) -> Range {
        match self {
            Segment::Copy(range) => *range,
            Segment::Replace { range, .. } => *range,
        }
    }
}

/// The rewritten text together with how it was produced.
#[derive(Debug)]
pub struct Commit {
    pub output: String,
    pub accepted: Vec<Edit>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Commit {
    /// Returns true if at least one edit was applied.
    pub fn is_changed(&self) -> bool {
        !self.accepted.is_empty()
    }
}

/// Merges edits proposed against one source and applies the survivors.
///
/// Edits are ordered by start offset ascending and, for equal starts, by end
/// offset descending, so an edit that contains another is seen first and wins.
/// A partially overlapping edit is dropped and reported instead of being
/// spliced into offsets that no longer mean anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compositor;

impl Compositor {
    /// Creates a new compositor.
    pub fn new() -> Self {
        Self
    }

    /// Orders edits and resolves conflicts between them.
    ///
    /// The result is deterministic for a given input sequence: ties between
    /// edits with identical ranges are broken by input order.
    pub fn merge(&self, edits: Vec<Edit>) -> Merged {
        let mut edits = edits;
        // Insertions sort ahead of a replacement starting at the same offset,
        // so inserted text lands before the replaced span.
        edits.sort_by_key(|e| {
            let range = e.range();
            (range.start(), !range.is_empty(), Reverse(range.end()))
        });

        let mut merged = Merged {
            accepted: Vec::with_capacity(edits.len()),
            diagnostics: Vec::new(),
        };

        for edit in edits {
            let Some(last) = merged.accepted.last() else {
                merged.accepted.push(edit);
                continue;
            };

            if last.same_change(&edit) {
                debug!(range = %edit.range(), "collapsing duplicate edit");
                continue;
            }

            if !last.overlaps(&edit) {
                merged.accepted.push(edit);
                continue;
            }

            let reason = if last.range().contains(&edit.range()) {
                ConflictReason::Contained
            } else {
                ConflictReason::Overlap
            };

            warn!(
                start = edit.range().start(),
                end = edit.range().end(),
                kept_start = last.range().start(),
                kept_end = last.range().end(),
                reason = %reason,
                pass = edit.origin().unwrap_or("<unknown>"),
                "dropping conflicting edit"
            );

            merged.diagnostics.push(Diagnostic {
                range: edit.range(),
                reason,
                kept: last.range(),
                origin: edit.origin().map(str::to_string),
            });
        }

        merged
    }

    /// Checks that every edit addresses valid offsets of `source`.
    pub fn check_bounds(&self, source: &str, edits: &[Edit]) -> Result<()> {
        for edit in edits {
            let range = edit.range();
            if range.end() > source.len() {
                return Err(MigrateError::OffsetOutOfBounds {
                    start: range.start(),
                    end: range.end(),
                    len: source.len(),
                });
            }
            for offset in [range.start(), range.end()] {
                if !source.is_char_boundary(offset) {
                    return Err(MigrateError::NotCharBoundary { offset });
                }
            }
        }
        Ok(())
    }

    /// Splits `source` into copied and replaced segments.
    ///
    /// `edits` must be sorted and disjoint, as produced by [`Compositor::merge`].
    /// Every byte of `source` is accounted for by exactly one segment.
    pub fn segments<'e>(&self, source: &str, edits: &'e [Edit]) -> Result<Vec<Segment<'e>>> {
        self.check_bounds(source, edits)?;

        let mut segments = Vec::with_capacity(edits.len() * 2 + 1);
        let mut cursor = 0;

        for edit in edits {
            let range = edit.range();
            if range.start() < cursor {
                return Err(MigrateError::UnorderedEdits {
                    offset: range.start(),
                });
            }
            if range.start() > cursor {
                segments.push(Segment::Copy(Range::new(cursor, range.start())?));
            }
            segments.push(Segment::Replace {
                range,
                text: edit.replacement(),
            });
            cursor = range.end();
        }

        if cursor < source.len() {
            segments.push(Segment::Copy(Range::new(cursor, source.len())?));
        }

        Ok(segments)
    }

    /// Applies sorted, disjoint edits to `source`.
    ///
    /// Fails without producing any text if an edit is out of bounds, splits a
    /// character, or is out of order.
    pub fn apply(&self, source: &str, edits: &[Edit]) -> Result<String> {
        let segments = self.segments(source, edits)?;

        let mut output = String::with_capacity(source.len());
        for segment in &segments {
            match segment {
                Segment::Copy(range) => output.push_str(&source[range.start()..range.end()]),
                Segment::Replace { text, .. } => output.push_str(text),
            }
        }
        Ok(output)
    }

    /// Merges `edits` and applies the survivors to `source`.
    ///
    /// Bounds are checked on every proposed edit, not only the survivors: an
    /// out-of-range offset means the pass that produced it has a corrupted view
    /// of the document.
    pub fn commit(&self, source: &str, edits: Vec<Edit>) -> Result<Commit> {
        self.check_bounds(source, &edits)?;

        let Merged {
            accepted,
            diagnostics,
        } = self.merge(edits);

        let output = if accepted.is_empty() {
            source.to_string()
        } else {
            self.apply(source, &accepted)?
        };

        Ok(Commit {
            output,
            accepted,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(start: usize, end: usize, text: &str) -> Edit {
        Edit::replace(Range::new(start, end).unwrap(), text)
    }

    #[test]
    fn test_containing_edit_wins() {
        let merged = Compositor::new().merge(vec![edit(5, 10, "inner"), edit(0, 20, "outer")]);

        assert_eq!(merged.accepted.len(), 1);
        assert_eq!(merged.accepted[0].replacement(), "outer");
        assert_eq!(merged.diagnostics.len(), 1);
        assert_eq!(merged.diagnostics[0].reason, ConflictReason::Contained);
        assert_eq!(merged.diagnostics[0].range, Range::new(5, 10).unwrap());
        assert_eq!(merged.diagnostics[0].kept, Range::new(0, 20).unwrap());
    }

    #[test]
    fn test_partial_overlap_drops_later_edit() {
        let merged = Compositor::new().merge(vec![edit(5, 15, "b"), edit(0, 10, "a")]);

        assert_eq!(merged.accepted.len(), 1);
        assert_eq!(merged.accepted[0].replacement(), "a");
        assert_eq!(merged.diagnostics.len(), 1);
        assert_eq!(merged.diagnostics[0].reason, ConflictReason::Overlap);
    }

    #[test]
    fn test_same_range_keeps_first_in_input_order() {
        let merged = Compositor::new().merge(vec![
            edit(2, 4, "first").with_origin("a"),
            edit(2, 4, "second").with_origin("b"),
        ]);

        assert_eq!(merged.accepted[0].replacement(), "first");
        assert_eq!(merged.diagnostics[0].reason, ConflictReason::Contained);
        assert_eq!(merged.diagnostics[0].origin.as_deref(), Some("b"));
    }

    #[test]
    fn test_duplicate_edits_collapse_silently() {
        let merged = Compositor::new().merge(vec![edit(2, 4, "x"), edit(2, 4, "x")]);
        assert_eq!(merged.accepted.len(), 1);
        assert!(merged.diagnostics.is_empty());
    }

    #[test]
    fn test_adjacent_edits_both_apply() {
        let source = "abcdef";
        let commit = Compositor::new()
            .commit(source, vec![edit(3, 6, "DEF"), edit(0, 3, "ABC")])
            .unwrap();

        assert_eq!(commit.output, "ABCDEF");
        assert!(commit.diagnostics.is_empty());
    }

    #[test]
    fn test_insertion_before_replacement_at_same_offset() {
        let source = "let x = 1;";
        let commit = Compositor::new()
            .commit(
                source,
                vec![edit(0, 3, "const"), Edit::insert(0, "// migrated\n")],
            )
            .unwrap();

        assert_eq!(commit.output, "// migrated\nconst x = 1;");
    }

    #[test]
    fn test_insertion_inside_replacement_is_dropped() {
        let merged = Compositor::new().merge(vec![edit(0, 10, "x"), Edit::insert(4, "y")]);
        assert_eq!(merged.accepted.len(), 1);
        assert_eq!(merged.diagnostics[0].reason, ConflictReason::Contained);
    }

    #[test]
    fn test_segments_cover_every_byte_once() {
        let source = "const a = z.string().default(\"x\").optional();";
        let merged = Compositor::new().merge(vec![
            edit(6, 7, "b"),
            edit(10, 44, "z.string().optional().default(\"x\")"),
            Edit::insert(0, "/* */ "),
            edit(12, 18, "clash"),
        ]);

        let segments = Compositor::new()
            .segments(source, &merged.accepted)
            .unwrap();

        let mut cursor = 0;
        for segment in &segments {
            assert_eq!(segment.range().start(), cursor);
            cursor = segment.range().end();
        }
        assert_eq!(cursor, source.len());

        let covered: usize = segments.iter().map(|s| s.range().len()).sum();
        assert_eq!(covered, source.len());
    }

    #[test]
    fn test_merge_is_deterministic() {
        let edits = vec![
            edit(8, 12, "c"),
            edit(0, 4, "a"),
            edit(2, 6, "b"),
            edit(8, 12, "d"),
        ];
        let first = Compositor::new().merge(edits.clone());
        let second = Compositor::new().merge(edits);

        assert_eq!(first.accepted, second.accepted);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn test_out_of_bounds_is_fatal() {
        let err = Compositor::new()
            .commit("short", vec![edit(0, 2, "ok"), edit(3, 9, "bad")])
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::OffsetOutOfBounds {
                start: 3,
                end: 9,
                len: 5
            }
        ));
    }

    #[test]
    fn test_out_of_bounds_is_fatal_even_when_contained() {
        let result = Compositor::new().commit("short", vec![edit(0, 5, "x"), edit(1, 7, "y")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_split_character_is_rejected() {
        let err = Compositor::new()
            .commit("héllo", vec![edit(0, 2, "x")])
            .unwrap_err();
        assert!(matches!(err, MigrateError::NotCharBoundary { offset: 2 }));
    }

    #[test]
    fn test_apply_rejects_unsorted_edits() {
        let err = Compositor::new()
            .apply("abcdef", &[edit(3, 4, "x"), edit(0, 1, "y")])
            .unwrap_err();
        assert!(matches!(err, MigrateError::UnorderedEdits { offset: 0 }));
    }

    #[test]
    fn test_no_edits_returns_source() {
        let commit = Compositor::new().commit("unchanged", Vec::new()).unwrap();
        assert_eq!(commit.output, "unchanged");
        assert!(!commit.is_changed());
    }
}
