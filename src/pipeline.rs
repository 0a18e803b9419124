//! Running many passes over one document and merging what they propose.

use crate::document::Document;
use crate::edit::{Compositor, ConflictReason, Diagnostic, Edit};
use crate::error::Result;
use crate::lang::Language;
use crate::pass::{Pass, PassContext};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

/// Upper bound on the rounds [`Pipeline::run_settled`] takes per document.
pub const MAX_ROUNDS: usize = 4;

/// How a document came out of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// No accepted edit changed the text.
    Unchanged,
    /// Every proposed edit was applied and every pass succeeded.
    Transformed,
    /// Some edits were dropped as conflicting, or some pass failed.
    PartiallyTransformed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unchanged => write!(f, "unchanged"),
            Status::Transformed => write!(f, "transformed"),
            Status::PartiallyTransformed => write!(f, "partially transformed"),
        }
    }
}

/// A pass that returned an error instead of edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassFailure {
    pub pass: String,
    pub message: String,
}

impl fmt::Display for PassFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass '{}' failed: {}", self.pass, self.message)
    }
}

/// The result of running a pipeline over one document.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Rewritten text, or the original text when nothing changed.
    pub output: String,
    pub status: Status,
    /// Number of edits applied.
    pub applied: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<PassFailure>,
}

impl Outcome {
    pub fn is_changed(&self) -> bool {
        self.status != Status::Unchanged
    }
}

/// An ordered collection of passes run against the same original document.
///
/// Every pass sees the unmodified source. All edits are gathered first and
/// handed to the [`Compositor`] once, so no pass depends on another's output.
///
/// # Example
///
/// ```rust
/// use migrate_dsl::lang::TypeScript;
/// use migrate_dsl::matcher::Pattern;
/// use migrate_dsl::pass::{Handler, Rule, RuleSet};
/// use migrate_dsl::pipeline::{Pipeline, Status};
///
/// let pipeline = Pipeline::new().pass(RuleSet::new("rename").rule(Rule::new(
///     "old-to-new",
///     Pattern::new(r#"((identifier) @id (#eq? @id "oldApi"))"#, "id"),
///     Handler::replace(|_, _| Some("newApi".to_string())),
/// )));
///
/// let outcome = pipeline.run_source("oldApi();", &TypeScript)?;
/// assert_eq!(outcome.output, "newApi();");
/// assert_eq!(outcome.status, Status::Transformed);
/// # Ok::<(), migrate_dsl::error::MigrateError>(())
/// ```
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
    parallel: bool,
    compositor: Compositor,
}

impl Pipeline {
    /// Creates an empty pipeline that schedules passes in parallel.
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            parallel: true,
            compositor: Compositor::new(),
        }
    }

    /// Appends a pass.
    pub fn pass(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Appends an already boxed pass.
    pub fn boxed(mut self, pass: Box<dyn Pass>) -> Self {
        self.passes.push(pass);
        self
    }

    /// Appends every pass of another pipeline.
    pub fn extend(mut self, other: Pipeline) -> Self {
        self.passes.extend(other.passes);
        self
    }

    /// Chooses between parallel and sequential pass scheduling.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Returns the pass names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Runs every pass and collects their edits without applying them.
    ///
    /// Edits are returned in registration order with their origin stamped.
    pub fn collect(&self, doc: &Document, ctx: &PassContext) -> (Vec<Edit>, Vec<PassFailure>) {
        let results: Vec<Result<Vec<Edit>>> = if self.parallel {
            self.passes
                .par_iter()
                .map(|pass| run_pass(pass.as_ref(), doc, ctx))
                .collect()
        } else {
            self.passes
                .iter()
                .map(|pass| run_pass(pass.as_ref(), doc, ctx))
                .collect()
        };

        let mut edits = Vec::new();
        let mut failures = Vec::new();

        for (pass, result) in self.passes.iter().zip(results) {
            let name = pass.name();
            match result {
                Ok(pass_edits) => {
                    edits.extend(pass_edits.into_iter().map(|e| e.with_origin(name)));
                }
                Err(err) => {
                    warn!(pass = name, path = %doc.label(), error = %err, "pass failed");
                    failures.push(PassFailure {
                        pass: name.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        (edits, failures)
    }

    /// Runs the pipeline over one document.
    ///
    /// A failing pass is recorded in the outcome and the others still apply.
    /// Only an edit that addresses offsets outside the document aborts it.
    pub fn run(&self, doc: &Document) -> Result<Outcome> {
        let ctx = PassContext::from_document(doc);
        let (edits, failures) = self.collect(doc, &ctx);
        let proposed = edits.len();

        let commit = self.compositor.commit(doc.source(), edits)?;

        let applied = commit.accepted.len();
        let status = if commit.output == doc.source() {
            Status::Unchanged
        } else if commit.diagnostics.is_empty() && failures.is_empty() {
            Status::Transformed
        } else {
            Status::PartiallyTransformed
        };

        debug!(
            path = %doc.label(),
            proposed,
            applied,
            dropped = commit.diagnostics.len(),
            failed = failures.len(),
            status = %status,
            "document processed"
        );

        Ok(Outcome {
            output: commit.output,
            status,
            applied,
            diagnostics: commit.diagnostics,
            failures,
        })
    }

    /// Runs the pipeline repeatedly until no edit is dropped for lying inside
    /// another one.
    ///
    /// An edit nested in an accepted edit is dropped as
    /// [`ConflictReason::Contained`]; once the outer edit is applied, the next
    /// round proposes the inner one against the new text. Rounds stop when
    /// nothing is left to drop, when a round changes nothing, when a pass
    /// fails or an overlap is reported, or after [`MAX_ROUNDS`]. The outcome
    /// carries the last round's diagnostics and failures and the total number
    /// of applied edits.
    pub fn run_settled(&self, doc: &Document, lang: &dyn Language) -> Result<Outcome> {
        let mut outcome = self.run(doc)?;

        for round in 2..=MAX_ROUNDS {
            if !only_contained(&outcome) {
                break;
            }
            let mut next_doc = Document::parse(outcome.output.as_str(), lang)?;
            if next_doc.has_errors() {
                warn!(path = %doc.label(), round, "rewritten text has syntax errors, not rerunning");
                break;
            }
            if let Some(path) = doc.path() {
                next_doc = next_doc.with_path(path);
            }

            let next = self.run(&next_doc)?;
            debug!(
                path = %doc.label(),
                round,
                applied = next.applied,
                dropped = next.diagnostics.len(),
                "reran pipeline"
            );
            let changed = next.is_changed();
            outcome = Outcome {
                output: next.output,
                status: outcome.status,
                applied: outcome.applied + next.applied,
                diagnostics: next.diagnostics,
                failures: next.failures,
            };
            if !changed {
                break;
            }
        }

        outcome.status = if outcome.output == doc.source() {
            Status::Unchanged
        } else if outcome.diagnostics.is_empty() && outcome.failures.is_empty() {
            Status::Transformed
        } else {
            Status::PartiallyTransformed
        };
        Ok(outcome)
    }

    /// Parses `source` and runs the pipeline over it.
    pub fn run_source(&self, source: &str, lang: &dyn Language) -> Result<Outcome> {
        self.run(&Document::parse(source, lang)?)
    }

    /// Runs the pipeline over many documents in parallel.
    ///
    /// Results are returned in the same order as `docs`; one document failing
    /// does not affect the others.
    pub fn run_batch(&self, docs: &[Document]) -> Vec<Result<Outcome>> {
        docs.par_iter().map(|doc| self.run(doc)).collect()
    }
}

fn only_contained(outcome: &Outcome) -> bool {
    outcome.failures.is_empty()
        && !outcome.diagnostics.is_empty()
        && outcome
            .diagnostics
            .iter()
            .all(|d| d.reason == ConflictReason::Contained)
}

fn run_pass(pass: &dyn Pass, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
    let started = Instant::now();
    let result = pass.run(doc, ctx);
    debug!(
        pass = pass.name(),
        path = %doc.label(),
        edits = result.as_ref().map(Vec::len).unwrap_or(0),
        elapsed_us = started.elapsed().as_micros() as u64,
        "pass finished"
    );
    result
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.names())
            .field("parallel", &self.parallel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{ConflictReason, Range};
    use crate::error::MigrateError;
    use crate::lang::TypeScript;

    struct Fixed {
        name: &'static str,
        edits: Vec<(usize, usize, &'static str)>,
    }

    impl Pass for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, _doc: &Document, _ctx: &PassContext) -> Result<Vec<Edit>> {
            Ok(self
                .edits
                .iter()
                .map(|(s, e, t)| Ok(Edit::replace(Range::new(*s, *e)?, *t)))
                .collect::<Result<_>>()?)
        }
    }

    struct Failing;

    impl Pass for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(&self, _doc: &Document, _ctx: &PassContext) -> Result<Vec<Edit>> {
            Err(MigrateError::PassFailed {
                pass: "failing".to_string(),
                message: "boom".to_string(),
            })
        }
    }

    fn fixed(name: &'static str, edits: Vec<(usize, usize, &'static str)>) -> Fixed {
        Fixed { name, edits }
    }

    #[test]
    fn test_no_edits_is_unchanged() {
        let outcome = Pipeline::new()
            .pass(fixed("noop", vec![]))
            .run_source("let a = 1;", &TypeScript)
            .unwrap();

        assert_eq!(outcome.status, Status::Unchanged);
        assert_eq!(outcome.output, "let a = 1;");
        assert_eq!(outcome.applied, 0);
    }

    #[test]
    fn test_independent_passes_compose() {
        // Both passes address the original offsets.
        let outcome = Pipeline::new()
            .pass(fixed("first", vec![(4, 5, "alpha")]))
            .pass(fixed("second", vec![(8, 9, "2")]))
            .run_source("let a = 1;", &TypeScript)
            .unwrap();

        assert_eq!(outcome.output, "let alpha = 2;");
        assert_eq!(outcome.status, Status::Transformed);
        assert_eq!(outcome.applied, 2);
    }

    #[test]
    fn test_conflict_is_partial_with_origin() {
        let outcome = Pipeline::new()
            .pass(fixed("wide", vec![(0, 10, "A")]))
            .pass(fixed("narrow", vec![(5, 15, "B")]))
            .run_source("0123456789abcdef", &TypeScript)
            .unwrap();

        assert_eq!(outcome.status, Status::PartiallyTransformed);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].reason, ConflictReason::Overlap);
        assert_eq!(outcome.diagnostics[0].origin.as_deref(), Some("narrow"));
        assert_eq!(outcome.output, "Aabcdef");
    }

    #[test]
    fn test_failing_pass_does_not_abort() {
        let outcome = Pipeline::new()
            .pass(Failing)
            .pass(fixed("ok", vec![(4, 5, "b")]))
            .run_source("let a = 1;", &TypeScript)
            .unwrap();

        assert_eq!(outcome.output, "let b = 1;");
        assert_eq!(outcome.status, Status::PartiallyTransformed);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].pass, "failing");
    }

    #[test]
    fn test_out_of_bounds_aborts_document() {
        let result = Pipeline::new()
            .pass(fixed("ok", vec![(0, 1, "x")]))
            .pass(fixed("broken", vec![(5, 500, "y")]))
            .run_source("let a = 1;", &TypeScript);

        let err = result.unwrap_err();
        assert!(err.is_fatal_for_document());
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let build = |parallel| {
            Pipeline::new()
                .parallel(parallel)
                .pass(fixed("a", vec![(0, 3, "const"), (4, 5, "b")]))
                .pass(fixed("b", vec![(0, 3, "var")]))
                .pass(fixed("c", vec![(8, 9, "2"), (4, 5, "c")]))
        };

        let parallel = build(true).run_source("let a = 1;", &TypeScript).unwrap();
        let sequential = build(false).run_source("let a = 1;", &TypeScript).unwrap();

        assert_eq!(parallel.output, sequential.output);
        assert_eq!(parallel.diagnostics, sequential.diagnostics);
        assert_eq!(parallel.output, "const b = 2;");
    }

    #[test]
    fn test_run_batch_preserves_order() {
        let pipeline = Pipeline::new().pass(fixed("first-byte", vec![(0, 1, "#")]));
        let docs: Vec<Document> = ["a;", "b;", "c;"]
            .iter()
            .map(|s| Document::parse(*s, &TypeScript).unwrap())
            .collect();

        let outputs: Vec<String> = pipeline
            .run_batch(&docs)
            .into_iter()
            .map(|r| r.unwrap().output)
            .collect();

        assert_eq!(outputs, vec!["#;", "#;", "#;"]);
    }

    #[test]
    fn test_names() {
        let pipeline = Pipeline::new().pass(Failing).pass(fixed("x", vec![]));
        assert_eq!(pipeline.names(), vec!["failing", "x"]);
        assert_eq!(pipeline.len(), 2);
    }
}
