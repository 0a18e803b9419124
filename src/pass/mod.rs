//! Passes: independent producers of edits against one document.
//!
//! A pass reads the original [`Document`] and the shared [`PassContext`] and
//! returns the edits it wants. It never sees another pass's output, so passes
//! can run in any order, or all at once.

mod context;
mod rule;

pub use context::{ImportEntry, ImportIndex, NamedImport, PassContext};
pub use rule::{Capability, Handler, Rule, RuleSet};

use crate::document::Document;
use crate::edit::Edit;
use crate::error::Result;

/// A single migration step.
///
/// Implementations must be pure with respect to the document: the same
/// document and context always yield the same edits. A pass should also be
/// idempotent, producing no edits when run on its own output.
///
/// # Example
///
/// ```rust
/// use migrate_dsl::document::Document;
/// use migrate_dsl::edit::{Edit, Range};
/// use migrate_dsl::error::Result;
/// use migrate_dsl::pass::{Pass, PassContext};
///
/// struct UseStrict;
///
/// impl Pass for UseStrict {
///     fn name(&self) -> &str {
///         "use-strict"
///     }
///
///     fn run(&self, doc: &Document, _ctx: &PassContext) -> Result<Vec<Edit>> {
///         if doc.source().starts_with("\"use strict\"") {
///             return Ok(Vec::new());
///         }
///         Ok(vec![Edit::insert(0, "\"use strict\";\n")])
///     }
/// }
/// ```
pub trait Pass: Send + Sync {
    /// Unique name, recorded on every edit the pass produces.
    fn name(&self) -> &str;

    /// Computes this pass's edits against the original document.
    fn run(&self, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>>;
}

impl<P: Pass + ?Sized> Pass for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
        (**self).run(doc, ctx)
    }
}
