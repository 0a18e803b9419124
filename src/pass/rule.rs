//! Declarative rules: a structural pattern paired with a handler.

use super::{Pass, PassContext};
use crate::document::Document;
use crate::edit::Edit;
use crate::error::Result;
use crate::matcher::{Pattern, QueryMatch};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// What a rule looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub pattern: Pattern,
}

impl Capability {
    pub fn new(pattern: Pattern) -> Self {
        Self { pattern }
    }
}

type ReplaceFn = dyn Fn(&QueryMatch, &PassContext) -> Option<String> + Send + Sync;
type EditsFn = dyn Fn(&QueryMatch, &PassContext) -> Vec<Edit> + Send + Sync;

/// What a rule does with each match.
#[derive(Clone)]
pub enum Handler {
    /// Replaces the matched node with the returned text; `None` skips it.
    Replace(Arc<ReplaceFn>),
    /// Emits arbitrary edits for the match.
    Edits(Arc<EditsFn>),
}

impl Handler {
    pub fn replace<F>(f: F) -> Self
    where
        F: Fn(&QueryMatch, &PassContext) -> Option<String> + Send + Sync + 'static,
    {
        Handler::Replace(Arc::new(f))
    }

    pub fn edits<F>(f: F) -> Self
    where
        F: Fn(&QueryMatch, &PassContext) -> Vec<Edit> + Send + Sync + 'static,
    {
        Handler::Edits(Arc::new(f))
    }

    fn apply(&self, m: &QueryMatch, ctx: &PassContext) -> Vec<Edit> {
        match self {
            Handler::Replace(f) => f(m, ctx)
                .filter(|text| text != m.text())
                .map(|text| vec![Edit::replace(m.range(), text)])
                .unwrap_or_default(),
            Handler::Edits(f) => f(m, ctx),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Replace(_) => f.write_str("Handler::Replace"),
            Handler::Edits(_) => f.write_str("Handler::Edits"),
        }
    }
}

/// A named pattern and handler pair.
///
/// ```rust
/// use migrate_dsl::matcher::Pattern;
/// use migrate_dsl::pass::{Handler, Rule};
///
/// let rule = Rule::new(
///     "unsafe-will-mount",
///     Pattern::new(
///         r#"(method_definition name: (property_identifier) @name (#eq? @name "componentWillMount"))"#,
///         "name",
///     ),
///     Handler::replace(|m, _| Some(format!("UNSAFE_{}", m.text()))),
/// );
/// assert_eq!(rule.name(), "unsafe-will-mount");
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    capability: Capability,
    handler: Handler,
}

impl Rule {
    pub fn new(name: impl Into<String>, pattern: Pattern, handler: Handler) -> Self {
        Self {
            name: name.into(),
            capability: Capability::new(pattern),
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Runs the rule over a document.
    pub fn apply(&self, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
        let matches = doc.find_all(&self.capability.pattern)?;
        let edits: Vec<Edit> = matches
            .iter()
            .flat_map(|m| self.handler.apply(m, ctx))
            .collect();

        trace!(
            rule = %self.name,
            matches = matches.len(),
            edits = edits.len(),
            "rule applied"
        );
        Ok(edits)
    }
}

type GuardFn = dyn Fn(&PassContext) -> bool + Send + Sync;

/// A pass made of rules, optionally gated on the document's context.
pub struct RuleSet {
    name: String,
    rules: Vec<Rule>,
    guard: Option<Arc<GuardFn>>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
            guard: None,
        }
    }

    /// Adds a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Runs the rules only for documents whose context satisfies `guard`.
    pub fn when<F>(mut self, guard: F) -> Self
    where
        F: Fn(&PassContext) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Pass for RuleSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
        if let Some(guard) = &self.guard
            && !guard(ctx)
        {
            return Ok(Vec::new());
        }

        let mut edits = Vec::new();
        for rule in &self.rules {
            edits.extend(rule.apply(doc, ctx)?);
        }
        Ok(edits)
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::TypeScript;

    fn rename_rule(from: &'static str, to: &'static str) -> Rule {
        Rule::new(
            format!("rename-{from}"),
            Pattern::new(
                format!(r#"((identifier) @id (#eq? @id "{from}"))"#),
                "id",
            ),
            Handler::replace(move |_, _| Some(to.to_string())),
        )
    }

    #[test]
    fn test_replace_handler_targets_matched_node() {
        let source = "const oldName = 1; use(oldName);";
        let doc = Document::parse(source, &TypeScript).unwrap();
        let ctx = PassContext::from_document(&doc);

        let edits = rename_rule("oldName", "newName").apply(&doc, &ctx).unwrap();

        assert_eq!(edits.len(), 2);
        for edit in &edits {
            assert_eq!(edit.range().slice(source), Some("oldName"));
            assert_eq!(edit.replacement(), "newName");
        }
    }

    #[test]
    fn test_replace_handler_skips_unchanged_text() {
        let doc = Document::parse("let a = 1;", &TypeScript).unwrap();
        let ctx = PassContext::from_document(&doc);

        let edits = rename_rule("a", "a").apply(&doc, &ctx).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_edits_handler() {
        let doc = Document::parse("f(); g();", &TypeScript).unwrap();
        let ctx = PassContext::from_document(&doc);
        let rule = Rule::new(
            "comment-calls",
            Pattern::new("(call_expression) @call", "call"),
            Handler::edits(|m, _| vec![Edit::insert(m.range().start(), "/* call */ ")]),
        );

        let edits = rule.apply(&doc, &ctx).unwrap();
        assert_eq!(edits.len(), 2);
        assert!(edits.iter().all(|e| e.range().is_empty()));
    }

    #[test]
    fn test_rule_set_guard() {
        let set = RuleSet::new("zod-only")
            .rule(rename_rule("a", "b"))
            .when(|ctx| ctx.imports().has_import("zod"));

        let plain = Document::parse("let a = 1;", &TypeScript).unwrap();
        let ctx = PassContext::from_document(&plain);
        assert!(set.run(&plain, &ctx).unwrap().is_empty());

        let zod = Document::parse("import { z } from \"zod\";\nlet a = 1;", &TypeScript).unwrap();
        let ctx = PassContext::from_document(&zod);
        assert_eq!(set.run(&zod, &ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_bad_pattern_fails_the_pass() {
        let set = RuleSet::new("broken").rule(Rule::new(
            "broken",
            Pattern::new("(no_such_node) @x", "x"),
            Handler::replace(|_, _| None),
        ));
        let doc = Document::parse("let a;", &TypeScript).unwrap();
        let ctx = PassContext::from_document(&doc);

        assert!(set.run(&doc, &ctx).is_err());
    }
}
