//! Zod 3 to Zod 4.
//!
//! Rewrites imports to the `zod/v4` entry points, renames the utility types
//! that moved into `zod/v4/core`, ports a handful of changed schema methods,
//! folds `.or()` chains into `z.union` and puts
//! `nullable`/`optional`/`default`/`catch` into the order Zod 4 requires.

use super::{Migration, script_files};
use crate::chain::{self, ChainError, ParsedChain, root_identifier, split_args};
use crate::document::Document;
use crate::edit::{Edit, Range};
use crate::error::Result;
use crate::matcher::{Capture, FileMatcher, Pattern, QueryMatch};
use crate::pass::{Handler, ImportEntry, NamedImport, Pass, PassContext, Rule, RuleSet};
use crate::pipeline::Pipeline;
use tracing::debug;
use tree_sitter::Node;

/// Module specifiers a `z` binding may come from.
pub const ZOD_MODULES: &[&str] = &["zod", "zod/v4"];

const LEGACY_MODULE: &str = "zod";
const CORE_MODULE: &str = "zod/v4";
const UTILITY_MODULE: &str = "zod/v4/core";

/// Zod 3 utility types and their Zod 4 core names.
const UTILITY_TYPES: &[(&str, &str)] = &[
    ("ZodError", "$ZodError"),
    ("ZodIssue", "$ZodIssue"),
    ("ZodType", "$ZodType"),
    ("ZodIssueBase", "$ZodIssueBase"),
    ("ZodInvalidTypeIssue", "$ZodIssueInvalidType"),
    ("ZodInvalidEnumValueIssue", "$ZodIssueInvalidValue"),
    ("ZodTooSmallIssue", "$ZodIssueTooSmall"),
    ("ZodTooBigIssue", "$ZodIssueTooBig"),
    ("ParseStatus", "$ParseStatus"),
    ("ParseContext", "$ParseContext"),
    ("ZodEffects", "$ZodPipe"),
];

fn utility_type(name: &str) -> Option<&'static str> {
    UTILITY_TYPES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
}

/// Returns the local name the `z` namespace is bound to, if Zod is imported.
pub fn zod_alias(ctx: &PassContext) -> Option<&str> {
    let imports = ctx.imports();
    ZOD_MODULES.iter().find_map(|module| {
        imports
            .local_name(module, "z")
            .or_else(|| imports.default_binding(module))
            .or_else(|| imports.namespace_binding(module))
    })
}

fn rooted_at_zod(text: &str, ctx: &PassContext) -> bool {
    match (root_identifier(text), zod_alias(ctx)) {
        (Some(root), Some(alias)) => root == alias,
        _ => false,
    }
}

/// Range from the start of `from` to the end of `to`.
fn span(from: &Capture, to: Range) -> Option<Range> {
    Range::new(from.range.start(), to.end()).ok()
}

/// The Zod 3 to Zod 4 migration.
pub struct ZodV4Migration;

impl Migration for ZodV4Migration {
    fn name(&self) -> &str {
        "zod-v4"
    }

    fn description(&self) -> &str {
        "Migrate Zod 3 schemas, imports and error handling to Zod 4"
    }

    fn files(&self) -> FileMatcher {
        script_files().contains_pattern(r#"["']zod(/v4)?["']"#)
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new()
            .pass(ZodImports)
            .pass(ChainOrdering)
            .pass(OrToUnion)
            .pass(utility_types())
            .pass(schema_methods())
    }
}

pub fn zod_v4() -> ZodV4Migration {
    ZodV4Migration
}

/// Splits `from "zod"` imports between `zod/v4` and `zod/v4/core`.
///
/// `z` itself comes from `zod/v4`; every other named import moves to
/// `zod/v4/core`, renamed when its Zod 4 name differs.
pub struct ZodImports;

impl ZodImports {
    fn rewrite(entry: &ImportEntry) -> Option<String> {
        if entry.is_bare() {
            return None;
        }

        let mut core = Vec::new();
        let mut utility = Vec::new();

        if let Some(default) = &entry.default {
            core.push(if default == "z" {
                "z".to_string()
            } else {
                format!("z as {default}")
            });
        }

        for named in &entry.named {
            if named.imported == "z" {
                core.push(specifier("z", named));
            } else {
                let name = utility_type(&named.imported).unwrap_or(named.imported.as_str());
                utility.push(specifier(name, named));
            }
        }

        let keyword = if entry.type_only { "import type" } else { "import" };
        let mut statements = Vec::new();

        if let Some(namespace) = &entry.namespace {
            statements.push(format!("{keyword} * as {namespace} from \"{CORE_MODULE}\";"));
        }
        if !core.is_empty() {
            statements.push(format!(
                "{keyword} {{ {} }} from \"{CORE_MODULE}\";",
                core.join(", ")
            ));
        }
        if !utility.is_empty() {
            statements.push(format!(
                "{keyword} {{ {} }} from \"{UTILITY_MODULE}\";",
                utility.join(", ")
            ));
        }

        Some(statements.join("\n"))
    }
}

fn specifier(name: &str, named: &NamedImport) -> String {
    let prefix = if named.type_only { "type " } else { "" };
    if named.is_aliased() {
        format!("{prefix}{name} as {}", named.local)
    } else {
        format!("{prefix}{name}")
    }
}

impl Pass for ZodImports {
    fn name(&self) -> &str {
        "zod-imports"
    }

    fn run(&self, _doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
        Ok(ctx
            .imports()
            .imports_from(LEGACY_MODULE)
            .filter_map(|entry| Some(Edit::replace(entry.range, Self::rewrite(entry)?)))
            .collect())
    }
}

/// Collects every outermost call expression whose text starts with `alias`.
///
/// A chain nested in another chain's arguments is collected on its own.
fn zod_chains<'t>(doc: &Document, node: Node<'t>, alias: &str, chains: &mut Vec<Node<'t>>) {
    if node.kind() == "call_expression"
        && !is_chain_link(&node)
        && root_identifier(doc.node_text(&node)) == Some(alias)
    {
        chains.push(node);
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        zod_chains(doc, child, alias, chains);
    }
}

/// Returns true if `node` is the receiver of a further `.method(...)` call.
fn is_chain_link(node: &Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.kind() != "member_expression"
        || parent.child_by_field_name("object").map(|o| o.id()) != Some(node.id())
    {
        return false;
    }
    parent
        .parent()
        .filter(|g| g.kind() == "call_expression")
        .and_then(|g| g.child_by_field_name("function"))
        .map(|f| f.id())
        == Some(parent.id())
}

/// Returns true if one of the calls along the receiver spine of `node` ends
/// at byte `end`.
fn ends_at_chain_link(node: Node<'_>, end: usize) -> bool {
    let mut current = Some(node);
    while let Some(call) = current.filter(|n| n.kind() == "call_expression") {
        if call.end_byte() == end {
            return true;
        }
        current = call
            .child_by_field_name("function")
            .filter(|f| f.kind() == "member_expression")
            .and_then(|f| f.child_by_field_name("object"));
    }
    false
}

/// Replaces the first `consumed` bytes of the chain at `node`.
///
/// Returns `None` when the text scan and the syntax tree disagree on where
/// the chain ends.
fn chain_edit(node: Node<'_>, consumed: usize, text: String) -> Result<Option<Edit>> {
    let start = node.start_byte();
    let end = start + consumed;
    if !ends_at_chain_link(node, end) {
        debug!(offset = start, end, "chain scan disagrees with the syntax tree, skipping");
        return Ok(None);
    }
    Ok(Some(Edit::replace(Range::new(start, end)?, text)))
}

/// Normalizes modifier order on every call chain rooted at the Zod namespace.
pub struct ChainOrdering;

impl Pass for ChainOrdering {
    fn name(&self) -> &str {
        "zod-chain-ordering"
    }

    fn run(&self, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
        let Some(alias) = zod_alias(ctx) else {
            return Ok(Vec::new());
        };
        let mut chains = Vec::new();
        zod_chains(doc, doc.root(), alias, &mut chains);

        let mut edits = Vec::new();
        for node in chains {
            match chain::rewrite_chain(doc.node_text(&node)) {
                Ok(Some(rewrite)) => {
                    edits.extend(chain_edit(node, rewrite.consumed, rewrite.text)?);
                }
                Ok(None) | Err(ChainError::NoMatch) => {}
                Err(err) => {
                    debug!(offset = node.start_byte(), error = %err, "skipping chain");
                }
            }
        }
        Ok(edits)
    }
}

/// Folds `a.or(b).or(c)` into `z.union([a, b, c])`.
///
/// Needs at least two `.or(...)` links, next to each other, each with a single
/// argument. Calls after the last `.or` are kept on the union.
pub struct OrToUnion;

impl OrToUnion {
    fn rewrite(alias: &str, chain: &ParsedChain) -> Option<String> {
        let first = chain.calls.iter().position(|c| c.method == "or")?;
        let count = chain.calls[first..]
            .iter()
            .take_while(|c| c.method == "or")
            .count();
        let rest = &chain.calls[first + count..];
        if count < 2 || rest.iter().any(|c| c.method == "or") {
            return None;
        }

        let links = &chain.calls[first..first + count];
        // A comment in front of an `.or` has no place in the union.
        if links.iter().any(|c| !c.leading.trim().is_empty()) {
            return None;
        }

        let mut members = vec![chain::render(&chain.base, &chain.calls[..first])
            .trim()
            .to_string()];
        for link in links {
            match split_args(&link.args)?.as_slice() {
                [member] => members.push(member.to_string()),
                _ => return None,
            }
        }

        Some(format!(
            "{alias}.union([{}]){}",
            members.join(", "),
            chain::render("", rest)
        ))
    }
}

impl Pass for OrToUnion {
    fn name(&self) -> &str {
        "zod-or-to-union"
    }

    fn run(&self, doc: &Document, ctx: &PassContext) -> Result<Vec<Edit>> {
        let Some(alias) = zod_alias(ctx) else {
            return Ok(Vec::new());
        };
        let mut chains = Vec::new();
        zod_chains(doc, doc.root(), alias, &mut chains);

        let mut edits = Vec::new();
        for node in chains {
            let parsed = match chain::parse_chain(doc.node_text(&node)) {
                Ok(parsed) => parsed,
                Err(ChainError::NoMatch) => continue,
                Err(err) => {
                    debug!(offset = node.start_byte(), error = %err, "skipping chain");
                    continue;
                }
            };
            if let Some(union) = Self::rewrite(alias, &parsed) {
                edits.extend(chain_edit(node, parsed.consumed, union)?);
            }
        }
        Ok(edits)
    }
}

/// Renames references to utility types imported from `zod`.
fn utility_types() -> RuleSet {
    let names: Vec<&str> = UTILITY_TYPES.iter().map(|(from, _)| *from).collect();
    let query = format!(
        r#"([(identifier) (type_identifier)] @name (#match? @name "^({})$"))"#,
        names.join("|")
    );

    RuleSet::new("zod-utility-types")
        .rule(Rule::new(
            "utility-type-reference",
            Pattern::new(query, "name"),
            Handler::replace(|m, ctx| {
                let parent = m.node().parent_kind.as_deref();
                // Specifiers are rewritten with their import statement, and
                // `z.ZodType` keeps its namespace-qualified name.
                if matches!(parent, Some("import_specifier" | "nested_type_identifier")) {
                    return None;
                }
                if ctx.imports().local_name(LEGACY_MODULE, m.text()) != Some(m.text()) {
                    return None;
                }
                utility_type(m.text()).map(str::to_string)
            }),
        ))
        .when(|ctx| ctx.imports().has_import(LEGACY_MODULE))
}

fn method_call_query(methods: &str) -> String {
    format!(
        r#"(call_expression
             function: (member_expression
               object: (_) @object
               property: (property_identifier) @method (#match? @method "^({methods})$"))
             arguments: (arguments) @args) @call"#
    )
}

/// Returns the argument texts of a call match, without the parentheses.
fn call_args(m: &QueryMatch) -> Option<Vec<&str>> {
    let args = m.text_of("args")?;
    let inner = args.strip_prefix('(')?.strip_suffix(')')?;
    split_args(inner)
}

fn is_string_literal(text: &str) -> bool {
    text.starts_with(['"', '\'', '`'])
}

fn message_object(arg: &str) -> String {
    if arg.starts_with('{') {
        arg.to_string()
    } else {
        format!("{{ message: {arg} }}")
    }
}

/// Rewrites `method(args)` of a matched call in place, leaving the receiver.
fn rewrite_call_tail(m: &QueryMatch, ctx: &PassContext, tail: String) -> Vec<Edit> {
    let Some(object) = m.text_of("object") else {
        return Vec::new();
    };
    if !rooted_at_zod(object, ctx) {
        return Vec::new();
    }
    m.capture("method")
        .and_then(|method| span(method, m.range()))
        .map(|range| vec![Edit::replace(range, tail)])
        .unwrap_or_default()
}

/// Methods whose Zod 4 spelling differs.
fn schema_methods() -> RuleSet {
    let describe = Rule::new(
        "describe-to-meta",
        Pattern::new(method_call_query("describe"), "call"),
        Handler::edits(|m, ctx| match call_args(m).as_deref() {
            Some([description]) if is_string_literal(description) => {
                rewrite_call_tail(m, ctx, format!("meta({{ description: {description} }})"))
            }
            _ => Vec::new(),
        }),
    );

    let nonempty = Rule::new(
        "nonempty-to-min",
        Pattern::new(method_call_query("nonempty"), "call"),
        Handler::edits(|m, ctx| {
            let tail = match call_args(m).as_deref() {
                Some([]) => "min(1)".to_string(),
                Some([message]) => format!("min(1, {})", message_object(message)),
                _ => return Vec::new(),
            };
            rewrite_call_tail(m, ctx, tail)
        }),
    );

    let messages = Rule::new(
        "string-message-to-object",
        Pattern::new(method_call_query("min|max|length|regex|email"), "call"),
        Handler::edits(|m, ctx| {
            let Some(method) = m.text_of("method") else {
                return Vec::new();
            };
            let tail = match (method, call_args(m).as_deref()) {
                ("email", Some([message])) if is_string_literal(message) => {
                    format!("email({})", message_object(message))
                }
                (_, Some([value, message])) if method != "email" && is_string_literal(message) => {
                    format!("{method}({value}, {})", message_object(message))
                }
                _ => return Vec::new(),
            };
            rewrite_call_tail(m, ctx, tail)
        }),
    );

    let error_accessors = Rule::new(
        "error-accessors",
        Pattern::new(
            r#"(member_expression
                 object: (_) @object
                 property: (property_identifier) @property (#match? @property "^(formErrors|fieldErrors)$")) @member"#,
            "member",
        ),
        Handler::edits(|m, _| {
            let Some(property) = m.capture("property") else {
                return Vec::new();
            };
            let tail = if property.text == "formErrors" {
                "format()"
            } else {
                "flatten()"
            };
            span(property, m.range())
                .map(|range| vec![Edit::replace(range, tail)])
                .unwrap_or_default()
        }),
    );

    RuleSet::new("zod-schema-methods")
        .rules([describe, nonempty, messages, error_accessors])
        .when(|ctx| zod_alias(ctx).is_some())
}
