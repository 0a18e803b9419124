//! Read-only facts about a document, computed once before any pass runs.

use crate::document::Document;
use crate::edit::Range;
use serde::Serialize;
use tree_sitter::Node;

/// One `{ imported as local }` specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedImport {
    pub imported: String,
    pub local: String,
    /// Marked `type` individually, as in `import { type A } from "m"`.
    pub type_only: bool,
}

impl NamedImport {
    /// Returns true for `{ a as b }` rather than `{ a }`.
    pub fn is_aliased(&self) -> bool {
        self.imported != self.local
    }
}

/// A single import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEntry {
    /// Module specifier without quotes.
    pub source: String,
    /// Range of the whole statement.
    pub range: Range,
    /// Range of the module specifier string, quotes included.
    pub source_range: Range,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<NamedImport>,
    /// `import type ...`
    pub type_only: bool,
}

impl ImportEntry {
    /// Returns true for a side-effect import such as `import "./polyfill"`.
    pub fn is_bare(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

/// Every import statement of a document, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportIndex {
    entries: Vec<ImportEntry>,
}

impl ImportIndex {
    /// Indexes the top-level import statements of a document.
    pub fn from_document(doc: &Document) -> Self {
        let root = doc.root();
        let mut cursor = root.walk();
        let entries = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() == "import_statement")
            .filter_map(|n| read_import(doc, &n))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the statements importing from `module`.
    pub fn imports_from<'a>(&'a self, module: &str) -> impl Iterator<Item = &'a ImportEntry> {
        self.entries.iter().filter(move |e| e.source == module)
    }

    pub fn has_import(&self, module: &str) -> bool {
        self.imports_from(module).next().is_some()
    }

    /// Returns the local binding for `imported` from `module`, if any.
    pub fn local_name(&self, module: &str, imported: &str) -> Option<&str> {
        self.imports_from(module)
            .flat_map(|e| e.named.iter())
            .find(|n| n.imported == imported)
            .map(|n| n.local.as_str())
    }

    pub fn default_binding(&self, module: &str) -> Option<&str> {
        self.imports_from(module).find_map(|e| e.default.as_deref())
    }

    pub fn namespace_binding(&self, module: &str) -> Option<&str> {
        self.imports_from(module).find_map(|e| e.namespace.as_deref())
    }
}

fn read_import(doc: &Document, node: &Node<'_>) -> Option<ImportEntry> {
    let source_node = node.child_by_field_name("source")?;
    let source = doc
        .node_text(&source_node)
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    let mut entry = ImportEntry {
        source,
        range: Range::of_node(node),
        source_range: Range::of_node(&source_node),
        default: None,
        namespace: None,
        named: Vec::new(),
        type_only: false,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type" if !child.is_named() => entry.type_only = true,
            "import_clause" => read_clause(doc, &child, &mut entry),
            _ => {}
        }
    }

    Some(entry)
}

fn read_clause(doc: &Document, clause: &Node<'_>, entry: &mut ImportEntry) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => entry.default = Some(doc.node_text(&child).to_string()),
            "namespace_import" => {
                let mut inner = child.walk();
                entry.namespace = child
                    .named_children(&mut inner)
                    .find(|n| n.kind() == "identifier")
                    .map(|n| doc.node_text(&n).to_string());
            }
            "named_imports" => {
                let mut inner = child.walk();
                for specifier in child
                    .named_children(&mut inner)
                    .filter(|n| n.kind() == "import_specifier")
                {
                    if let Some(named) = read_specifier(doc, &specifier) {
                        entry.named.push(named);
                    }
                }
            }
            _ => {}
        }
    }
}

fn read_specifier(doc: &Document, specifier: &Node<'_>) -> Option<NamedImport> {
    let name = specifier.child_by_field_name("name")?;
    let imported = doc.node_text(&name).to_string();
    let local = specifier
        .child_by_field_name("alias")
        .map(|alias| doc.node_text(&alias).to_string())
        .unwrap_or_else(|| imported.clone());

    let mut cursor = specifier.walk();
    let type_only = specifier
        .children(&mut cursor)
        .any(|c| !c.is_named() && c.kind() == "type");

    Some(NamedImport {
        imported,
        local,
        type_only,
    })
}

/// Everything a pass may know about the document besides its tree.
///
/// Built once per document and shared read-only by all passes, so passes can
/// run in any order or in parallel.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    imports: ImportIndex,
}

impl PassContext {
    pub fn new(imports: ImportIndex) -> Self {
        Self { imports }
    }

    pub fn from_document(doc: &Document) -> Self {
        Self::new(ImportIndex::from_document(doc))
    }

    pub fn imports(&self) -> &ImportIndex {
        &self.imports
    }
}
