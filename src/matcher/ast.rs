//! Structural matching with tree-sitter queries and named captures.

use crate::edit::Range;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

/// A tree-sitter query plus the capture that names the matched node.
///
/// Query syntax follows tree-sitter's S-expression format, including the
/// `#eq?` and `#match?` text predicates:
/// - `(method_definition name: (property_identifier) @name) @method`
/// - `((identifier) @id (#eq? @id "ZodError"))`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    query: String,
    root: String,
}

impl Pattern {
    /// Creates a pattern whose matches are anchored on the `root` capture.
    pub fn new(query: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            root: root.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Returns the name of the capture denoting the matched node.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub(crate) fn execute(&self, query: &Query, node: Node<'_>, source: &str) -> Vec<QueryMatch> {
        let mut cursor = QueryCursor::new();
        let source_bytes = source.as_bytes();
        let names = query.capture_names();
        let mut matches = Vec::new();

        let mut query_matches = cursor.matches(query, node, source_bytes);
        while let Some(query_match) = query_matches.next() {
            let captures: Vec<Capture> = query_match
                .captures
                .iter()
                .map(|c| Capture::from_node(names[c.index as usize], &c.node, source))
                .collect();

            let Some(root) = captures.iter().position(|c| c.name == self.root) else {
                continue;
            };

            matches.push(QueryMatch { root, captures });
        }

        matches
    }
}

/// One captured node of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub text: String,
    pub kind: String,
    pub range: Range,
    /// Kind of the node's parent, if it has one.
    pub parent_kind: Option<String>,
}

impl Capture {
    fn from_node(name: &str, node: &Node<'_>, source: &str) -> Self {
        Self {
            name: name.to_string(),
            text: node.utf8_text(source.as_bytes()).unwrap_or("").to_string(),
            kind: node.kind().to_string(),
            range: Range::of_node(node),
            parent_kind: node.parent().map(|p| p.kind().to_string()),
        }
    }
}

/// A single match of a [`Pattern`], detached from the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch {
    root: usize,
    captures: Vec<Capture>,
}

impl QueryMatch {
    /// Returns the capture the pattern is anchored on.
    pub fn node(&self) -> &Capture {
        &self.captures[self.root]
    }

    /// Returns the byte range of the matched node.
    pub fn range(&self) -> Range {
        self.node().range
    }

    /// Returns the original text of the matched node.
    pub fn text(&self) -> &str {
        &self.node().text
    }

    /// Returns the first capture with the given name.
    pub fn capture(&self, name: &str) -> Option<&Capture> {
        self.captures.iter().find(|c| c.name == name)
    }

    /// Returns every capture with the given name, for quantified captures.
    pub fn captures<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Capture> {
        self.captures.iter().filter(move |c| c.name == name)
    }

    /// Returns the text of a named capture.
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.capture(name).map(|c| c.text.as_str())
    }
}
