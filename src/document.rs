//! A parsed source document: the immutable text every pass reads.

use crate::edit::Range;
use crate::error::{MigrateError, Result};
use crate::lang::{Language, LanguageRegistry};
use crate::matcher::{Pattern, QueryMatch};
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

/// Original source text together with its syntax tree.
///
/// Neither is ever modified. Passes read a shared `&Document` and describe
/// their changes as edits against [`Document::source`].
pub struct Document {
    path: Option<PathBuf>,
    source: String,
    tree: Tree,
    grammar: tree_sitter::Language,
    language: &'static str,
}

impl Document {
    /// Parses `source` with the given language.
    pub fn parse(source: impl Into<String>, lang: &dyn Language) -> Result<Self> {
        let source = source.into();
        let tree = lang.parse(&source)?;
        Ok(Self {
            path: None,
            source,
            tree,
            grammar: lang.grammar(),
            language: lang.name(),
        })
    }

    /// Reads and parses a file, detecting its language from the extension.
    pub fn from_file(path: impl AsRef<Path>, registry: &LanguageRegistry) -> Result<Self> {
        let path = path.as_ref();
        let lang = registry.detect(path).ok_or_else(|| {
            MigrateError::UnsupportedLanguage(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            )
        })?;
        let source = std::fs::read_to_string(path)?;
        Ok(Self::parse(source, lang)?.with_path(path))
    }

    /// Records the file this document was read from.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Returns the name of the language the document was parsed as.
    pub fn language(&self) -> &'static str {
        self.language
    }

    /// Returns true if the tree contains syntax errors.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Returns the original text covered by `range`, if in bounds.
    pub fn text_at(&self, range: Range) -> Option<&str> {
        range.slice(&self.source)
    }

    /// Returns the original text of a node.
    pub fn node_text(&self, node: &Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Runs a pattern over the whole tree.
    pub fn find_all(&self, pattern: &Pattern) -> Result<Vec<QueryMatch>> {
        let query = tree_sitter::Query::new(&self.grammar, pattern.query())?;
        Ok(pattern.execute(&query, self.root(), &self.source))
    }

    /// Returns a label for log messages.
    pub fn label(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => format!("<{}>", self.language),
        }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("path", &self.path)
            .field("language", &self.language)
            .field("len", &self.source.len())
            .finish()
    }
}
