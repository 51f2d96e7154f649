#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-sitter parser wrapper for Python source code.

use std::fmt::Formatter;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator, Tree};

use super::error::AnalysisError;

/// A struct that wraps a tree-sitter parser object and source code.
#[derive(Clone)]
pub struct Parser {
    /// The source code being parsed.
    code:  String,
    /// The parse tree.
    _tree: Option<Tree>,
    /// The tree-sitter Python grammar language.
    lang:  tree_sitter::Language,
}

/// Returns the compiled tree-sitter Python language.
fn python_language() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("lines", &self.line_count())
            .finish()
    }
}

impl Parser {
    /// Returns a new parser object.
    ///
    /// * `source_code`: the source code to be parsed
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language = python_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load Python grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing Python code"))?;

        Ok(Self {
            code:  source_code,
            _tree: Some(tree),
            lang:  language,
        })
    }

    /// Parses `source_code` and rejects it if the tree holds any error or
    /// missing node.
    ///
    /// * `origin`: name of the input, used in the error
    /// * `source_code`: the source code to be parsed
    pub fn parse_checked(origin: &str, source_code: String) -> Result<Self, AnalysisError> {
        let parser = Parser::new(source_code)?;
        parser.check_syntax(origin)?;
        Ok(parser)
    }

    /// A getter for parser's source code.
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the parse tree's root node.
    pub fn root_node(&self) -> Result<Node<'_>> {
        self._tree
            .as_ref()
            .map(Tree::root_node)
            .context("Treesitter could not parse code")
    }

    /// Fails with the position of the first error or missing node, if any.
    ///
    /// * `origin`: name of the input, used in the error
    pub fn check_syntax(&self, origin: &str) -> Result<(), AnalysisError> {
        let root = self.root_node()?;
        if !root.has_error() {
            return Ok(());
        }

        let culprit = first_error_node(root).unwrap_or(root);
        let position = culprit.start_position();
        let snippet = self
            .code
            .lines()
            .nth(position.row)
            .unwrap_or_default()
            .to_string();

        Err(AnalysisError::Syntax {
            origin: origin.to_string(),
            line: position.row + 1,
            column: position.column + 1,
            snippet,
        })
    }

    /// Applies a tree-sitter query and returns every node bound to
    /// `capture_name`, in document order.
    ///
    /// * `q`: the tree-sitter query to be applied
    /// * `capture_name`: the capture to collect
    pub fn query_nodes(&self, q: &str, capture_name: &str) -> Result<Vec<Node<'_>>> {
        let tree = self
            ._tree
            .as_ref()
            .context("Treesitter could not parse code")?;

        let query = Query::new(&self.lang, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let capture_index = query
            .capture_index_for_name(capture_name)
            .ok_or_else(|| anyhow!("Capture name {capture_name} not present in query"))?;

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), self.code.as_bytes());
        let mut results = Vec::new();

        while let Some(m) = matches.next() {
            for capture in m.captures.iter().filter(|c| c.index == capture_index) {
                results.push(capture.node);
            }
        }

        results.sort_by_key(Node::start_byte);
        results.dedup_by_key(|n| n.id());
        Ok(results)
    }

    /// Returns the total number of lines in the source code.
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }
}

/// Depth-first search for the first `ERROR` or missing node under `node`.
fn first_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_module() {
        let parser = Parser::parse_checked("ok.py", "def f(x):\n    return x\n".to_string());
        assert!(parser.is_ok());
    }

    #[test]
    fn reports_first_error_position() {
        let err = Parser::parse_checked("bad.py", "x = 1\ndef f(:\n    pass\n".to_string())
            .expect_err("should reject");
        match err {
            AnalysisError::Syntax { origin, line, .. } => {
                assert_eq!(origin, "bad.py");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn query_nodes_returns_document_order() {
        let parser = Parser::new("import os\nimport sys\n".to_string()).expect("parse");
        let nodes = parser
            .query_nodes("(import_statement) @import", "import")
            .expect("query");
        let texts: Vec<_> = nodes
            .iter()
            .map(|n| n.utf8_text(parser.code().as_bytes()).expect("utf8"))
            .collect();
        assert_eq!(texts, vec!["import os", "import sys"]);
    }
}
