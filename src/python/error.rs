//! Fatal analysis failures.

use thiserror::Error;

/// Errors that abort analysis of an input.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input is not syntactically valid Python.
    #[error("Syntax error in {origin} at line {line}, column {column}:\n{snippet}")]
    Syntax {
        /// Name of the input that failed to parse.
        origin:  String,
        /// 1-based line of the first error node.
        line:    usize,
        /// 1-based column of the first error node.
        column:  usize,
        /// The offending source line.
        snippet: String,
    },

    /// Two top-level declarations share a name.
    #[error("Duplicate declaration `{name}` in {origin} (lines {first_line} and {second_line})")]
    DuplicateDeclaration {
        /// Name of the input holding the declarations.
        origin:      String,
        /// The repeated name.
        name:        String,
        /// Line of the first definition.
        first_line:  usize,
        /// Line of the redefinition.
        second_line: usize,
    },

    /// The Python grammar could not be loaded or run.
    #[error("Grammar error: {0}")]
    Grammar(#[from] anyhow::Error),
}

impl AnalysisError {
    /// Returns true if this is a syntax error.
    pub fn is_syntax(&self) -> bool {
        matches!(self, AnalysisError::Syntax { .. })
    }
}
