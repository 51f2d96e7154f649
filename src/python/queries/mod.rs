//! Tree-sitter query strings used by the Python analyzers.

/// Tree-sitter query that returns import statements.
/// * `import`: the whole `import` / `from ... import` statement
pub const IMPORT_QUERY: &str = include_str!("import.scm");
