//! Python source analysis.
//!
//! Everything that looks inside Python text lives here: the tree-sitter
//! wrapper, the scope pass, the declaration extractor and dependency graph,
//! the unittest extractor and the assertion transformer.

/// Turns unittest statements into judge-ready test statements.
pub mod assertions;
/// Top-level declaration extraction.
pub mod declarations;
/// Fatal analysis errors.
pub mod error;
/// Dependency graph and closure.
pub mod graph;
/// Structural model of expected-value literals.
pub mod literal;
/// Test group to declaration naming convention.
pub mod naming;
/// Tree-sitter wrapper.
pub mod parser;
/// Tree-sitter queries.
pub mod queries;
/// Identifier resolution across Python scopes.
pub mod scope;
/// Test suite extraction.
pub mod unittest;
/// Node walking helpers.
pub mod util;

pub use assertions::{AssertionTransformer, MessageMatch, TestStatement, TransformIssue, transform_snippet};
pub use declarations::{Declaration, DeclarationKind, Import, Module, Parameter, ParameterKind};
pub use error::AnalysisError;
pub use graph::DependencyGraph;
pub use literal::Literal;
pub use naming::{BindingError, bind_group, target_name};
pub use parser::Parser;
pub use scope::{Reference, Resolution, ScopeResolver};
pub use unittest::{SuiteNote, TestCase, TestGroup, TestSuite};
