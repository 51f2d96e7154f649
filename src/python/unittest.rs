#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Extraction of `unittest` test groups from a companion test module.

use serde::Serialize;
use tracing::{debug, warn};
use tree_sitter::Node;

use super::{
    assertions::{AssertionTransformer, TestStatement, TransformIssue},
    declarations::{DeclarationKind, Module},
    error::AnalysisError,
    naming::{BindingError, bind_group},
    parser::Parser,
    util::{docstring, is_string_statement, line_of, named_children, render_detached, statements, text},
};
use crate::constants::{SELF_RECEIVER, SETUP_METHOD, TEST_CASE_BASE, TEST_CASE_PREFIX};

/// One test method.
#[derive(Debug, Clone, Serialize)]
pub struct TestCase {
    /// Method name, eg. `test_zero`.
    name:        String,
    /// The method's docstring.
    description: Option<String>,
    /// Normalized statements, in order.
    statements:  Vec<TestStatement>,
    /// Shown to students as the worked example.
    visible:     bool,
    /// 1-based line of the method.
    line:        usize,
}

impl TestCase {
    /// Gets the method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the method docstring.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Gets the normalized statements.
    pub fn statements(&self) -> &[TestStatement] {
        &self.statements
    }

    /// Whether this is the group's visible example.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Gets the starting line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Counts statements that were kept verbatim for lack of a known shape.
    pub fn unrecognized_count(&self) -> usize {
        self.statements.iter().filter(|s| s.is_unrecognized()).count()
    }
}

/// A `unittest.TestCase` subclass bound to the declaration it tests.
#[derive(Debug, Clone, Serialize)]
pub struct TestGroup {
    /// Class name, eg. `TestSommeDoubles`.
    name:        String,
    /// Name of the bound declaration.
    target:      String,
    /// Kind of the bound declaration.
    target_kind: DeclarationKind,
    /// The class docstring.
    docstring:   Option<String>,
    /// `setUp` statements, verbatim with `self.` removed.
    setup:       Vec<String>,
    /// Test methods, in source order.
    cases:       Vec<TestCase>,
    /// 1-based line of the class.
    line:        usize,
}

impl TestGroup {
    /// Gets the class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the bound declaration's name.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Gets the bound declaration's kind.
    pub fn target_kind(&self) -> DeclarationKind {
        self.target_kind
    }

    /// Gets the class docstring.
    pub fn docstring(&self) -> Option<&str> {
        self.docstring.as_deref()
    }

    /// Gets the setup statements.
    pub fn setup(&self) -> &[String] {
        &self.setup
    }

    /// Gets the cases.
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Gets the starting line.
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Non-fatal observations about the structure of a test module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "note", rename_all = "snake_case")]
pub enum SuiteNote {
    /// A second group bound to an already tested declaration; it is dropped.
    DuplicateGroup {
        /// The dropped class.
        group:  String,
        /// The declaration both groups test.
        target: String,
        /// 1-based line of the dropped class.
        line:   usize,
    },
    /// A method that is neither `setUp` nor a test.
    IgnoredMember {
        /// The class holding it.
        group:  String,
        /// The method name.
        member: String,
        /// 1-based line of the method.
        line:   usize,
    },
}

/// Everything extracted from a test module.
#[derive(Debug, Clone, Serialize)]
pub struct TestSuite {
    /// Name of the input the suite came from.
    origin:         String,
    /// Groups bound to declarations, in source order.
    groups:         Vec<TestGroup>,
    /// Groups bound to nothing.
    binding_errors: Vec<BindingError>,
    /// Statements the transformer could not fully handle.
    issues:         Vec<TransformIssue>,
    /// Other observations.
    notes:          Vec<SuiteNote>,
}

impl TestSuite {
    /// Parses `code` and binds each test group to a declaration of `module`.
    ///
    /// Binding failures are collected, not raised, so every mismatch is
    /// reported in one pass.
    ///
    /// * `origin`: name of the input, used in errors
    /// * `code`: the test module text
    /// * `module`: the analyzed source module
    pub fn extract(origin: &str, code: &str, module: &Module) -> Result<Self, AnalysisError> {
        let parser = Parser::parse_checked(origin, code.to_string())?;
        let root = parser.root_node()?;
        let src = parser.code();

        let mut suite = Self {
            origin:         origin.to_string(),
            groups:         Vec::new(),
            binding_errors: Vec::new(),
            issues:         Vec::new(),
            notes:          Vec::new(),
        };
        let mut transformer = AssertionTransformer::new(src);

        for class in statements(root).into_iter().filter_map(class_of) {
            if !is_test_class(class, src) {
                continue;
            }
            let Some(name_node) = class.child_by_field_name("name") else {
                continue;
            };
            let name = text(name_node, src).to_string();
            let line = line_of(class);

            let target = match bind_group(&name, line, module) {
                Ok(declaration) => declaration,
                Err(err) => {
                    warn!(group = %name, line, "test group matches no declaration");
                    suite.binding_errors.push(err);
                    continue;
                }
            };

            if suite.groups.iter().any(|g| g.target == target.name()) {
                suite.notes.push(SuiteNote::DuplicateGroup {
                    group: name,
                    target: target.name().to_string(),
                    line,
                });
                continue;
            }

            let group = suite.read_group(class, src, name, target.name(), target.kind(), &mut transformer);
            debug!(group = group.name(), target = group.target(), cases = group.cases().len(), "bound test group");
            suite.groups.push(group);
        }

        suite.issues = transformer.into_issues();
        Ok(suite)
    }

    /// Reads the setup and test methods of a bound test class.
    fn read_group(
        &mut self,
        class: Node<'_>,
        src: &str,
        name: String,
        target: &str,
        target_kind: DeclarationKind,
        transformer: &mut AssertionTransformer<'_>,
    ) -> TestGroup {
        let body = class.child_by_field_name("body");
        let mut setup = Vec::new();
        let mut cases: Vec<TestCase> = Vec::new();

        let methods = body
            .map(statements)
            .unwrap_or_default()
            .into_iter()
            .filter_map(method_of);

        for (outer, method) in methods {
            let Some(method_name) = method.child_by_field_name("name").map(|n| text(n, src).to_string()) else {
                continue;
            };
            let Some(method_body) = method.child_by_field_name("body") else {
                continue;
            };

            if method_name == SETUP_METHOD {
                setup = setup_statements(method_body, src);
            } else if method_name.starts_with(TEST_CASE_PREFIX) {
                cases.push(TestCase {
                    description: docstring(method_body, src),
                    statements:  transformer.transform_body(method_body),
                    visible:     cases.is_empty(),
                    line:        line_of(outer),
                    name:        method_name,
                });
            } else {
                self.notes.push(SuiteNote::IgnoredMember {
                    group:  name.clone(),
                    member: method_name,
                    line:   line_of(outer),
                });
            }
        }

        TestGroup {
            docstring: body.and_then(|b| docstring(b, src)),
            line: line_of(class),
            target: target.to_string(),
            name,
            target_kind,
            setup,
            cases,
        }
    }

    /// Gets the input name.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Gets the bound groups.
    pub fn groups(&self) -> &[TestGroup] {
        &self.groups
    }

    /// Gets the group bound to `target`, if any.
    pub fn group_for(&self, target: &str) -> Option<&TestGroup> {
        self.groups.iter().find(|g| g.target == target)
    }

    /// Gets the binding failures.
    pub fn binding_errors(&self) -> &[BindingError] {
        &self.binding_errors
    }

    /// Gets the transformer issues.
    pub fn issues(&self) -> &[TransformIssue] {
        &self.issues
    }

    /// Gets the structural notes.
    pub fn notes(&self) -> &[SuiteNote] {
        &self.notes
    }
}

/// Unwraps a (possibly decorated) class definition.
fn class_of(stmt: Node<'_>) -> Option<Node<'_>> {
    let definition = match stmt.kind() {
        "decorated_definition" => stmt.child_by_field_name("definition")?,
        _ => stmt,
    };
    (definition.kind() == "class_definition").then_some(definition)
}

/// Unwraps a (possibly decorated) method, keeping the outer node for its
/// position.
fn method_of(stmt: Node<'_>) -> Option<(Node<'_>, Node<'_>)> {
    let definition = match stmt.kind() {
        "decorated_definition" => stmt.child_by_field_name("definition")?,
        _ => stmt,
    };
    (definition.kind() == "function_definition").then_some((stmt, definition))
}

/// Returns true if one of the class's bases is `TestCase` or `x.TestCase`.
fn is_test_class(class: Node<'_>, src: &str) -> bool {
    let Some(bases) = class.child_by_field_name("superclasses") else {
        return false;
    };
    named_children(bases)
        .into_iter()
        .filter(|b| matches!(b.kind(), "identifier" | "attribute"))
        .any(|b| text(b, src).rsplit('.').next().map(str::trim) == Some(TEST_CASE_BASE))
}

/// Reads `setUp` statements verbatim, without docstring or `self.`.
fn setup_statements(block: Node<'_>, src: &str) -> Vec<String> {
    statements(block)
        .into_iter()
        .enumerate()
        .filter(|(i, s)| !(*i == 0 && is_string_statement(*s)))
        .map(|(_, s)| render_detached(s, src, SELF_RECEIVER))
        .filter(|s| s.trim() != "pass")
        .collect()
}
