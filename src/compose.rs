#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Merges declarations, their resolved dependencies and their transformed
//! test groups into one record per tested declaration.

use bon::Builder;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    constants::BLOCK_SEPARATOR,
    diagnostics::{Diagnostic, Diagnostics},
    python::{Declaration, DeclarationKind, DependencyGraph, Module, TestCase, TestGroup, TestSuite},
    types::LineRef,
};

/// One test case, rendered for a judge that compares printed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedCase {
    /// Test method name.
    name:        String,
    /// Setup lines followed by every statement's probe.
    code:        String,
    /// Expected printed output, one line per assertion.
    expected:    String,
    /// Whether this is the example shown to students.
    visible:     bool,
    /// Test method docstring.
    description: Option<String>,
}

impl ComposedCase {
    /// Renders `case`, prefixed by the group's `setup` lines.
    fn render(case: &TestCase, setup: &[String]) -> Self {
        let code = setup
            .iter()
            .cloned()
            .chain(case.statements().iter().map(|s| s.probe()))
            .join("\n");
        let expected = case
            .statements()
            .iter()
            .filter_map(|s| s.expected_output())
            .join("\n");

        Self {
            name: case.name().to_string(),
            code,
            expected,
            visible: case.visible(),
            description: case.description().map(str::to_string),
        }
    }

    /// Returns the test method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the code the judge runs.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the output the judge expects.
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Returns whether this is the visible example.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Returns the test method docstring.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Everything needed to write one question.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedRecord {
    /// Declaration name.
    name:              String,
    /// Callable or structured type.
    kind:              DeclarationKind,
    /// Rendered parameter list.
    signature:         String,
    /// Problem statement; empty when the declaration has no docstring.
    statement:         String,
    /// Dependency names, in emission order.
    dependencies:      Vec<String>,
    /// Module imports the code needs, verbatim.
    imports:           Vec<String>,
    /// Dependency sources, in emission order.
    dependency_source: Vec<String>,
    /// The declaration's own source.
    source:            String,
    /// Transformed test cases.
    cases:             Vec<ComposedCase>,
    /// Module docstring.
    module_doc:        Option<String>,
}

impl ComposedRecord {
    /// Returns the declaration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declaration kind.
    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    /// Returns the rendered parameter list.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the problem statement.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Returns the dependency names, each before its dependents.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the import statements the code needs.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Returns the declaration's own source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the test cases.
    pub fn cases(&self) -> &[ComposedCase] {
        &self.cases
    }

    /// Returns the module docstring.
    pub fn module_doc(&self) -> Option<&str> {
        self.module_doc.as_deref()
    }

    /// Imports followed by every dependency's source: the code a student
    /// answer runs against.
    pub fn preamble(&self) -> String {
        let imports = self.imports.join("\n");
        std::iter::once(imports.as_str())
            .filter(|s| !s.is_empty())
            .chain(self.dependency_source.iter().map(String::as_str))
            .join(BLOCK_SEPARATOR)
    }

    /// The self-contained program: the preamble followed by the
    /// declaration's own source.
    pub fn template(&self) -> String {
        let preamble = self.preamble();
        if preamble.is_empty() {
            self.source.clone()
        } else {
            format!("{preamble}{BLOCK_SEPARATOR}{}", self.source)
        }
    }
}

/// The records of a run, plus what was left out.
#[derive(Debug, Clone, Serialize)]
pub struct Composition {
    /// One record per tested declaration, in source order.
    records:     Vec<ComposedRecord>,
    /// Declarations with no test group.
    skipped:     Vec<String>,
    /// Coverage and documentation findings.
    diagnostics: Diagnostics,
}

impl Composition {
    /// Returns the records.
    pub fn records(&self) -> &[ComposedRecord] {
        &self.records
    }

    /// Returns the names of untested declarations.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Returns the findings.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Consumes the composition, returning its records and findings.
    pub fn into_parts(self) -> (Vec<ComposedRecord>, Diagnostics) {
        (self.records, self.diagnostics)
    }

    /// Looks a record up by declaration name.
    pub fn get(&self, name: &str) -> Option<&ComposedRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Total number of test cases across records.
    pub fn case_count(&self) -> usize {
        self.records.iter().map(|r| r.cases.len()).sum()
    }
}

/// Builds composed records from an analyzed module and its test suite.
#[derive(Builder)]
pub struct Composer<'a> {
    /// The analyzed source module.
    module:               &'a Module,
    /// Its bound test suite.
    suite:                &'a TestSuite,
    /// Prepend dependency sources.
    #[builder(default = true)]
    include_dependencies: bool,
    /// Prepend required imports.
    #[builder(default = true)]
    include_imports:      bool,
}

impl Composer<'_> {
    /// Composes one record per declaration that has a test group.
    pub fn run(&self) -> Composition {
        let graph = self.module.graph();
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut diagnostics = Diagnostics::new();

        for declaration in self.module.declarations() {
            let at = LineRef::new(self.module.origin(), declaration.line());
            let Some(group) = self.suite.group_for(declaration.name()) else {
                warn!(declaration = declaration.name(), "no test group; skipped");
                diagnostics.push(Diagnostic::Coverage {
                    at,
                    declaration: declaration.name().to_string(),
                });
                skipped.push(declaration.name().to_string());
                continue;
            };

            if declaration.docstring().is_none() {
                warn!(declaration = declaration.name(), "no docstring");
                diagnostics.push(Diagnostic::MissingDocumentation {
                    at,
                    declaration: declaration.name().to_string(),
                });
            }

            records.push(self.record(declaration, group, &graph));
        }

        Composition {
            records,
            skipped,
            diagnostics,
        }
    }

    /// Composes the record of one tested declaration.
    fn record(&self, declaration: &Declaration, group: &TestGroup, graph: &DependencyGraph) -> ComposedRecord {
        let dependencies = graph.resolve(declaration.name());
        debug!(
            declaration = declaration.name(),
            dependencies = ?dependencies,
            cases = group.cases().len(),
            "composing"
        );

        let dependency_source = if self.include_dependencies {
            dependencies
                .iter()
                .filter_map(|name| self.module.get(name))
                .map(|d| d.source().to_string())
                .collect()
        } else {
            Vec::new()
        };

        let imports = if self.include_imports {
            let mut names: Vec<&str> = vec![declaration.name()];
            if self.include_dependencies {
                names.extend(dependencies.iter().map(String::as_str));
            }
            self.module
                .required_imports(&names)
                .into_iter()
                .map(|i| i.source.clone())
                .collect()
        } else {
            Vec::new()
        };

        let cases = group
            .cases()
            .iter()
            .map(|case| ComposedCase::render(case, group.setup()))
            .collect();

        ComposedRecord {
            name: declaration.name().to_string(),
            kind: declaration.kind(),
            signature: declaration.signature(),
            statement: declaration.docstring().unwrap_or_default().to_string(),
            dependencies,
            imports,
            dependency_source,
            source: declaration.source().to_string(),
            cases,
            module_doc: self.module.docstring().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#""""Arithmetic drills."""
import math


def double(x):
    """Return twice x."""
    return 2 * x


def hypot(a, b):
    """Length of the hypotenuse."""
    return math.sqrt(double(a * a / 2) + b * b)


def unused():
    return 0
"#;

    const TESTS: &str = r#"import unittest


class TestDouble(unittest.TestCase):
    def test_positive(self):
        self.assertEqual(double(2), 4)

    def test_zero(self):
        """Zero stays zero."""
        self.assertEqual(double(0), 0)
        self.assertTrue(double(1) > 0)


class TestHypot(unittest.TestCase):
    def setUp(self):
        self.a = 3

    def test_classic(self):
        self.assertEqual(hypot(self.a, 4), 5.0)
"#;

    fn compose(include_imports: bool) -> Composition {
        let module = Module::extract("drills.py", MODULE).expect("module");
        let suite = TestSuite::extract("drills_unittest.py", TESTS, &module).expect("suite");
        Composer::builder()
            .module(&module)
            .suite(&suite)
            .include_imports(include_imports)
            .build()
            .run()
    }

    #[test]
    fn one_record_per_tested_declaration() {
        let composition = compose(true);
        let names: Vec<&str> = composition.records().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["double", "hypot"]);
        assert_eq!(composition.skipped(), ["unused".to_string()]);
        assert_eq!(composition.case_count(), 3);
        assert_eq!(composition.diagnostics().skipped(), vec!["unused"]);
    }

    #[test]
    fn cases_join_probes_and_expectations() {
        let composition = compose(true);
        let double = composition.get("double").expect("double");
        let zero = &double.cases()[1];
        assert_eq!(zero.code(), "print(double(0))\nprint(bool(double(1) > 0))");
        assert_eq!(zero.expected(), "0\nTrue");
        assert_eq!(zero.description(), Some("Zero stays zero."));
        assert!(double.cases()[0].visible());
        assert!(!zero.visible());
    }

    #[test]
    fn setup_prefixes_every_case() {
        let composition = compose(true);
        let hypot = composition.get("hypot").expect("hypot");
        assert_eq!(hypot.cases()[0].code(), "a = 3\nprint(hypot(a, 4))");
        assert_eq!(hypot.cases()[0].expected(), "5.0");
    }

    #[test]
    fn template_carries_imports_and_dependencies() {
        let composition = compose(true);
        let hypot = composition.get("hypot").expect("hypot");
        assert_eq!(hypot.dependencies(), ["double".to_string()]);
        assert_eq!(hypot.imports(), ["import math".to_string()]);

        let template = hypot.template();
        let import_at = template.find("import math").expect("import");
        let double_at = template.find("def double").expect("double");
        let hypot_at = template.find("def hypot").expect("hypot");
        assert!(import_at < double_at && double_at < hypot_at);

        let double = composition.get("double").expect("double");
        assert!(double.imports().is_empty());
        assert_eq!(double.template(), double.source());
        assert_eq!(double.module_doc(), Some("Arithmetic drills."));
    }

    #[test]
    fn imports_can_be_left_out() {
        let composition = compose(false);
        let hypot = composition.get("hypot").expect("hypot");
        assert!(hypot.imports().is_empty());
        assert!(hypot.template().starts_with("def double"));
    }
}
