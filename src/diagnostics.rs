#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use tabled::{
    Table, Tabled,
    settings::{Modify, Panel, Style, Width, object::Rows},
};

use crate::{
    python::{BindingError, SuiteNote, TransformIssue},
    types::LineRef,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// How much a diagnostic matters to the exit status.
pub enum Severity {
    /// Informational.
    Info,
    /// Output was produced but may be incomplete.
    Warning,
    /// Part of the input could not be used.
    Error,
}

impl Severity {
    /// Upper-case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal finding of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A test group that matches no declaration.
    Binding {
        /// Where the group is declared.
        at:       LineRef,
        /// The test class name.
        group:    String,
        /// Declaration names derived from it.
        expected: Vec<String>,
    },
    /// A loop, branch or `subTest` holding assertions; kept verbatim.
    UnsupportedForm {
        /// Where the construct starts.
        at:        LineRef,
        /// Short construct name.
        construct: String,
        /// The statement, as written.
        text:      String,
    },
    /// An assertion of unknown name or arity; kept verbatim.
    UnrecognizedAssertion {
        /// Where the statement is.
        at:     LineRef,
        /// The method called.
        method: String,
        /// The statement, as written.
        text:   String,
    },
    /// A declaration with no test group; no question is produced for it.
    Coverage {
        /// Where the declaration is.
        at:          LineRef,
        /// Its name.
        declaration: String,
    },
    /// A tested declaration without a docstring; its problem statement is
    /// empty.
    MissingDocumentation {
        /// Where the declaration is.
        at:          LineRef,
        /// Its name.
        declaration: String,
    },
    /// A second test group for an already tested declaration; dropped.
    DuplicateGroup {
        /// Where the dropped group is.
        at:     LineRef,
        /// The dropped class.
        group:  String,
        /// The declaration it would test.
        target: String,
    },
    /// A test class method that is neither `setUp` nor a test.
    IgnoredMember {
        /// Where the method is.
        at:     LineRef,
        /// The test class.
        group:  String,
        /// The method.
        member: String,
    },
}

impl Diagnostic {
    /// Returns the severity.
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Binding { .. } => Severity::Error,
            Diagnostic::UnsupportedForm { .. }
            | Diagnostic::UnrecognizedAssertion { .. }
            | Diagnostic::Coverage { .. }
            | Diagnostic::MissingDocumentation { .. }
            | Diagnostic::DuplicateGroup { .. } => Severity::Warning,
            Diagnostic::IgnoredMember { .. } => Severity::Info,
        }
    }

    /// Returns where the finding was made.
    pub fn location(&self) -> &LineRef {
        match self {
            Diagnostic::Binding { at, .. }
            | Diagnostic::UnsupportedForm { at, .. }
            | Diagnostic::UnrecognizedAssertion { at, .. }
            | Diagnostic::Coverage { at, .. }
            | Diagnostic::MissingDocumentation { at, .. }
            | Diagnostic::DuplicateGroup { at, .. }
            | Diagnostic::IgnoredMember { at, .. } => at,
        }
    }

    /// Returns a stable snake_case name for the kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::Binding { .. } => "binding",
            Diagnostic::UnsupportedForm { .. } => "unsupported_form",
            Diagnostic::UnrecognizedAssertion { .. } => "unrecognized_assertion",
            Diagnostic::Coverage { .. } => "coverage",
            Diagnostic::MissingDocumentation { .. } => "missing_documentation",
            Diagnostic::DuplicateGroup { .. } => "duplicate_group",
            Diagnostic::IgnoredMember { .. } => "ignored_member",
        }
    }

    /// Builds a binding diagnostic for `file`.
    pub fn from_binding(file: &str, err: &BindingError) -> Self {
        Diagnostic::Binding {
            at:       LineRef::new(file, err.line),
            group:    err.group.clone(),
            expected: err.expected.clone(),
        }
    }

    /// Builds a diagnostic from a transformer issue in `file`.
    pub fn from_issue(file: &str, issue: &TransformIssue) -> Self {
        match issue {
            TransformIssue::UnsupportedForm {
                line,
                construct,
                text,
            } => Diagnostic::UnsupportedForm {
                at:        LineRef::new(file, *line),
                construct: construct.clone(),
                text:      text.clone(),
            },
            TransformIssue::UnrecognizedAssertion { line, method, text } => {
                Diagnostic::UnrecognizedAssertion {
                    at:     LineRef::new(file, *line),
                    method: method.clone(),
                    text:   text.clone(),
                }
            }
        }
    }

    /// Builds a diagnostic from a test-suite note in `file`.
    pub fn from_note(file: &str, note: &SuiteNote) -> Self {
        match note {
            SuiteNote::DuplicateGroup { group, target, line } => Diagnostic::DuplicateGroup {
                at:     LineRef::new(file, *line),
                group:  group.clone(),
                target: target.clone(),
            },
            SuiteNote::IgnoredMember { group, member, line } => Diagnostic::IgnoredMember {
                at:     LineRef::new(file, *line),
                group:  group.clone(),
                member: member.clone(),
            },
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Binding { group, expected, .. } => {
                if expected.is_empty() {
                    write!(f, "test group `{group}` does not follow the Test<Name> convention")
                } else {
                    write!(
                        f,
                        "test group `{group}` matches no declaration (looked for `{}`)",
                        expected.join("` or `")
                    )
                }
            }
            Diagnostic::UnsupportedForm { construct, .. } => {
                write!(f, "assertions inside `{construct}` are not supported; kept verbatim")
            }
            Diagnostic::UnrecognizedAssertion { method, .. } => {
                write!(f, "unrecognized assertion `{method}`; kept verbatim")
            }
            Diagnostic::Coverage { declaration, .. } => {
                write!(f, "`{declaration}` has no test group; skipped")
            }
            Diagnostic::MissingDocumentation { declaration, .. } => {
                write!(f, "`{declaration}` has no docstring; problem statement is empty")
            }
            Diagnostic::DuplicateGroup { group, target, .. } => {
                write!(f, "`{target}` is already tested; `{group}` ignored")
            }
            Diagnostic::IgnoredMember { group, member, .. } => {
                write!(f, "`{group}.{member}` is neither setUp nor a test; ignored")
            }
        }
    }
}

#[derive(Tabled)]
/// A diagnostic flattened for display.
struct DiagnosticRow {
    /// Severity label.
    #[tabled(rename = "Severity")]
    severity: String,
    /// `file:line`
    #[tabled(rename = "Location")]
    location: String,
    /// Kind name.
    #[tabled(rename = "Kind")]
    kind:     String,
    /// Human-readable message.
    #[tabled(rename = "Message")]
    message:  String,
}

impl From<&Diagnostic> for DiagnosticRow {
    fn from(d: &Diagnostic) -> Self {
        Self {
            severity: d.severity().to_string(),
            location: d.location().to_string(),
            kind:     d.kind().to_string(),
            message:  d.to_string(),
        }
    }
}

/// Diagnostics accumulated over a run, in the order they were found.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    /// The findings.
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a finding.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Iterates over the findings.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Number of findings.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no findings.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of findings of exactly `severity`.
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|d| d.severity() == severity).count()
    }

    /// Highest severity present, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.items.iter().map(Diagnostic::severity).max()
    }

    /// Whether any error-severity finding exists.
    pub fn has_errors(&self) -> bool {
        self.max_severity() == Some(Severity::Error)
    }

    /// Number of statements kept verbatim because nothing recognized them.
    pub fn unrecognized_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| {
                matches!(
                    d,
                    Diagnostic::UnsupportedForm { .. } | Diagnostic::UnrecognizedAssertion { .. }
                )
            })
            .count()
    }

    /// Names of declarations skipped for lack of tests.
    pub fn skipped(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Coverage { declaration, .. } => Some(declaration.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Renders the findings as a table, for terminals.
    pub fn to_table(&self) -> String {
        let rows: Vec<DiagnosticRow> = self.items.iter().map(DiagnosticRow::from).collect();
        Table::new(&rows)
            .with(Panel::header(format!(
                "{} error(s), {} warning(s)",
                self.count(Severity::Error),
                self.count(Severity::Warning)
            )))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(60).keep_words(true)))
            .with(Style::modern())
            .to_string()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type IntoIter = std::slice::Iter<'a, Diagnostic>;
    type Item = &'a Diagnostic;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(name: &str) -> Diagnostic {
        Diagnostic::Coverage {
            at:          LineRef::new("m.py", 3),
            declaration: name.to_string(),
        }
    }

    #[test]
    fn severity_orders_and_counts() {
        let mut diags = Diagnostics::new();
        assert_eq!(diags.max_severity(), None);

        diags.push(coverage("helper"));
        assert_eq!(diags.max_severity(), Some(Severity::Warning));
        assert!(!diags.has_errors());

        diags.push(Diagnostic::from_binding(
            "t.py",
            &BindingError {
                group:    "TestTriple".into(),
                expected: vec!["triple".into(), "Triple".into()],
                line:     9,
            },
        ));
        assert!(diags.has_errors());
        assert_eq!(diags.count(Severity::Warning), 1);
        assert_eq!(diags.skipped(), vec!["helper"]);
    }

    #[test]
    fn messages_and_table_render() {
        let diag = coverage("helper");
        assert_eq!(diag.to_string(), "`helper` has no test group; skipped");
        assert_eq!(diag.location().to_string(), "m.py:3");

        let mut diags = Diagnostics::new();
        diags.push(diag);
        let table = diags.to_table();
        assert!(table.contains("coverage"));
        assert!(table.contains("m.py:3"));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(coverage("helper")).expect("json");
        assert_eq!(json["kind"], "coverage");
        assert_eq!(json["declaration"], "helper");
        assert_eq!(json["at"]["line_number"], 3);
    }
}
