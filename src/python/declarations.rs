#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Extraction of top-level declarations from a Python module.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;
use tree_sitter::Node;

use super::{
    error::AnalysisError,
    graph::DependencyGraph,
    parser::Parser,
    queries::IMPORT_QUERY,
    scope::{Resolution, ScopeResolver, imported_names, parameter_name},
    util::{docstring, line_of, named_children, statements, text},
};
use crate::constants::{CONSTRUCTOR, SELF_RECEIVER};

/// Kinds of top-level declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// A function.
    Callable,
    /// A class.
    StructuredType,
}

/// How a parameter receives its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// A plain positional-or-keyword parameter.
    Regular,
    /// `*args`
    VariadicPositional,
    /// `**kwargs`
    VariadicKeyword,
}

/// One entry of a declaration's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Parameter name, without `*`/`**`.
    pub name:        String,
    /// Whether a default value is present. The value itself is not kept.
    pub has_default: bool,
    /// How the parameter binds.
    pub kind:        ParameterKind,
}

/// A top-level function or class.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    /// Declared name, unique within its module.
    name:       String,
    /// Function or class.
    kind:       DeclarationKind,
    /// Signature; for classes, the constructor's parameters minus the
    /// receiver.
    parameters: Vec<Parameter>,
    /// Text of the body block, verbatim.
    body:       String,
    /// Full definition text, decorators included.
    source:     String,
    /// Cleaned docstring, if the body starts with one.
    docstring:  Option<String>,
    /// Same-module declarations referenced anywhere in the definition, in
    /// order of first reference. May include the declaration itself.
    uses:       IndexSet<String>,
    /// Free names that are not module declarations (builtins, imports,
    /// globals), in order of first reference.
    external:   IndexSet<String>,
    /// 1-based line the definition starts on.
    line:       usize,
}

impl Declaration {
    /// Gets the declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the declaration kind.
    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    /// Gets the signature.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Gets the raw body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Gets the full definition text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Gets the docstring, if any.
    pub fn docstring(&self) -> Option<&str> {
        self.docstring.as_deref()
    }

    /// Gets the same-module names this declaration references.
    pub fn uses(&self) -> &IndexSet<String> {
        &self.uses
    }

    /// Gets the free names that are not module declarations.
    pub fn external(&self) -> &IndexSet<String> {
        &self.external
    }

    /// Gets the starting line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Renders the signature as written in a `def` header, without defaults,
    /// eg. `(a, b=..., *args)`.
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                let marker = match p.kind {
                    ParameterKind::Regular => "",
                    ParameterKind::VariadicPositional => "*",
                    ParameterKind::VariadicKeyword => "**",
                };
                let default = if p.has_default { "=..." } else { "" };
                format!("{marker}{}{default}", p.name)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("({params})")
    }
}

/// A module-level import statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    /// The statement, verbatim.
    pub source:      String,
    /// Names the statement binds in the module namespace.
    pub bound_names: Vec<String>,
    /// Whether this is a `from __future__ import ...`.
    pub future:      bool,
    /// 1-based line of the statement.
    pub line:        usize,
}

/// The analyzed contents of a source module.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    /// Name of the input the module came from.
    origin:       String,
    /// Module docstring.
    docstring:    Option<String>,
    /// Declarations, in source order.
    declarations: Vec<Declaration>,
    /// Module-level imports, in source order.
    imports:      Vec<Import>,
}

impl Module {
    /// Parses `code` and extracts its top-level declarations.
    ///
    /// * `origin`: name of the input, used in errors
    /// * `code`: the module text
    pub fn extract(origin: &str, code: &str) -> Result<Self, AnalysisError> {
        let parser = Parser::parse_checked(origin, code.to_string())?;
        let root = parser.root_node()?;
        let src = parser.code();

        // Pass 1: names, so references can be classified in pass 2.
        let mut definitions = Vec::new();
        let mut first_lines: HashMap<String, usize> = HashMap::new();
        for stmt in statements(root) {
            let Some((definition, kind)) = definition_of(stmt) else {
                continue;
            };
            let Some(name_node) = definition.child_by_field_name("name") else {
                continue;
            };
            let name = text(name_node, src).to_string();
            let line = line_of(stmt);

            if let Some(first_line) = first_lines.get(&name) {
                return Err(AnalysisError::DuplicateDeclaration {
                    origin: origin.to_string(),
                    name,
                    first_line: *first_line,
                    second_line: line,
                });
            }
            first_lines.insert(name.clone(), line);
            definitions.push((stmt, definition, kind, name));
        }

        let names: HashSet<String> = first_lines.into_keys().collect();

        // Pass 2: everything else.
        let declarations = definitions
            .into_iter()
            .map(|(outer, definition, kind, name)| {
                let references = ScopeResolver::new(src, &names).resolve(outer);
                let mut uses = IndexSet::new();
                let mut external = IndexSet::new();
                for reference in references {
                    match reference.resolution {
                        Resolution::ModuleDeclaration => {
                            uses.insert(reference.name);
                        }
                        Resolution::Unknown => {
                            external.insert(reference.name);
                        }
                        Resolution::Parameter | Resolution::Local => {}
                    }
                }

                let body = definition.child_by_field_name("body");
                let declaration = Declaration {
                    parameters: match kind {
                        DeclarationKind::Callable => signature_of(definition, src, false),
                        DeclarationKind::StructuredType => constructor_of(definition, src),
                    },
                    body: body.map(|b| text(b, src).to_string()).unwrap_or_default(),
                    source: text(outer, src).to_string(),
                    docstring: body.and_then(|b| docstring(b, src)),
                    line: line_of(outer),
                    name,
                    kind,
                    uses,
                    external,
                };
                debug!(
                    name = declaration.name(),
                    uses = ?declaration.uses(),
                    "extracted declaration"
                );
                declaration
            })
            .collect();

        let imports = parser
            .query_nodes(IMPORT_QUERY, "import")?
            .into_iter()
            .filter(|node| node.parent().is_some_and(|p| p.kind() == "module"))
            .map(|node| Import {
                source:      text(node, src).to_string(),
                bound_names: imported_names(node, src),
                future:      node.kind() == "future_import_statement",
                line:        line_of(node),
            })
            .collect();

        Ok(Self {
            origin: origin.to_string(),
            docstring: docstring(root, src),
            declarations,
            imports,
        })
    }

    /// Gets the input name.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Gets the module docstring.
    pub fn docstring(&self) -> Option<&str> {
        self.docstring.as_deref()
    }

    /// Gets the declarations, in source order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Gets the module-level imports.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Looks a declaration up by name.
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    /// Builds the dependency graph over this module's declarations.
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_declarations(&self.declarations)
    }

    /// Returns the imports whose bound names are referenced by any of the
    /// named declarations, plus every `__future__` import, in source order.
    pub fn required_imports<'a>(&'a self, names: &[&str]) -> Vec<&'a Import> {
        let needed: HashSet<&str> = names
            .iter()
            .filter_map(|n| self.get(n))
            .flat_map(|d| d.external.iter().map(String::as_str))
            .collect();

        self.imports
            .iter()
            .filter(|i| i.future || i.bound_names.iter().any(|b| needed.contains(b.as_str())))
            .collect()
    }
}

/// Unwraps a top-level statement into the definition it holds.
fn definition_of(stmt: Node<'_>) -> Option<(Node<'_>, DeclarationKind)> {
    let definition = if stmt.kind() == "decorated_definition" {
        stmt.child_by_field_name("definition")?
    } else {
        stmt
    };

    match definition.kind() {
        "function_definition" => Some((definition, DeclarationKind::Callable)),
        "class_definition" => Some((definition, DeclarationKind::StructuredType)),
        _ => None,
    }
}

/// Reads the parameter list of a function definition.
///
/// * `skip_receiver`: drop the first parameter (a method's `self`)
fn signature_of(function: Node<'_>, src: &str, skip_receiver: bool) -> Vec<Parameter> {
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let mut parameters: Vec<Parameter> = named_children(params)
        .into_iter()
        .filter_map(|param| {
            let name = parameter_name(param, src)?;
            let kind = match param.kind() {
                "list_splat_pattern" => ParameterKind::VariadicPositional,
                "dictionary_splat_pattern" => ParameterKind::VariadicKeyword,
                "typed_parameter" => named_children(param)
                    .into_iter()
                    .find_map(|c| match c.kind() {
                        "list_splat_pattern" => Some(ParameterKind::VariadicPositional),
                        "dictionary_splat_pattern" => Some(ParameterKind::VariadicKeyword),
                        _ => None,
                    })
                    .unwrap_or(ParameterKind::Regular),
                _ => ParameterKind::Regular,
            };
            Some(Parameter {
                name,
                has_default: matches!(param.kind(), "default_parameter" | "typed_default_parameter"),
                kind,
            })
        })
        .collect();

    if skip_receiver && parameters.first().is_some_and(|p| p.name == SELF_RECEIVER) {
        parameters.remove(0);
    }
    parameters
}

/// Reads a class's signature from its `__init__`, if it defines one.
fn constructor_of(class: Node<'_>, src: &str) -> Vec<Parameter> {
    let Some(body) = class.child_by_field_name("body") else {
        return Vec::new();
    };

    statements(body)
        .into_iter()
        .filter_map(|stmt| definition_of(stmt).map(|(d, _)| d))
        .filter(|d| d.kind() == "function_definition")
        .find(|d| {
            d.child_by_field_name("name")
                .is_some_and(|n| text(n, src) == CONSTRUCTOR)
        })
        .map(|init| signature_of(init, src, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#""""Helpers for doubling things."""

import math
from functools import reduce as fold


def double(x):
    """Returns twice x."""
    return x * 2


def somme_doubles(liste, start=0, *rest, **options):
    total = start
    for n in liste:
        total += double(n)
    return math.floor(total)


class Calculatrice:
    """A calculator."""

    def __init__(self, valeur=0):
        self.valeur = valeur

    def doubler(self):
        self.valeur = double(self.valeur)
"#;

    #[test]
    fn extracts_declarations_in_source_order() {
        let module = Module::extract("sample.py", SAMPLE).expect("extract");
        let names: Vec<_> = module.declarations().iter().map(Declaration::name).collect();
        assert_eq!(names, vec!["double", "somme_doubles", "Calculatrice"]);
        assert_eq!(module.docstring(), Some("Helpers for doubling things."));
    }

    #[test]
    fn captures_signature_shape_and_docstring() {
        let module = Module::extract("sample.py", SAMPLE).expect("extract");
        let somme = module.get("somme_doubles").expect("somme_doubles");
        assert_eq!(somme.signature(), "(liste, start=..., *rest, **options)");
        assert_eq!(somme.docstring(), None);

        let calc = module.get("Calculatrice").expect("class");
        assert_eq!(calc.kind(), DeclarationKind::StructuredType);
        assert_eq!(calc.signature(), "(valeur=...)");
        assert_eq!(calc.docstring(), Some("A calculator."));
        assert!(calc.source().starts_with("class Calculatrice:"));
    }

    #[test]
    fn docstrings_with_no_break_space_margins() {
        let code = "def f():\n    \"\"\"Résumé.\n\n    \u{a0}\u{a0}note\n      x\n    \"\"\"\n    return 1\n";
        let module = Module::extract("nbsp.py", code).expect("extract");
        let f = module.get("f").expect("f");
        assert_eq!(f.docstring(), Some("Résumé.\n\n\u{a0}\u{a0}note\n  x"));
    }

    #[test]
    fn uses_cover_nested_scopes_only_for_declarations() {
        let module = Module::extract("sample.py", SAMPLE).expect("extract");
        let uses = |name: &str| -> Vec<String> {
            module.get(name).expect("declared").uses().iter().cloned().collect()
        };
        assert!(uses("double").is_empty());
        assert_eq!(uses("somme_doubles"), vec!["double"]);
        assert_eq!(uses("Calculatrice"), vec!["double"]);
    }

    #[test]
    fn required_imports_follow_external_names() {
        let module = Module::extract("sample.py", SAMPLE).expect("extract");
        let imports = module.required_imports(&["double", "somme_doubles"]);
        let sources: Vec<_> = imports.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["import math"]);
        assert!(module.required_imports(&["double"]).is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let code = "def f():\n    pass\n\n\ndef f():\n    return 1\n";
        match Module::extract("dup.py", code) {
            Err(AnalysisError::DuplicateDeclaration {
                name,
                first_line,
                second_line,
                ..
            }) => {
                assert_eq!(name, "f");
                assert_eq!((first_line, second_line), (1, 5));
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_are_fatal() {
        let err = Module::extract("broken.py", "def f(:\n").expect_err("invalid");
        assert!(err.is_syntax());
    }
}
