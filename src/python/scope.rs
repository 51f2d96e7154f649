#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scope tracking for identifier references.
//!
//! Python binds a name for a whole function body as soon as it is assigned
//! anywhere in it, so each scope is populated with its bindings before its
//! body is walked. Class bodies are visible only to their own statements, not
//! to the methods nested inside them.

use std::collections::HashSet;

use serde::Serialize;
use tree_sitter::Node;

use super::util::{line_of, named_children, text};

/// What an identifier occurrence refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A parameter of an enclosing function or lambda.
    Parameter,
    /// A name bound inside an enclosing function, class body or
    /// comprehension.
    Local,
    /// A top-level declaration of the module being analyzed.
    ModuleDeclaration,
    /// Anything else: builtins, imports, module-level variables.
    Unknown,
}

/// A single resolved identifier occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The identifier.
    pub name:       String,
    /// What it resolves to.
    pub resolution: Resolution,
    /// 1-based line of the occurrence.
    pub line:       usize,
}

/// The kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    /// A function, method or lambda body.
    Function,
    /// A class body.
    Class,
    /// A comprehension or generator expression.
    Comprehension,
}

/// Names bound in one lexical scope.
#[derive(Debug, Default)]
struct Scope {
    /// Kind of the scope; `None` is never stored.
    kind:       Option<ScopeKind>,
    /// Parameter names.
    parameters: HashSet<String>,
    /// Other local bindings.
    locals:     HashSet<String>,
    /// Names declared `global`.
    globals:    HashSet<String>,
}

impl Scope {
    /// Creates an empty scope of `kind`.
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }
}

/// Resolves identifier occurrences inside top-level definitions.
pub struct ScopeResolver<'a> {
    /// Source the nodes were parsed from.
    src:          &'a str,
    /// Names of every top-level declaration in the module.
    declarations: &'a HashSet<String>,
    /// Active scopes, innermost last.
    scopes:       Vec<Scope>,
    /// Resolved occurrences, in source order.
    references:   Vec<Reference>,
}

impl<'a> ScopeResolver<'a> {
    /// Creates a resolver for a module whose declarations are named
    /// `declarations`.
    pub fn new(src: &'a str, declarations: &'a HashSet<String>) -> Self {
        Self {
            src,
            declarations,
            scopes: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Resolves every identifier occurrence inside a top-level definition
    /// (`function_definition`, `class_definition` or `decorated_definition`).
    pub fn resolve(mut self, definition: Node<'_>) -> Vec<Reference> {
        self.visit(definition);
        self.references
    }

    /// Looks `name` up through the active scopes.
    fn lookup(&self, name: &str) -> Resolution {
        let innermost = self.scopes.len().saturating_sub(1);
        for (depth, scope) in self.scopes.iter().enumerate().rev() {
            if scope.kind == Some(ScopeKind::Class) && depth != innermost {
                continue;
            }
            if scope.globals.contains(name) {
                break;
            }
            if scope.parameters.contains(name) {
                return Resolution::Parameter;
            }
            if scope.locals.contains(name) {
                return Resolution::Local;
            }
        }

        if self.declarations.contains(name) {
            Resolution::ModuleDeclaration
        } else {
            Resolution::Unknown
        }
    }

    /// Records a load of the identifier `node`.
    fn reference(&mut self, node: Node<'_>) {
        let name = text(node, self.src).to_string();
        let resolution = self.lookup(&name);
        self.references.push(Reference {
            name,
            resolution,
            line: line_of(node),
        });
    }

    /// Walks an expression or statement, recording loads.
    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" => self.reference(node),
            "function_definition" => self.visit_function(node),
            "class_definition" => self.visit_class(node),
            "lambda" => self.visit_lambda(node),
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => self.visit_comprehension(node),
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "assignment" | "augmented_assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit_target(left);
                }
                for field in ["type", "right"] {
                    if let Some(child) = node.child_by_field_name(field) {
                        self.visit(child);
                    }
                }
            }
            "for_statement" | "for_in_clause" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit_target(left);
                }
                for child in named_children(node) {
                    if Some(child) != node.child_by_field_name("left") {
                        self.visit(child);
                    }
                }
            }
            "named_expression" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value);
                }
            }
            "as_pattern" => {
                if let Some(subject) = named_children(node).into_iter().next() {
                    self.visit(subject);
                }
            }
            "except_clause" => self.visit_except(node),
            "import_statement" | "import_from_statement" | "future_import_statement"
            | "global_statement" | "nonlocal_statement" | "comment" => {}
            _ => {
                for child in named_children(node) {
                    self.visit(child);
                }
            }
        }
    }

    /// Walks an assignment target: bound names are skipped, but loads inside
    /// attribute and subscript targets are recorded.
    fn visit_target(&mut self, node: Node<'_>) {
        match node.kind() {
            "identifier" => {}
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object);
                }
            }
            "subscript" => {
                for child in named_children(node) {
                    self.visit(child);
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" | "tuple" | "list"
            | "list_splat_pattern" | "parenthesized_expression" => {
                for child in named_children(node) {
                    self.visit_target(child);
                }
            }
            _ => self.visit(node),
        }
    }

    /// Walks an `except` clause, skipping the name bound after `as`.
    fn visit_except(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        let mut after_as = false;
        for child in children {
            if child.kind() == "as" {
                after_as = true;
                continue;
            }
            if after_as && child.is_named() {
                after_as = false;
                self.visit_target(child);
                continue;
            }
            if child.is_named() {
                self.visit(child);
            }
        }
    }

    /// Walks a function: defaults, annotations and decorators are evaluated
    /// in the enclosing scope, the body in a fresh one.
    fn visit_function(&mut self, node: Node<'_>) {
        let mut scope = Scope::new(ScopeKind::Function);

        if let Some(params) = node.child_by_field_name("parameters") {
            self.visit_parameters(params, &mut scope);
        }
        if let Some(returns) = node.child_by_field_name("return_type") {
            self.visit(returns);
        }

        if let Some(body) = node.child_by_field_name("body") {
            collect_bindings(body, self.src, &mut scope);
            self.scopes.push(scope);
            self.visit(body);
            self.scopes.pop();
        }
    }

    /// Walks a class: bases are evaluated in the enclosing scope, the body in
    /// a class scope.
    fn visit_class(&mut self, node: Node<'_>) {
        if let Some(bases) = node.child_by_field_name("superclasses") {
            self.visit(bases);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut scope = Scope::new(ScopeKind::Class);
            collect_bindings(body, self.src, &mut scope);
            self.scopes.push(scope);
            self.visit(body);
            self.scopes.pop();
        }
    }

    /// Walks a lambda, whose parameters shadow the enclosing scopes.
    fn visit_lambda(&mut self, node: Node<'_>) {
        let mut scope = Scope::new(ScopeKind::Function);
        if let Some(params) = node.child_by_field_name("parameters") {
            self.visit_parameters(params, &mut scope);
        }
        if let Some(body) = node.child_by_field_name("body") {
            collect_bindings(body, self.src, &mut scope);
            self.scopes.push(scope);
            self.visit(body);
            self.scopes.pop();
        }
    }

    /// Walks a comprehension, whose loop variables live in their own scope.
    fn visit_comprehension(&mut self, node: Node<'_>) {
        let mut scope = Scope::new(ScopeKind::Comprehension);
        for clause in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "for_in_clause")
        {
            if let Some(left) = clause.child_by_field_name("left") {
                bind_target(left, self.src, &mut scope.locals);
            }
        }

        self.scopes.push(scope);
        for child in named_children(node) {
            self.visit(child);
        }
        self.scopes.pop();
    }

    /// Registers parameter names in `scope` and walks their defaults and
    /// annotations in the current (enclosing) scope.
    fn visit_parameters(&mut self, params: Node<'_>, scope: &mut Scope) {
        for param in named_children(params) {
            if let Some(name) = parameter_name(param, self.src) {
                scope.parameters.insert(name);
            }
            for field in ["type", "value"] {
                if let Some(child) = param.child_by_field_name(field) {
                    self.visit(child);
                }
            }
        }
    }
}

/// Returns the name bound by a parameter node, without `*`/`**` markers.
pub(crate) fn parameter_name(param: Node<'_>, src: &str) -> Option<String> {
    match param.kind() {
        "identifier" => Some(text(param, src).to_string()),
        "default_parameter" | "typed_default_parameter" => param
            .child_by_field_name("name")
            .map(|n| text(n, src).to_string()),
        "typed_parameter" | "list_splat_pattern" | "dictionary_splat_pattern" => {
            named_children(param)
                .into_iter()
                .find(|c| c.kind() != "type")
                .and_then(|c| parameter_name(c, src))
        }
        _ => None,
    }
}

/// Adds the names bound directly in `block` to `scope`, without descending
/// into nested functions, classes, lambdas or comprehensions.
fn collect_bindings(block: Node<'_>, src: &str, scope: &mut Scope) {
    for child in named_children(block) {
        match child.kind() {
            "function_definition" | "class_definition" => {
                if let Some(name) = child.child_by_field_name("name") {
                    scope.locals.insert(text(name, src).to_string());
                }
            }
            "decorated_definition" => {
                if let Some(definition) = child.child_by_field_name("definition")
                    && let Some(name) = definition.child_by_field_name("name")
                {
                    scope.locals.insert(text(name, src).to_string());
                }
            }
            "lambda" | "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => {}
            "assignment" | "augmented_assignment" | "for_statement" => {
                if let Some(left) = child.child_by_field_name("left") {
                    bind_target(left, src, &mut scope.locals);
                }
                collect_bindings(child, src, scope);
            }
            "named_expression" => {
                if let Some(name) = child.child_by_field_name("name") {
                    scope.locals.insert(text(name, src).to_string());
                }
                collect_bindings(child, src, scope);
            }
            "as_pattern" => {
                if let Some(alias) = child.child_by_field_name("alias") {
                    bind_target(alias, src, &mut scope.locals);
                }
                collect_bindings(child, src, scope);
            }
            "except_clause" => {
                bind_except_alias(child, src, &mut scope.locals);
                collect_bindings(child, src, scope);
            }
            "import_statement" | "import_from_statement" => {
                scope.locals.extend(imported_names(child, src));
            }
            "global_statement" => {
                for name in named_children(child) {
                    scope.globals.insert(text(name, src).to_string());
                }
            }
            _ => collect_bindings(child, src, scope),
        }
    }

    let globals = scope.globals.clone();
    scope.locals.retain(|name| !globals.contains(name));
}

/// Adds every identifier bound by an assignment target to `names`.
fn bind_target(node: Node<'_>, src: &str, names: &mut HashSet<String>) {
    match node.kind() {
        "identifier" => {
            names.insert(text(node, src).to_string());
        }
        "attribute" | "subscript" => {}
        _ => {
            for child in named_children(node) {
                bind_target(child, src, names);
            }
        }
    }
}

/// Binds the name following `as` in an except clause written without an
/// `as_pattern` node.
fn bind_except_alias(node: Node<'_>, src: &str, names: &mut HashSet<String>) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    if let Some(pos) = children.iter().position(|c| c.kind() == "as")
        && let Some(alias) = children[pos + 1..].iter().find(|c| c.is_named())
    {
        bind_target(*alias, src, names);
    }
}

/// Returns the names an import statement binds: the alias when present,
/// otherwise the first dotted component for `import a.b` and the imported
/// name for `from m import n`.
pub(crate) fn imported_names(node: Node<'_>, src: &str) -> Vec<String> {
    let mut cursor = node.walk();
    let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();

    names
        .into_iter()
        .filter_map(|name| match name.kind() {
            "aliased_import" => name
                .child_by_field_name("alias")
                .map(|alias| text(alias, src).to_string()),
            "dotted_name" => {
                let full = text(name, src);
                let binding = if node.kind() == "import_statement" {
                    full.split('.').next().unwrap_or(full)
                } else {
                    full.rsplit('.').next().unwrap_or(full)
                };
                Some(binding.trim().to_string())
            }
            _ => None,
        })
        .collect()
}
