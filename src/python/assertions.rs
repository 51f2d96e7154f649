#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Rewrites unittest statements into judge-ready test statements.
//!
//! Each statement of a test method is matched against a closed set of
//! assertion shapes. A match becomes a typed [`TestStatement`] that renders to
//! a probe (code printing an observed value) and the output a correct
//! solution prints. Plain code passes through verbatim; assertion-like code
//! that matches no shape is kept verbatim too, but reported.

use anyhow::Result;
use serde::Serialize;
use tree_sitter::Node;

use super::{
    literal::Literal,
    parser::Parser,
    util::{indent, is_string_statement, line_of, named_children, render_detached, statements, text},
};
use crate::constants::{NOT_RAISED_MARKER, RAISED_MARKER, SELF_RECEIVER};

/// How an expected exception's message is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageMatch {
    /// The expression as written in the test, eg. `"vide"`.
    pub source:  String,
    /// The decoded text when `source` is a string literal, else `source`.
    pub value:   String,
    /// True for `assertRaisesRegex` patterns, false for substrings.
    pub pattern: bool,
}

/// One normalized statement of a test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum TestStatement {
    /// `actual` must equal `expected`.
    Equality {
        /// Expression producing the observed value.
        actual:   String,
        /// The expected value, as written.
        expected: Literal,
    },
    /// `bool(expr)` must be `expected`.
    Boolean {
        /// Expression under test.
        expr:     String,
        /// Expected truth value.
        expected: bool,
    },
    /// `item in container` must hold.
    Membership {
        /// The needle.
        item:      String,
        /// The haystack.
        container: String,
    },
    /// Running `body` must raise `kind`.
    ExceptionExpectation {
        /// Exception class (or tuple of classes), as written.
        kind:    String,
        /// Statements expected to raise, verbatim.
        body:    Vec<String>,
        /// Message check, when the test makes one.
        message: Option<MessageMatch>,
        /// Name later statements use for the assertion context, as in
        /// `with self.assertRaises(K) as ctx:`; bound in the handler so
        /// `ctx.exception` stays readable.
        context: Option<String>,
    },
    /// Plain code (assignments, calls) run as part of the probe.
    Verbatim {
        /// The statement, receivers detached.
        code: String,
    },
    /// Assertion-like code matching no known shape, kept as written.
    Unrecognized {
        /// The statement, receivers detached.
        code: String,
    },
}

impl TestStatement {
    /// Returns the code the judge runs for this statement.
    pub fn probe(&self) -> String {
        match self {
            TestStatement::Equality { actual, expected } => match expected.printed() {
                Some(_) => format!("print({actual})"),
                None => format!("print({actual} == {})", expected.source()),
            },
            TestStatement::Boolean { expr, .. } => format!("print(bool({expr}))"),
            TestStatement::Membership { item, container } => format!("print({item} in {container})"),
            TestStatement::ExceptionExpectation {
                kind,
                body,
                message,
                context,
            } => {
                let body = if body.is_empty() {
                    "pass".to_string()
                } else {
                    body.join("\n")
                };
                // the `as` target is unbound when the handler ends
                let caught = if context.as_deref() == Some("e") { "_e" } else { "e" };
                let mut handler = match message {
                    None if context.is_none() => format!("except {kind}:\n    print(\"{RAISED_MARKER}\")"),
                    None => format!("except {kind} as {caught}:\n    print(\"{RAISED_MARKER}\")"),
                    Some(MessageMatch {
                        source, pattern: false, ..
                    }) => format!(
                        "except {kind} as {caught}:\n    print(\"{RAISED_MARKER}\" if {source} in str({caught}) else \"{NOT_RAISED_MARKER}\")"
                    ),
                    Some(MessageMatch {
                        source, pattern: true, ..
                    }) => format!(
                        "except {kind} as {caught}:\n    import re\n    print(\"{RAISED_MARKER}\" if re.search({source}, str({caught})) else \"{NOT_RAISED_MARKER}\")"
                    ),
                };
                if let Some(context) = context {
                    handler.push_str(&format!(
                        "\n    import types\n    {context} = types.SimpleNamespace(exception={caught})"
                    ));
                }
                format!(
                    "try:\n{}\n    print(\"{NOT_RAISED_MARKER}\")\n{handler}",
                    indent(&body, "    ")
                )
            }
            TestStatement::Verbatim { code } | TestStatement::Unrecognized { code } => code.clone(),
        }
    }

    /// Returns the output line(s) a correct solution prints for this
    /// statement, or `None` if it prints nothing.
    pub fn expected_output(&self) -> Option<String> {
        match self {
            TestStatement::Equality { expected, .. } => {
                Some(expected.printed().unwrap_or_else(|| "True".to_string()))
            }
            TestStatement::Boolean { expected, .. } => {
                Some(if *expected { "True" } else { "False" }.to_string())
            }
            TestStatement::Membership { .. } => Some("True".to_string()),
            TestStatement::ExceptionExpectation { .. } => Some(RAISED_MARKER.to_string()),
            TestStatement::Verbatim { .. } | TestStatement::Unrecognized { .. } => None,
        }
    }

    /// Returns true for statements nothing could make sense of.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, TestStatement::Unrecognized { .. })
    }

    /// Returns true for statements that check something.
    pub fn is_assertion(&self) -> bool {
        !matches!(self, TestStatement::Verbatim { .. } | TestStatement::Unrecognized { .. })
    }
}

/// Something the transformer could not fully handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TransformIssue {
    /// A construct outside straight-line assertions (loop, branch, subTest).
    UnsupportedForm {
        /// 1-based line of the statement.
        line:      usize,
        /// Short name of the construct, eg. `for`.
        construct: String,
        /// The statement as written.
        text:      String,
    },
    /// A `self.assert*` call with an unknown name or arity.
    UnrecognizedAssertion {
        /// 1-based line of the statement.
        line:   usize,
        /// The method called.
        method: String,
        /// The statement as written.
        text:   String,
    },
}

/// A call to `self.<method>(...)`, split into its parts.
struct SelfCall<'t> {
    /// Method name.
    method:   String,
    /// Positional arguments.
    args:     Vec<Node<'t>>,
    /// Keyword arguments, verbatim.
    keywords: Vec<Node<'t>>,
    /// The whole call.
    node:     Node<'t>,
}

/// Transformer over the statements of one test file.
pub struct AssertionTransformer<'s> {
    /// Source the nodes were parsed from.
    src:    &'s str,
    /// Issues met so far.
    issues: Vec<TransformIssue>,
}

impl<'s> AssertionTransformer<'s> {
    /// Creates a transformer for nodes parsed from `src`.
    pub fn new(src: &'s str) -> Self {
        Self {
            src,
            issues: Vec::new(),
        }
    }

    /// Gets the issues collected so far.
    pub fn issues(&self) -> &[TransformIssue] {
        &self.issues
    }

    /// Consumes the transformer, returning its issues.
    pub fn into_issues(self) -> Vec<TransformIssue> {
        self.issues
    }

    /// Transforms the statements of a test method body. A leading docstring
    /// is skipped, and a `with self.assertRaises(K) as cm:` block followed by
    /// `self.assertIn(s, str(cm.exception))` folds into a single expectation.
    /// When later statements still read `cm`, the expectation binds it.
    pub fn transform_body(&mut self, block: Node<'_>) -> Vec<TestStatement> {
        let mut stmts = statements(block);
        if stmts.first().is_some_and(|s| is_string_statement(*s)) {
            stmts.remove(0);
        }

        let mut out = Vec::with_capacity(stmts.len());
        let mut i = 0;
        while i < stmts.len() {
            let stmt = stmts[i];
            let Some(alias) = self.raises_alias(stmt) else {
                out.push(self.transform(stmt));
                i += 1;
                continue;
            };

            match self.transform(stmt) {
                TestStatement::ExceptionExpectation { kind, body, message, .. } => {
                    let folded = match message {
                        Some(_) => None,
                        None => stmts.get(i + 1).and_then(|next| self.message_check(*next, &alias)),
                    };
                    let consumed = if folded.is_some() { 2 } else { 1 };
                    let read_later = stmts
                        .get(i + consumed..)
                        .unwrap_or_default()
                        .iter()
                        .any(|later| self.references_name(*later, &alias));

                    out.push(TestStatement::ExceptionExpectation {
                        kind,
                        body,
                        message: folded.or(message),
                        context: read_later.then_some(alias),
                    });
                    i += consumed;
                }
                other => {
                    out.push(other);
                    i += 1;
                }
            }
        }
        out
    }

    /// Returns true if `node` reads the variable `name`.
    fn references_name(&self, node: Node<'_>, name: &str) -> bool {
        match node.kind() {
            "identifier" => text(node, self.src) == name,
            "attribute" => node
                .child_by_field_name("object")
                .is_some_and(|object| self.references_name(object, name)),
            "keyword_argument" => node
                .child_by_field_name("value")
                .is_some_and(|value| self.references_name(value, name)),
            _ => named_children(node)
                .into_iter()
                .any(|child| self.references_name(child, name)),
        }
    }

    /// Transforms a single statement.
    pub fn transform(&mut self, stmt: Node<'_>) -> TestStatement {
        match stmt.kind() {
            "expression_statement" => self.transform_expression(stmt),
            "assert_statement" => self.transform_assert(stmt),
            "with_statement" => self.transform_with(stmt),
            "for_statement" | "while_statement" | "if_statement" | "try_statement" | "match_statement"
            | "function_definition" | "class_definition" | "decorated_definition" => {
                self.guard_compound(stmt, construct_name(stmt.kind()))
            }
            _ => TestStatement::Verbatim {
                code: self.detached(stmt),
            },
        }
    }

    /// Renders `node` with `self.` receivers removed.
    fn detached(&self, node: Node<'_>) -> String {
        render_detached(node, self.src, SELF_RECEIVER)
    }

    /// Renders an operand, parenthesized when it would bind looser than a
    /// comparison.
    fn operand(&self, node: Node<'_>) -> String {
        let rendered = self.detached(node);
        match node.kind() {
            "boolean_operator" | "not_operator" | "comparison_operator" | "conditional_expression"
            | "lambda" | "named_expression" => format!("({rendered})"),
            _ => rendered,
        }
    }

    /// Records an unrecognized assertion and returns it verbatim.
    fn unrecognized(&mut self, stmt: Node<'_>, method: &str) -> TestStatement {
        self.issues.push(TransformIssue::UnrecognizedAssertion {
            line:   line_of(stmt),
            method: method.to_string(),
            text:   text(stmt, self.src).to_string(),
        });
        TestStatement::Unrecognized {
            code: self.detached(stmt),
        }
    }

    /// Compound statements are only supported when they hold no assertion.
    fn guard_compound(&mut self, stmt: Node<'_>, construct: &str) -> TestStatement {
        if !self.mentions_assertion(stmt) {
            return TestStatement::Verbatim {
                code: self.detached(stmt),
            };
        }

        self.issues.push(TransformIssue::UnsupportedForm {
            line:      line_of(stmt),
            construct: construct.to_string(),
            text:      text(stmt, self.src).to_string(),
        });
        TestStatement::Unrecognized {
            code: self.detached(stmt),
        }
    }

    /// Returns true if `node` contains a `self.assert*`/`self.fail` call or an
    /// `assert` statement.
    fn mentions_assertion(&self, node: Node<'_>) -> bool {
        if node.kind() == "assert_statement" {
            return true;
        }
        if let Some(call) = self.self_call(node)
            && (call.method.starts_with("assert") || call.method == "fail")
        {
            return true;
        }
        named_children(node)
            .into_iter()
            .any(|child| self.mentions_assertion(child))
    }

    /// Splits `node` if it is a call to a method of `self`.
    fn self_call<'t>(&self, node: Node<'t>) -> Option<SelfCall<'t>> {
        if node.kind() != "call" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        if function.kind() != "attribute" {
            return None;
        }
        let object = function.child_by_field_name("object")?;
        if object.kind() != "identifier" || text(object, self.src) != SELF_RECEIVER {
            return None;
        }
        let method = text(function.child_by_field_name("attribute")?, self.src).to_string();

        let mut args = Vec::new();
        let mut keywords = Vec::new();
        if let Some(arguments) = node.child_by_field_name("arguments") {
            for arg in named_children(arguments) {
                match arg.kind() {
                    "comment" => {}
                    "keyword_argument" | "dictionary_splat" => keywords.push(arg),
                    _ => args.push(arg),
                }
            }
        }

        Some(SelfCall {
            method,
            args,
            keywords,
            node,
        })
    }

    /// Handles expression statements: assertion calls and plain code.
    fn transform_expression(&mut self, stmt: Node<'_>) -> TestStatement {
        let children = named_children(stmt);
        let call = match children.as_slice() {
            [only] => self.self_call(*only),
            _ => None,
        };

        match call {
            Some(call) if call.method.starts_with("assert") || call.method == "fail" => {
                self.transform_assertion(stmt, &call)
            }
            _ if self.mentions_assertion(stmt) => self.unrecognized(stmt, "assert"),
            _ => TestStatement::Verbatim {
                code: self.detached(stmt),
            },
        }
    }

    /// Dispatches on the assertion method name.
    fn transform_assertion(&mut self, stmt: Node<'_>, call: &SelfCall<'_>) -> TestStatement {
        let args = call.args.as_slice();
        match (call.method.as_str(), args) {
            ("assertEqual" | "assertEquals", [actual, expected, ..]) => TestStatement::Equality {
                actual:   self.operand(*actual),
                expected: self.expected_value(*expected),
            },
            ("assertTrue" | "assert_", [expr, ..]) => TestStatement::Boolean {
                expr:     self.detached(*expr),
                expected: true,
            },
            ("assertFalse", [expr, ..]) => TestStatement::Boolean {
                expr:     self.detached(*expr),
                expected: false,
            },
            ("assertIn", [item, container, ..]) => TestStatement::Membership {
                item:      self.operand(*item),
                container: self.operand(*container),
            },
            ("assertNotIn", [item, container, ..]) => self.comparison(*item, "in", *container, false),
            ("assertNotEqual" | "assertNotEquals", [a, b, ..]) => self.comparison(*a, "==", *b, false),
            ("assertIs", [a, b, ..]) => self.comparison(*a, "is", *b, true),
            ("assertIsNot", [a, b, ..]) => self.comparison(*a, "is", *b, false),
            ("assertGreater", [a, b, ..]) => self.comparison(*a, ">", *b, true),
            ("assertGreaterEqual", [a, b, ..]) => self.comparison(*a, ">=", *b, true),
            ("assertLess", [a, b, ..]) => self.comparison(*a, "<", *b, true),
            ("assertLessEqual", [a, b, ..]) => self.comparison(*a, "<=", *b, true),
            ("assertIsNone", [expr, ..]) => TestStatement::Boolean {
                expr:     format!("{} is None", self.operand(*expr)),
                expected: true,
            },
            ("assertIsNotNone", [expr, ..]) => TestStatement::Boolean {
                expr:     format!("{} is None", self.operand(*expr)),
                expected: false,
            },
            ("assertIsInstance", [expr, class, ..]) => TestStatement::Boolean {
                expr:     format!("isinstance({}, {})", self.detached(*expr), self.detached(*class)),
                expected: true,
            },
            ("assertNotIsInstance", [expr, class, ..]) => TestStatement::Boolean {
                expr:     format!("isinstance({}, {})", self.detached(*expr), self.detached(*class)),
                expected: false,
            },
            ("assertAlmostEqual", [a, b]) => TestStatement::Boolean {
                expr:     format!("round(abs({} - {}), 7) == 0", self.operand(*a), self.operand(*b)),
                expected: true,
            },
            ("assertRaises", [kind, callable, rest @ ..]) => TestStatement::ExceptionExpectation {
                kind:    self.detached(*kind),
                body:    vec![self.deferred_call(*callable, rest, &call.keywords)],
                message: None,
                context: None,
            },
            ("assertRaisesRegex", [kind, pattern, callable, rest @ ..]) => TestStatement::ExceptionExpectation {
                kind:    self.detached(*kind),
                body:    vec![self.deferred_call(*callable, rest, &call.keywords)],
                message: Some(self.message(*pattern, true)),
                context: None,
            },
            (method, _) => {
                let method = method.to_string();
                self.unrecognized(call.node, &method)
            }
        }
    }

    /// Builds `Boolean(a <op> b, expected)`.
    fn comparison(&self, a: Node<'_>, op: &str, b: Node<'_>, expected: bool) -> TestStatement {
        TestStatement::Boolean {
            expr: format!("{} {op} {}", self.operand(a), self.operand(b)),
            expected,
        }
    }

    /// Reads the expected side of an equality; non-literals are kept as
    /// detached expressions.
    fn expected_value(&self, node: Node<'_>) -> Literal {
        let literal = Literal::from_node(node, self.src);
        if literal.is_literal() {
            literal
        } else {
            Literal::Expr(self.operand(node))
        }
    }

    /// Builds a message check from the expression `node`.
    fn message(&self, node: Node<'_>, pattern: bool) -> MessageMatch {
        let source = self.detached(node);
        let value = match Literal::from_node(node, self.src) {
            Literal::Str { value, .. } => value,
            _ => source.clone(),
        };
        MessageMatch {
            source,
            value,
            pattern,
        }
    }

    /// Renders `callable(*rest, **keywords)` for the call form of
    /// `assertRaises`.
    fn deferred_call(&self, callable: Node<'_>, rest: &[Node<'_>], keywords: &[Node<'_>]) -> String {
        let args = rest
            .iter()
            .chain(keywords)
            .map(|a| self.detached(*a))
            .collect::<Vec<_>>()
            .join(", ");
        let callable = match callable.kind() {
            "lambda" => format!("({})", self.detached(callable)),
            _ => self.detached(callable),
        };
        format!("{callable}({args})")
    }

    /// Handles bare `assert` statements.
    fn transform_assert(&mut self, stmt: Node<'_>) -> TestStatement {
        let Some(condition) = named_children(stmt).into_iter().next() else {
            return self.unrecognized(stmt, "assert");
        };

        match condition.kind() {
            "comparison_operator" => {
                let operands = named_children(condition);
                let mut cursor = condition.walk();
                let operators: Vec<_> = condition
                    .children_by_field_name("operators", &mut cursor)
                    .map(|op| text(op, self.src).split_whitespace().collect::<Vec<_>>().join(" "))
                    .collect();

                match (operands.as_slice(), operators.as_slice()) {
                    ([actual, expected], [op]) if op == "==" => TestStatement::Equality {
                        actual:   self.operand(*actual),
                        expected: self.expected_value(*expected),
                    },
                    ([item, container], [op]) if op == "in" => TestStatement::Membership {
                        item:      self.operand(*item),
                        container: self.operand(*container),
                    },
                    _ => TestStatement::Boolean {
                        expr:     self.detached(condition),
                        expected: true,
                    },
                }
            }
            "not_operator" => match condition.child_by_field_name("argument") {
                Some(argument) => TestStatement::Boolean {
                    expr:     self.detached(argument),
                    expected: false,
                },
                None => self.unrecognized(stmt, "assert"),
            },
            _ => TestStatement::Boolean {
                expr:     self.detached(condition),
                expected: true,
            },
        }
    }

    /// Handles `with` blocks: exception expectations, or plain context
    /// managers.
    fn transform_with(&mut self, stmt: Node<'_>) -> TestStatement {
        let items = with_items(stmt);
        let body = stmt.child_by_field_name("body");

        if let ([item], Some(body)) = (items.as_slice(), body)
            && let Some(call) = self.self_call(with_value(*item))
        {
            match (call.method.as_str(), call.args.as_slice()) {
                ("assertRaises", [kind]) => {
                    return TestStatement::ExceptionExpectation {
                        kind:    self.detached(*kind),
                        body:    self.verbatim_block(body),
                        message: None,
                        context: None,
                    };
                }
                ("assertRaisesRegex", [kind, pattern]) => {
                    return TestStatement::ExceptionExpectation {
                        kind:    self.detached(*kind),
                        body:    self.verbatim_block(body),
                        message: Some(self.message(*pattern, true)),
                        context: None,
                    };
                }
                ("subTest", _) => return self.guard_compound(stmt, "subTest"),
                _ => {}
            }
        }

        self.guard_compound(stmt, "with")
    }

    /// Renders every statement of a block verbatim.
    fn verbatim_block(&self, block: Node<'_>) -> Vec<String> {
        statements(block)
            .into_iter()
            .map(|s| self.detached(s))
            .collect()
    }

    /// Returns the `as` name of a `with self.assertRaises(K) as name:` (or
    /// `assertRaisesRegex`) block.
    fn raises_alias(&self, stmt: Node<'_>) -> Option<String> {
        if stmt.kind() != "with_statement" {
            return None;
        }
        let items = with_items(stmt);
        let [item] = items.as_slice() else {
            return None;
        };
        let value = item.child_by_field_name("value")?;
        if value.kind() != "as_pattern" {
            return None;
        }

        let call = self.self_call(with_value(*item))?;
        match (call.method.as_str(), call.args.len()) {
            ("assertRaises", 1) | ("assertRaisesRegex", 2) => {}
            _ => return None,
        }
        let alias = value.child_by_field_name("alias")?;
        Some(text(alias, self.src).trim().to_string())
    }

    /// Recognizes `self.assertIn(s, str(<alias>.exception))`.
    fn message_check(&self, stmt: Node<'_>, alias: &str) -> Option<MessageMatch> {
        if stmt.kind() != "expression_statement" {
            return None;
        }
        let call = self.self_call(*named_children(stmt).first()?)?;
        let [needle, haystack] = call.args.as_slice() else {
            return None;
        };
        if call.method != "assertIn" {
            return None;
        }

        let haystack: String = text(*haystack, self.src)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        (haystack == format!("str({alias}.exception)")).then(|| self.message(*needle, false))
    }
}

/// Returns the `with_item` nodes of a `with` statement.
fn with_items(stmt: Node<'_>) -> Vec<Node<'_>> {
    named_children(stmt)
        .into_iter()
        .filter(|c| c.kind() == "with_clause")
        .flat_map(named_children)
        .filter(|c| c.kind() == "with_item")
        .collect()
}

/// Returns the context expression of a `with_item`, without its `as` target.
fn with_value(item: Node<'_>) -> Node<'_> {
    match item.child_by_field_name("value") {
        Some(value) if value.kind() == "as_pattern" => named_children(value).into_iter().next().unwrap_or(value),
        Some(value) => value,
        None => item,
    }
}

/// Short construct names used in diagnostics.
fn construct_name(kind: &str) -> &'static str {
    match kind {
        "for_statement" => "for",
        "while_statement" => "while",
        "if_statement" => "if",
        "try_statement" => "try",
        "match_statement" => "match",
        "with_statement" => "with",
        _ => "definition",
    }
}

/// Parses a standalone snippet of test statements and transforms it.
///
/// * `code`: statements at module level, eg. the body of a test method
pub fn transform_snippet(code: &str) -> Result<(Vec<TestStatement>, Vec<TransformIssue>)> {
    let parser = Parser::new(code.to_string())?;
    let root = parser.root_node()?;
    let mut transformer = AssertionTransformer::new(parser.code());
    let statements = transformer.transform_body(root);
    Ok((statements, transformer.into_issues()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(code: &str) -> TestStatement {
        let (mut statements, _) = transform_snippet(code).expect("parse");
        assert_eq!(statements.len(), 1, "{statements:?}");
        statements.remove(0)
    }

    #[test]
    fn equality_keeps_expected_literal() {
        let stmt = one("self.assertEqual(double(-3), -6)\n");
        assert_eq!(
            stmt,
            TestStatement::Equality {
                actual:   "double(-3)".into(),
                expected: Literal::Integer("-6".into()),
            }
        );
        assert_eq!(stmt.probe(), "print(double(-3))");
        assert_eq!(stmt.expected_output().as_deref(), Some("-6"));
    }

    #[test]
    fn equality_with_expression_compares_in_probe() {
        let stmt = one("self.assertEqual(self.calc.total(), self.expected)\n");
        assert_eq!(stmt.probe(), "print(calc.total() == expected)");
        assert_eq!(stmt.expected_output().as_deref(), Some("True"));
    }

    #[test]
    fn boolean_and_membership_forms() {
        assert_eq!(
            one("self.assertFalse(est_pair(3))\n"),
            TestStatement::Boolean {
                expr:     "est_pair(3)".into(),
                expected: false,
            }
        );
        let membership = one("self.assertIn(resultat, [6, 12, 18])\n");
        assert_eq!(membership.probe(), "print(resultat in [6, 12, 18])");
        assert_eq!(one("self.assertIsNone(x or y)\n").probe(), "print(bool((x or y) is None))");
        assert_eq!(one("self.assert_(ok)\n").expected_output().as_deref(), Some("True"));
    }

    #[test]
    fn exception_block_without_message_has_no_substring() {
        let stmt = one("with self.assertRaises(TypeError):\n    somme_doubles([1, 'deux'])\n");
        match &stmt {
            TestStatement::ExceptionExpectation { kind, body, message, .. } => {
                assert_eq!(kind, "TypeError");
                assert_eq!(body, &vec!["somme_doubles([1, 'deux'])".to_string()]);
                assert!(message.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            stmt.probe(),
            "try:\n    somme_doubles([1, 'deux'])\n    print(\"KO\")\nexcept TypeError:\n    print(\"OK\")"
        );
        assert_eq!(stmt.expected_output().as_deref(), Some("OK"));
    }

    #[test]
    fn exception_message_check_folds_into_expectation() {
        let code = "with self.assertRaises(ValueError) as context:\n    moyenne_doubles([])\nself.assertIn(\"vide\", str(context.exception))\n";
        let (statements, issues) = transform_snippet(code).expect("parse");
        assert!(issues.is_empty());
        assert_eq!(statements.len(), 1);
        match &statements[0] {
            TestStatement::ExceptionExpectation { kind, message, .. } => {
                assert_eq!(kind, "ValueError");
                let message = message.as_ref().expect("substring");
                assert_eq!(message.value, "vide");
                assert!(!message.pattern);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(statements[0].probe().contains("print(\"OK\" if \"vide\" in str(e) else \"KO\")"));
    }

    #[test]
    fn later_reads_of_the_context_bind_it_in_the_handler() {
        let code = "with self.assertRaises(ValueError) as ctx:\n    parse('x')\nself.assertEqual(str(ctx.exception), 'bad')\n";
        let (statements, issues) = transform_snippet(code).expect("parse");
        assert!(issues.is_empty());
        assert_eq!(statements.len(), 2);
        match &statements[0] {
            TestStatement::ExceptionExpectation { context, message, .. } => {
                assert_eq!(context.as_deref(), Some("ctx"));
                assert!(message.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            statements[0].probe(),
            "try:\n    parse('x')\n    print(\"KO\")\nexcept ValueError as e:\n    print(\"OK\")\n    import types\n    ctx = types.SimpleNamespace(exception=e)"
        );
        assert_eq!(statements[1].probe(), "print(str(ctx.exception))");
        assert_eq!(statements[1].expected_output().as_deref(), Some("bad"));
    }

    #[test]
    fn context_named_like_the_handler_variable_is_kept_apart() {
        let code = "with self.assertRaises(KeyError) as e:\n    d['k']\nself.assertIn('k', str(e.exception))\nprint(e.exception.args)\n";
        let (statements, _) = transform_snippet(code).expect("parse");
        assert_eq!(statements.len(), 2);
        let probe = statements[0].probe();
        assert!(probe.contains("except KeyError as _e:\n    print(\"OK\" if 'k' in str(_e) else \"KO\")"));
        assert!(probe.ends_with("e = types.SimpleNamespace(exception=_e)"));
    }

    #[test]
    fn unread_context_is_not_bound() {
        let code = "with self.assertRaises(ValueError) as ctx:\n    parse('x')\nself.assertEqual(parse('1'), 1)\n";
        let (statements, _) = transform_snippet(code).expect("parse");
        assert!(matches!(&statements[0], TestStatement::ExceptionExpectation { context: None, .. }));
        assert!(statements[0].probe().contains("except ValueError:\n"));
    }

    #[test]
    fn loose_operands_are_parenthesized() {
        assert_eq!(one("self.assertIn(a or b, c)\n").probe(), "print((a or b) in c)");
        assert_eq!(one("self.assertIn(x, y if k else z)\n").probe(), "print(x in (y if k else z))");
        assert_eq!(one("self.assertEqual(x or y, [z])\n").probe(), "print((x or y) == [z])");
        assert_eq!(one("assert (p or q) in r\n").probe(), "print((p or q) in r)");
        assert_eq!(one("self.assertEqual(f(x), 3)\n").probe(), "print(f(x))");
    }

    #[test]
    fn statements_serialize_with_their_form() {
        let code = "setup()\nself.assertEqual(f(), 1)\nself.assertCountEqual(a, b)\n";
        let (statements, _) = transform_snippet(code).expect("parse");
        let json = serde_json::to_value(&statements).expect("serialize");
        assert_eq!(json[0]["form"], "verbatim");
        assert_eq!(json[0]["code"], "setup()");
        assert_eq!(json[1]["form"], "equality");
        assert_eq!(json[1]["expected"]["kind"], "integer");
        assert_eq!(json[2]["form"], "unrecognized");
    }

    #[test]
    fn float_expectations_print_like_python() {
        let (statements, _) =
            transform_snippet("self.assertEqual(f(), 1e-3)\nself.assertEqual(g(), 1e20)\nself.assertEqual(h(), 100000000000000000.0)\n")
                .expect("parse");
        let expected: Vec<_> = statements.iter().filter_map(TestStatement::expected_output).collect();
        assert_eq!(expected, vec!["0.001", "1e+20", "1e+17"]);
    }

    #[test]
    fn call_form_of_assert_raises() {
        let stmt = one("self.assertRaises(ValueError, int, 'x', base=10)\n");
        match stmt {
            TestStatement::ExceptionExpectation { body, message, .. } => {
                assert_eq!(body, vec!["int('x', base=10)".to_string()]);
                assert!(message.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_asserts_are_recognized() {
        assert!(matches!(one("assert double(2) == 4\n"), TestStatement::Equality { .. }));
        assert!(matches!(one("assert 3 in xs\n"), TestStatement::Membership { .. }));
        assert_eq!(
            one("assert not vide(xs)\n"),
            TestStatement::Boolean {
                expr:     "vide(xs)".into(),
                expected: false,
            }
        );
    }

    #[test]
    fn plain_code_passes_through() {
        let (statements, issues) = transform_snippet("self.calc.ajouter(5)\ntotal = self.calc.resultat\n").expect("parse");
        assert_eq!(
            statements,
            vec![
                TestStatement::Verbatim {
                    code: "calc.ajouter(5)".into(),
                },
                TestStatement::Verbatim {
                    code: "total = calc.resultat".into(),
                },
            ]
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn loops_with_assertions_are_unsupported() {
        let code = "for x in [1, 2]:\n    self.assertEqual(double(x), 2 * x)\n";
        let (statements, issues) = transform_snippet(code).expect("parse");
        assert!(statements[0].is_unrecognized());
        assert!(matches!(
            &issues[0],
            TransformIssue::UnsupportedForm { construct, line: 1, .. } if construct == "for"
        ));
    }

    #[test]
    fn unknown_assertions_are_reported() {
        let (statements, issues) = transform_snippet("self.assertCountEqual(a, b)\n").expect("parse");
        assert!(statements[0].is_unrecognized());
        assert!(matches!(
            &issues[0],
            TransformIssue::UnrecognizedAssertion { method, .. } if method == "assertCountEqual"
        ));
    }
}
