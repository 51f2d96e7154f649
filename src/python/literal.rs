#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Structural model of expected values.
//!
//! Nothing is evaluated: a literal keeps the text it was written with, and
//! [`Literal::printed`] derives what `print` would show for it, only where
//! that output is fully determined by the text.

use serde::Serialize;
use tree_sitter::Node;

use super::util::{StringParts, named_children, text};

/// An expected value as written in a test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// An integer, as written (eg. `-3`, `0x1F`, `1_000`).
    Integer(String),
    /// A float, as written (eg. `2.50`, `1e-3`).
    Float(String),
    /// A string literal (or implicit concatenation of them).
    Str {
        /// The literal text, quotes and prefixes included.
        raw:   String,
        /// The decoded value.
        value: String,
    },
    /// `True` / `False`
    Bool(bool),
    /// `None`
    None,
    /// `[...]`
    List(Vec<Literal>),
    /// `(...)`
    Tuple(Vec<Literal>),
    /// `{a, b}`
    Set(Vec<Literal>),
    /// `{k: v}`
    Dict(Vec<(Literal, Literal)>),
    /// Any other expression, kept verbatim.
    Expr(String),
}

impl Literal {
    /// Reads the expression `node`.
    pub fn from_node(node: Node<'_>, src: &str) -> Self {
        let raw = text(node, src);
        match node.kind() {
            "integer" => Literal::Integer(raw.to_string()),
            "float" => Literal::Float(raw.to_string()),
            "true" => Literal::Bool(true),
            "false" => Literal::Bool(false),
            "none" => Literal::None,
            "string" => string_literal(&[node], src).unwrap_or_else(|| Literal::Expr(raw.to_string())),
            "concatenated_string" => {
                string_literal(&named_children(node), src).unwrap_or_else(|| Literal::Expr(raw.to_string()))
            }
            "parenthesized_expression" => match named_children(node).as_slice() {
                [inner] if inner.kind() != "yield" => Literal::from_node(*inner, src),
                _ => Literal::Expr(raw.to_string()),
            },
            "unary_operator" => signed_number(node, src).unwrap_or_else(|| Literal::Expr(raw.to_string())),
            "list" => Literal::List(elements(node, src)),
            "tuple" => Literal::Tuple(elements(node, src)),
            "set" => Literal::Set(elements(node, src)),
            "dictionary" => {
                let mut pairs = Vec::new();
                for child in named_children(node) {
                    if child.kind() != "pair" {
                        return Literal::Expr(raw.to_string());
                    }
                    match (child.child_by_field_name("key"), child.child_by_field_name("value")) {
                        (Some(k), Some(v)) => pairs.push((Literal::from_node(k, src), Literal::from_node(v, src))),
                        _ => return Literal::Expr(raw.to_string()),
                    }
                }
                Literal::Dict(pairs)
            }
            _ => Literal::Expr(raw.to_string()),
        }
    }

    /// Returns true if this is a literal all the way down.
    pub fn is_literal(&self) -> bool {
        match self {
            Literal::Expr(_) => false,
            Literal::List(items) | Literal::Tuple(items) | Literal::Set(items) => {
                items.iter().all(Literal::is_literal)
            }
            Literal::Dict(pairs) => pairs.iter().all(|(k, v)| k.is_literal() && v.is_literal()),
            _ => true,
        }
    }

    /// Renders the value back as source text.
    pub fn source(&self) -> String {
        match self {
            Literal::Integer(s) | Literal::Float(s) | Literal::Expr(s) => s.clone(),
            Literal::Str { raw, .. } => raw.clone(),
            Literal::Bool(b) => python_bool(*b).to_string(),
            Literal::None => "None".to_string(),
            Literal::List(items) => format!("[{}]", join(items, Literal::source)),
            Literal::Tuple(items) => tuple(items, Literal::source),
            Literal::Set(items) => format!("{{{}}}", join(items, Literal::source)),
            Literal::Dict(pairs) => format!(
                "{{{}}}",
                pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.source(), v.source()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Returns what `print(value)` writes, or `None` when that depends on
    /// evaluation (expressions, sets, byte strings).
    pub fn printed(&self) -> Option<String> {
        match self {
            Literal::Str { value, .. } => Some(value.clone()),
            other => other.repr(),
        }
    }

    /// Returns `repr(value)`, or `None` when that depends on evaluation.
    pub fn repr(&self) -> Option<String> {
        let joined = |items: &[Literal]| -> Option<String> {
            Some(items.iter().map(Literal::repr).collect::<Option<Vec<_>>>()?.join(", "))
        };

        match self {
            Literal::Integer(s) => integer_repr(s),
            Literal::Float(s) => float_repr(s),
            Literal::Str { value, .. } => Some(string_repr(value)),
            Literal::Bool(b) => Some(python_bool(*b).to_string()),
            Literal::None => Some("None".to_string()),
            Literal::List(items) => Some(format!("[{}]", joined(items)?)),
            Literal::Tuple(items) => match items.as_slice() {
                [single] => Some(format!("({},)", single.repr()?)),
                _ => Some(format!("({})", joined(items)?)),
            },
            Literal::Dict(pairs) => {
                let rendered = pairs
                    .iter()
                    .map(|(k, v)| Some(format!("{}: {}", k.repr()?, v.repr()?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(format!("{{{}}}", rendered.join(", ")))
            }
            Literal::Set(_) | Literal::Expr(_) => None,
        }
    }
}

/// Python spelling of a boolean.
fn python_bool(b: bool) -> &'static str {
    if b { "True" } else { "False" }
}

/// Joins rendered items with `, `.
fn join(items: &[Literal], render: fn(&Literal) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(", ")
}

/// Renders a tuple, with the trailing comma a single element needs.
fn tuple(items: &[Literal], render: fn(&Literal) -> String) -> String {
    match items {
        [single] => format!("({},)", render(single)),
        _ => format!("({})", join(items, render)),
    }
}

/// Reads the elements of a list, tuple or set; splats and comprehensions
/// become [`Literal::Expr`].
fn elements(node: Node<'_>, src: &str) -> Vec<Literal> {
    named_children(node)
        .into_iter()
        .filter(|c| c.kind() != "comment")
        .map(|c| Literal::from_node(c, src))
        .collect()
}

/// Folds `-5` / `+2.0` into a single number.
fn signed_number(node: Node<'_>, src: &str) -> Option<Literal> {
    let operator = node.child_by_field_name("operator")?;
    let argument = node.child_by_field_name("argument")?;
    let sign = match text(operator, src) {
        "-" => "-",
        "+" => "",
        _ => return None,
    };

    match Literal::from_node(argument, src) {
        Literal::Integer(s) if !s.starts_with('-') => Some(Literal::Integer(format!("{sign}{s}"))),
        Literal::Float(s) if !s.starts_with('-') => Some(Literal::Float(format!("{sign}{s}"))),
        _ => None,
    }
}

/// Builds a string literal from one or more adjacent string nodes. Byte
/// strings and f-strings are not literal values.
fn string_literal(parts: &[Node<'_>], src: &str) -> Option<Literal> {
    let raw = match parts {
        [first, .., last] => src.get(first.start_byte()..last.end_byte())?,
        [only] => text(*only, src),
        [] => return None,
    };

    let mut value = String::new();
    for part in parts {
        let split = StringParts::split(text(*part, src))?;
        if split.is_bytes() || split.is_formatted() {
            return None;
        }
        if split.is_raw() {
            value.push_str(split.content);
        } else {
            value.push_str(&unescape(split.content));
        }
    }

    Some(Literal::Str {
        raw: raw.to_string(),
        value,
    })
}

/// Decodes the backslash escapes of a non-raw string body.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            out.push('\\');
            break;
        };
        match escaped {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            '0'..='7' => {
                let mut digits = escaped.to_string();
                while digits.len() < 3 && chars.peek().is_some_and(|d| ('0'..='7').contains(d)) {
                    digits.extend(chars.next());
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            'x' | 'u' | 'U' => {
                let width = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => out.push(decoded),
                    _ => {
                        out.push('\\');
                        out.push(escaped);
                        out.push_str(&digits);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

/// `repr` of a string: single quotes unless the value holds a single quote
/// and no double quote.
fn string_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Printed form of an integer literal: underscores dropped, non-decimal
/// bases converted. `None` for imaginary literals and non-decimal values too
/// wide to convert.
fn integer_repr(raw: &str) -> Option<String> {
    let cleaned = raw.replace('_', "");
    if cleaned.contains(['j', 'J']) {
        return None;
    }
    let (sign, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", cleaned.as_str()),
    };

    let lower = digits.to_ascii_lowercase();
    let radix = match lower.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let value = match radix {
        Some(radix) => Some(u128::from_str_radix(&lower[2..], radix).ok()?),
        None => lower.parse::<u128>().ok(),
    };

    match value {
        Some(0) => Some("0".to_string()),
        Some(v) => Some(format!("{sign}{v}")),
        // wide decimals print as written
        None => Some(cleaned),
    }
}

/// Printed form of a float literal, following `repr(float)`: the shortest
/// digits that round-trip, positional between `1e-4` and `1e16`, scientific
/// with a signed two-digit exponent otherwise. `None` for complex literals
/// and values that overflow.
fn float_repr(raw: &str) -> Option<String> {
    let cleaned = raw.replace('_', "");
    if cleaned.contains(['j', 'J']) {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let sign = if value.is_sign_negative() { "-" } else { "" };
    if value == 0.0 {
        return Some(format!("{sign}0.0"));
    }

    // shortest round-trip digits, as `d.ddde<exp>`
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    let digits = mantissa.replace('.', "");

    if !(-4..16).contains(&exponent) {
        let (first, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() { String::new() } else { format!(".{rest}") };
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return Some(format!("{sign}{first}{fraction}e{exp_sign}{:02}", exponent.abs()));
    }

    let rendered = if exponent < 0 {
        let zeros = "0".repeat((-exponent - 1) as usize);
        format!("0.{zeros}{digits}")
    } else {
        let point = exponent as usize + 1;
        if digits.len() > point {
            format!("{}.{}", &digits[..point], &digits[point..])
        } else {
            format!("{digits}{}.0", "0".repeat(point - digits.len()))
        }
    };
    Some(format!("{sign}{rendered}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::python::{Parser, util::statements};

    fn literal(expr: &str) -> Literal {
        let code = format!("{expr}\n");
        let parser = Parser::new(code.clone()).expect("parse");
        let root = parser.root_node().expect("root");
        let stmt = statements(root)[0];
        let node = named_children(stmt)[0];
        Literal::from_node(node, &code)
    }

    #[test]
    fn reads_scalars_as_written() {
        assert_eq!(literal("-6"), Literal::Integer("-6".into()));
        assert_eq!(literal("2.50"), Literal::Float("2.50".into()));
        assert_eq!(literal("True"), Literal::Bool(true));
        assert_eq!(literal("None"), Literal::None);
        assert_eq!(literal("(10)"), Literal::Integer("10".into()));
    }

    #[test]
    fn source_round_trips_text() {
        for text in ["-6", "2.50", "'it''s'", "[1, 'a', None]", "(1,)", "{'k': [True, 0x1F]}"] {
            assert_eq!(literal(text).source(), text);
        }
    }

    #[test]
    fn printed_form_matches_python_print() {
        assert_eq!(literal("5.0").printed().as_deref(), Some("5.0"));
        assert_eq!(literal("2.50").printed().as_deref(), Some("2.5"));
        assert_eq!(literal(".5").printed().as_deref(), Some("0.5"));
        assert_eq!(literal("1_000").printed().as_deref(), Some("1000"));
        assert_eq!(literal("0x1F").printed().as_deref(), Some("31"));
        assert_eq!(literal("'vide'").printed().as_deref(), Some("vide"));
        assert_eq!(literal(r#""a\tb""#).printed().as_deref(), Some("a\tb"));
        assert_eq!(literal("['a', \"it's\", 2]").printed().as_deref(), Some(r#"['a', "it's", 2]"#));
        assert_eq!(literal("(1,)").printed().as_deref(), Some("(1,)"));
        assert_eq!(literal("{'a': 1.50}").printed().as_deref(), Some("{'a': 1.5}"));
    }

    #[test]
    fn floats_print_like_python_repr() {
        let printed = |text: &str| literal(text).printed();
        assert_eq!(printed("1e-3").as_deref(), Some("0.001"));
        assert_eq!(printed("1e20").as_deref(), Some("1e+20"));
        assert_eq!(printed("1E16").as_deref(), Some("1e+16"));
        assert_eq!(printed("100000000000000000.0").as_deref(), Some("1e+17"));
        assert_eq!(printed("9999999999999998.0").as_deref(), Some("9999999999999998.0"));
        assert_eq!(printed("1.5e-7").as_deref(), Some("1.5e-07"));
        assert_eq!(printed("0.0001").as_deref(), Some("0.0001"));
        assert_eq!(printed("0.00001").as_deref(), Some("1e-05"));
        assert_eq!(printed("2.5e3").as_deref(), Some("2500.0"));
        assert_eq!(printed("-1_234.5_0").as_deref(), Some("-1234.5"));
        assert_eq!(printed("0.1000000000000000000001").as_deref(), Some("0.1"));
        assert_eq!(printed("3.14159265358979323846").as_deref(), Some("3.141592653589793"));
        assert_eq!(printed("-0.0").as_deref(), Some("-0.0"));
        assert_eq!(printed("0e0").as_deref(), Some("0.0"));
    }

    #[test]
    fn unrepresentable_numbers_have_no_printed_form() {
        assert!(literal("1e400").printed().is_none());
        assert!(literal("2j").printed().is_none());
        assert!(literal("0x1_0000_0000_0000_0000_0000_0000_0000_0000").printed().is_none());
        assert_eq!(
            literal("123456789012345678901234567890123456789012").printed().as_deref(),
            Some("123456789012345678901234567890123456789012")
        );
    }

    #[test]
    fn expressions_have_no_printed_form() {
        assert_eq!(literal("double(2)"), Literal::Expr("double(2)".into()));
        assert!(literal("{1, 2}").printed().is_none());
        assert!(literal("[x, 1]").printed().is_none());
        assert!(!literal("[x, 1]").is_literal());
        assert!(literal("f'{x}'").printed().is_none());
        assert!(literal("b'x'").printed().is_none());
    }

    #[test]
    fn unescapes_common_sequences() {
        assert_eq!(unescape(r"a\nb\\c\'\x41é\101"), "a\nb\\c'AéA");
        assert_eq!(unescape(r"\q"), "\\q");
    }
}
