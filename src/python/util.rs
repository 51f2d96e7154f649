#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Helpers for walking tree-sitter Python nodes and rendering their text.

use tree_sitter::Node;

use super::literal::Literal;

/// Returns the named children of `node`, in order.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Returns the statements of a block (or module), skipping comments.
pub(crate) fn statements(block: Node<'_>) -> Vec<Node<'_>> {
    named_children(block)
        .into_iter()
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Returns the source text spanned by `node`.
pub(crate) fn text<'s>(node: Node<'_>, src: &'s str) -> &'s str {
    src.get(node.byte_range()).unwrap_or_default()
}

/// Returns the 1-based line `node` starts on.
pub(crate) fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Returns true if `stmt` is an expression statement holding a lone string,
/// possibly an implicit concatenation.
pub(crate) fn is_string_statement(stmt: Node<'_>) -> bool {
    if stmt.kind() != "expression_statement" {
        return false;
    }
    let children = named_children(stmt);
    children.len() == 1 && matches!(children[0].kind(), "string" | "concatenated_string")
}

/// Returns the cleaned docstring of a module or block, if its first statement
/// is a string. Escapes are decoded before cleaning; byte strings and
/// f-strings are not docstrings.
pub fn docstring(block: Node<'_>, src: &str) -> Option<String> {
    let first = statements(block).into_iter().next()?;
    if !is_string_statement(first) {
        return None;
    }
    let node = named_children(first).into_iter().next()?;
    match Literal::from_node(node, src) {
        Literal::Str { value, .. } => Some(clean_docstring(&value)),
        _ => None,
    }
}

/// A Python string literal split into prefix, delimiter and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringParts<'s> {
    /// Prefix letters such as `r`, `b`, `f`, `u` (possibly empty).
    pub prefix:  &'s str,
    /// The delimiter: one of `'`, `"`, `'''`, `"""`.
    pub quote:   &'s str,
    /// Text between the delimiters, exactly as written.
    pub content: &'s str,
}

impl<'s> StringParts<'s> {
    /// Splits a literal like `r"""..."""`; returns `None` if `raw` is not a
    /// single string literal.
    pub fn split(raw: &'s str) -> Option<Self> {
        let quote_at = raw.find(['\'', '"'])?;
        let (prefix, rest) = raw.split_at(quote_at);
        if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let quote = ["\"\"\"", "'''", "\"", "'"]
            .into_iter()
            .find(|q| rest.starts_with(q))?;
        if rest.len() < quote.len() * 2 || !rest.ends_with(quote) {
            return None;
        }

        Some(Self {
            prefix,
            quote,
            content: &rest[quote.len()..rest.len() - quote.len()],
        })
    }

    /// Returns true for raw strings, whose escapes are not processed.
    pub fn is_raw(&self) -> bool {
        self.prefix.contains(['r', 'R'])
    }

    /// Returns true for byte strings.
    pub fn is_bytes(&self) -> bool {
        self.prefix.contains(['b', 'B'])
    }

    /// Returns true for f-strings.
    pub fn is_formatted(&self) -> bool {
        self.prefix.contains(['f', 'F'])
    }
}

/// Normalizes docstring indentation the way Python's `inspect.cleandoc`
/// does: tabs are expanded, the first line is stripped, the common margin of
/// the remaining lines is removed, and leading/trailing blank lines are
/// dropped. Only spaces count as margin.
pub fn clean_docstring(raw: &str) -> String {
    let lines: Vec<String> = raw.lines().map(expand_tabs).collect();
    let leading = |line: &str| line.len() - line.trim_start_matches(' ').len();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim_start_matches(' ').is_empty())
        .map(|l| leading(l.as_str()))
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            cleaned.push(line.trim().to_string());
        } else {
            let cut = margin.min(leading(line.as_str()));
            cleaned.push(line[cut..].trim_end().to_string());
        }
    }

    while cleaned.first().is_some_and(|l| l.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}

/// Expands tabs to the next multiple of eight columns.
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let width = 8 - column % 8;
            out.extend(std::iter::repeat_n(' ', width));
            column += width;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Renders a statement or expression with every `receiver.` prefix removed
/// (eg. `self.calc.add(1)` becomes `calc.add(1)`), and continuation lines
/// dedented so the text starts at column zero.
///
/// * `node`: the node to render
/// * `src`: the source the node was parsed from
/// * `receiver`: the receiver name to strip, usually `self`
pub fn render_detached(node: Node<'_>, src: &str, receiver: &str) -> String {
    let mut cuts = Vec::new();
    collect_receiver_cuts(node, src, receiver, &mut cuts);
    cuts.sort_unstable();

    let mut out = String::new();
    let mut at = node.start_byte();
    for (start, end) in cuts {
        out.push_str(src.get(at..start).unwrap_or_default());
        at = end;
    }
    out.push_str(src.get(at..node.end_byte()).unwrap_or_default());

    dedent_continuation(&out, node.start_position().column)
}

/// Records the byte range of each `receiver.` prefix found under `node`.
fn collect_receiver_cuts(node: Node<'_>, src: &str, receiver: &str, cuts: &mut Vec<(usize, usize)>) {
    if node.kind() == "attribute"
        && let (Some(object), Some(attribute)) =
            (node.child_by_field_name("object"), node.child_by_field_name("attribute"))
        && object.kind() == "identifier"
        && text(object, src) == receiver
    {
        cuts.push((object.start_byte(), attribute.start_byte()));
        return;
    }

    for child in named_children(node) {
        collect_receiver_cuts(child, src, receiver, cuts);
    }
}

/// Removes up to `column` leading spaces from every line after the first.
fn dedent_continuation(text: &str, column: usize) -> String {
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        let leading = line.len() - line.trim_start_matches(' ').len();
        out.push('\n');
        out.push_str(&line[leading.min(column)..]);
    }
    out
}

/// Prefixes every non-empty line of `text` with `indent`.
pub(crate) fn indent(text: &str, indent: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
