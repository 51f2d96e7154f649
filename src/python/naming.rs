#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The naming convention tying a unittest class to the declaration it tests.
//!
//! `TestFeetToMeter` and `Test_feet_to_meter` both test `feet_to_meter`;
//! `TestCalculatrice` and `Test_Calculatrice` test the class `Calculatrice`.

use serde::Serialize;
use thiserror::Error;

use super::declarations::{Declaration, DeclarationKind, Module};
use crate::constants::{TEST_GROUP_PREFIX, TEST_GROUP_SEPARATOR};

/// A test group whose name does not lead to any declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("Test group `{group}` (line {line}) does not match any declaration{}", expected_hint(.expected))]
pub struct BindingError {
    /// The test group's class name.
    pub group:    String,
    /// Candidate names derived from it, if the prefix was present.
    pub expected: Vec<String>,
    /// 1-based line of the class.
    pub line:     usize,
}

/// Formats the candidate names for the error message.
fn expected_hint(expected: &[String]) -> String {
    if expected.is_empty() {
        format!(" (name must start with `{TEST_GROUP_PREFIX}`)")
    } else {
        format!(" (looked for `{}`)", expected.join("` or `"))
    }
}

/// Strips the group prefix and optional separator, eg. `Test_Foo` → `Foo`.
/// Returns `None` if the prefix is missing or nothing follows it.
pub fn target_name(group: &str) -> Option<&str> {
    let rest = group.strip_prefix(TEST_GROUP_PREFIX)?;
    let rest = rest.strip_prefix(TEST_GROUP_SEPARATOR).unwrap_or(rest);
    (!rest.is_empty()).then_some(rest)
}

/// Converts a compound-word identifier into underscore-separated lowercase,
/// eg. `FeetToMeter` → `feet_to_meter`, `HTTPResponse` → `http_response`.
///
/// Words start at an uppercase letter followed by lowercase letters, and at
/// any uppercase letter that follows a lowercase letter or digit.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();

    // Break before capitalized words; a break consumes the word, so the next
    // one can only start after it.
    let mut words = Vec::with_capacity(chars.len() + 4);
    let mut resume = 0;
    for (i, &c) in chars.iter().enumerate() {
        let capitalized = c.is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
        if i > resume && capitalized {
            words.push('_');
            resume = i + 1 + chars[i + 1..]
                .iter()
                .take_while(|n| n.is_ascii_lowercase())
                .count();
        }
        words.push(c);
    }

    // Break between a lowercase letter or digit and an uppercase letter.
    let mut out = String::with_capacity(words.len() + 4);
    for (i, &c) in words.iter().enumerate() {
        if i > 0
            && c.is_ascii_uppercase()
            && (words[i - 1].is_ascii_lowercase() || words[i - 1].is_ascii_digit())
        {
            out.push('_');
        }
        out.push(c);
    }

    out.to_lowercase()
}

/// Finds the declaration a test group named `group` tests.
///
/// Functions match on the underscore-separated form of the name, classes on
/// the name exactly as written. There is no fuzzy matching.
///
/// * `group`: the test class name
/// * `line`: line of the test class, for the error
/// * `module`: the analyzed source module
pub fn bind_group<'m>(group: &str, line: usize, module: &'m Module) -> Result<&'m Declaration, BindingError> {
    let Some(target) = target_name(group) else {
        return Err(BindingError {
            group: group.to_string(),
            expected: Vec::new(),
            line,
        });
    };

    let snake = to_snake_case(target);
    let found = module.declarations().iter().find(|d| match d.kind() {
        DeclarationKind::Callable => d.name() == snake,
        DeclarationKind::StructuredType => d.name() == target,
    });

    found.ok_or_else(|| {
        let mut expected = vec![snake.clone()];
        if snake != target {
            expected.push(target.to_string());
        }
        BindingError {
            group: group.to_string(),
            expected,
            line,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_separator() {
        assert_eq!(target_name("TestDouble"), Some("Double"));
        assert_eq!(target_name("Test_Calculatrice"), Some("Calculatrice"));
        assert_eq!(target_name("Test"), None);
        assert_eq!(target_name("DoubleTests"), None);
    }

    #[test]
    fn converts_compound_words() {
        assert_eq!(to_snake_case("FeetToMeter"), "feet_to_meter");
        assert_eq!(to_snake_case("SommeDoubles"), "somme_doubles");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("HTTPResponse"), "http_response");
        assert_eq!(to_snake_case("GetHTTPResponseCode"), "get_http_response_code");
        assert_eq!(to_snake_case("Area2D"), "area2_d");
        assert_eq!(to_snake_case("AaBbCc"), "aa_bb_cc");
        assert_eq!(to_snake_case("Double"), "double");
    }

    #[test]
    fn binds_functions_and_classes_exactly() {
        let code = "def somme_doubles(a, b):\n    pass\n\n\nclass Calculatrice:\n    pass\n\n\ndef double2(x):\n    pass\n";
        let module = Module::extract("m.py", code).expect("extract");

        let bound = bind_group("TestSommeDoubles", 1, &module).expect("bound");
        assert_eq!(bound.name(), "somme_doubles");
        let bound = bind_group("Test_Calculatrice", 1, &module).expect("bound");
        assert_eq!(bound.name(), "Calculatrice");
        let bound = bind_group("Test_somme_doubles", 1, &module).expect("bound");
        assert_eq!(bound.name(), "somme_doubles");
    }

    #[test]
    fn near_misses_are_binding_errors() {
        let code = "def double2(x):\n    pass\n\n\nclass Calculatrice:\n    pass\n";
        let module = Module::extract("m.py", code).expect("extract");

        let err = bind_group("TestDouble", 7, &module).expect_err("no match");
        assert_eq!(err.expected, vec!["double", "Double"]);
        assert_eq!(err.line, 7);

        assert!(bind_group("TestDouble3", 1, &module).is_err());
        assert!(bind_group("TestCalculatrices", 1, &module).is_err());
        assert!(bind_group("CalculatriceTest", 1, &module).is_err());
    }
}
