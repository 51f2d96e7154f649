#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Run configuration, loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration. Values are pass-through metadata for the quiz
//! writer; the analysis never interprets them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{CONFIG_ENV, DEFAULT_CONFIG_FILE};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiz category the questions land in.
    pub category:   CategoryConfig,
    /// CodeRunner question options.
    pub coderunner: CodeRunnerConfig,
    /// How question templates are assembled.
    pub template:   TemplateConfig,
    /// Per test case options.
    pub testcase:   TestCaseConfig,
    /// Question text options.
    pub question:   QuestionConfig,
    /// Log verbosity for the command line tool.
    pub logging:    LoggingConfig,
    /// Tags attached to every question.
    pub tags:       Vec<String>,
}

/// Quiz category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Category path, eg. `$course$/top/Python`.
    pub path:        String,
    /// Fallback description when the module has no docstring.
    pub info:        String,
    /// Format of `info`.
    pub info_format: String,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            path:        "$course$/top/Python".to_string(),
            info:        String::new(),
            info_format: "html".to_string(),
        }
    }
}

/// CodeRunner question options, written as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeRunnerConfig {
    /// Question type, eg. `python3`.
    #[serde(rename = "type")]
    pub kind:                         String,
    /// Prototype type (0 = normal question).
    #[serde(alias = "prototypetype")]
    pub prototype_type:               u8,
    /// Whether every test must pass for any mark.
    #[serde(alias = "allornothing")]
    pub all_or_nothing:               u8,
    /// Penalty regime, eg. `10, 20, ...`.
    #[serde(alias = "penaltyregime")]
    pub penalty_regime:               String,
    /// Whether a precheck button is shown.
    pub precheck:                     u8,
    /// Whether the check button is hidden.
    #[serde(alias = "hidecheck")]
    pub hide_check:                   u8,
    /// Whether template source is shown.
    #[serde(alias = "showsource")]
    pub show_source:                  u8,
    /// Answer box height.
    #[serde(alias = "answerboxlines")]
    pub answer_box_lines:             u32,
    /// Answer box width.
    #[serde(alias = "answerboxcolumns")]
    pub answer_box_columns:           u32,
    /// Whether the reference answer is validated on save.
    #[serde(alias = "validateonsave")]
    pub validate_on_save:             u8,
    /// Feedback display mode.
    #[serde(alias = "displayfeedback")]
    pub display_feedback:             u8,
    /// Whether students may give up.
    #[serde(alias = "giveupallowed")]
    pub give_up_allowed:              u8,
    /// Whether template parameters are hoisted.
    #[serde(alias = "hoisttemplateparams")]
    pub hoist_template_params:        u8,
    /// Whether code is extracted from JSON answers.
    #[serde(alias = "extractcodefromjson")]
    pub extract_code_from_json:       u8,
    /// Template parameter language.
    #[serde(alias = "templateparamslang")]
    pub template_params_lang:         String,
    /// Whether template parameters are evaluated per try.
    #[serde(alias = "templateparamsevalpertry")]
    pub template_params_eval_per_try: u8,
    /// Evaluated template parameters.
    #[serde(alias = "templateparamsevald")]
    pub template_params_evald:        String,
    /// Whether Twig expands every field.
    #[serde(alias = "twigall")]
    pub twig_all:                     u8,
    /// Marks for the question.
    #[serde(alias = "defaultgrade")]
    pub default_grade:                f64,
    /// Penalty per wrong try.
    pub penalty:                      f64,
}

impl Default for CodeRunnerConfig {
    fn default() -> Self {
        Self {
            kind:                         "python3".to_string(),
            prototype_type:               0,
            all_or_nothing:               1,
            penalty_regime:               "10, 20, ...".to_string(),
            precheck:                     0,
            hide_check:                   0,
            show_source:                  0,
            answer_box_lines:             18,
            answer_box_columns:           100,
            validate_on_save:             1,
            display_feedback:             1,
            give_up_allowed:              0,
            hoist_template_params:        1,
            extract_code_from_json:       1,
            template_params_lang:         "None".to_string(),
            template_params_eval_per_try: 0,
            template_params_evald:        "{}".to_string(),
            twig_all:                     0,
            default_grade:                1.0,
            penalty:                      0.0,
        }
    }
}

/// Template assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Prepend the source of every dependency.
    pub include_dependencies: bool,
    /// Prepend the module imports the question's code needs.
    pub include_imports:      bool,
    /// Per-test Twig template appended after the dependencies.
    #[serde(alias = "twig_template")]
    pub twig:                 String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            include_dependencies: true,
            include_imports:      true,
            twig:                 "{{ STUDENT_ANSWER }}\n\n{{ TEST.testcode }}\n".to_string(),
        }
    }
}

/// Test case options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCaseConfig {
    /// Display mode of the visible example.
    pub display:           String,
    /// Display mode of the other cases.
    pub hidden_display:    String,
    /// CodeRunner test type.
    #[serde(alias = "testtype")]
    pub test_type:         u8,
    /// Whether later tests are hidden after a failure.
    #[serde(alias = "hiderestiffail")]
    pub hide_rest_if_fail: u8,
    /// Marks per case.
    pub mark:              f64,
}

impl Default for TestCaseConfig {
    fn default() -> Self {
        Self {
            display:           "SHOW".to_string(),
            hidden_display:    "HIDE".to_string(),
            test_type:         0,
            hide_rest_if_fail: 0,
            mark:              1.0,
        }
    }
}

/// Question text options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionConfig {
    /// HTML introduction; `{name}` and `{kind}` are substituted.
    pub intro:             String,
    /// Append the declaration's docstring as preformatted text.
    pub include_docstring: bool,
}

impl Default for QuestionConfig {
    fn default() -> Self {
        Self {
            intro:             "<p>Implement the {kind} <em>{name}</em> below.</p>".to_string(),
            include_docstring: true,
        }
    }
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `ERROR`, `WARN`, `INFO`, `DEBUG`, `TRACE`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
        }
    }
}

impl Config {
    /// Parses a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse configuration YAML")
    }

    /// Reads a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Loads the configuration for a run.
    ///
    /// An explicit `path` must exist. Otherwise the file named by
    /// `PYQUIZ_CONFIG` is used, then `config.yaml` in the working directory
    /// if present, then the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let chosen = match path {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| {
                    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                    local.is_file().then_some(local)
                }),
        };

        match chosen {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                Self::from_file(&path)
            }
            None => {
                debug!("using built-in configuration");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Config::from_yaml_str("").expect("parse"), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let yaml = r#"
category:
  path: "$course$/top/Algo"
coderunner:
  type: python3_w_input
  answerboxlines: 30
tags: [python, week1]
"#;
        let config = Config::from_yaml_str(yaml).expect("parse");
        assert_eq!(config.category.path, "$course$/top/Algo");
        assert_eq!(config.category.info_format, "html");
        assert_eq!(config.coderunner.kind, "python3_w_input");
        assert_eq!(config.coderunner.answer_box_lines, 30);
        assert_eq!(config.coderunner.answer_box_columns, 100);
        assert_eq!(config.tags, vec!["python", "week1"]);
        assert!(config.template.include_dependencies);
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(Config::from_yaml_str("category: [unclosed").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let missing = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/does-not-exist.yaml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
