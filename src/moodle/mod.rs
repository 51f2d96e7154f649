#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Moodle XML quiz writer for CodeRunner questions.
//!
//! A document holds one `category` question followed by one `coderunner`
//! question per composed record. Code goes into CDATA; everything else is
//! escaped text.

/// Element-level XML writing.
pub mod xml;

use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::escape::escape;
use tracing::{debug, info};

use self::xml::XmlWriter;
use crate::{
    compose::{ComposedCase, ComposedRecord},
    config::Config,
    constants::BLOCK_SEPARATOR,
    python::DeclarationKind,
};

/// Writes quiz documents using a run's configuration.
pub struct QuizWriter<'c> {
    /// Pass-through question settings.
    config: &'c Config,
}

impl<'c> QuizWriter<'c> {
    /// Creates a writer for `config`.
    pub fn new(config: &'c Config) -> Self {
        Self { config }
    }

    /// Renders the document. `module_doc` becomes the category description,
    /// falling back to the configured one.
    pub fn render(&self, records: &[ComposedRecord], module_doc: Option<&str>) -> Result<String> {
        let mut xml = XmlWriter::new()?;
        xml.open("quiz", &[])?;
        self.category(&mut xml, module_doc)?;
        for record in records {
            debug!(question = record.name(), cases = record.cases().len(), "writing question");
            self.question(&mut xml, record)?;
        }
        xml.close("quiz")?;
        xml.finish()
    }

    /// Renders the document to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path, records: &[ComposedRecord], module_doc: Option<&str>) -> Result<()> {
        let document = self.render(records, module_doc)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create directory {}", parent.display()))?;
        }
        std::fs::write(path, document).with_context(|| format!("Could not write {}", path.display()))?;
        info!(path = %path.display(), questions = records.len(), "wrote quiz");
        Ok(())
    }

    /// Writes the category pseudo-question.
    fn category(&self, xml: &mut XmlWriter, module_doc: Option<&str>) -> Result<()> {
        let category = &self.config.category;
        let info = module_doc.unwrap_or(&category.info);

        xml.open("question", &[("type", "category")])?;
        xml.wrapped_text("category", &[], &category.path)?;
        xml.wrapped_text("info", &[("format", category.info_format.as_str())], info)?;
        xml.text("idnumber", "")?;
        xml.close("question")
    }

    /// Writes one CodeRunner question.
    fn question(&self, xml: &mut XmlWriter, record: &ComposedRecord) -> Result<()> {
        let cr = &self.config.coderunner;

        xml.open("question", &[("type", "coderunner")])?;
        xml.wrapped_text("name", &[], record.name())?;
        xml.wrapped_cdata("questiontext", &[("format", "html")], &self.question_text(record))?;
        xml.wrapped_text("generalfeedback", &[("format", "html")], "")?;
        xml.text("defaultgrade", &format!("{:?}", cr.default_grade))?;
        xml.text("penalty", &format!("{:?}", cr.penalty))?;
        xml.text("hidden", "0")?;
        xml.text("idnumber", "")?;

        xml.text("coderunnertype", &cr.kind)?;
        xml.text("prototypetype", &cr.prototype_type.to_string())?;
        xml.text("allornothing", &cr.all_or_nothing.to_string())?;
        xml.text("penaltyregime", &cr.penalty_regime)?;
        xml.text("precheck", &cr.precheck.to_string())?;
        xml.text("hidecheck", &cr.hide_check.to_string())?;
        xml.text("showsource", &cr.show_source.to_string())?;
        xml.text("answerboxlines", &cr.answer_box_lines.to_string())?;
        xml.text("answerboxcolumns", &cr.answer_box_columns.to_string())?;
        xml.cdata("answerpreload", &answer_preload(record))?;
        xml.text("globalextra", "")?;
        xml.text("useace", "")?;
        xml.text("resultcolumns", "")?;

        xml.cdata("template", &self.template(record))?;
        xml.text("iscombinatortemplate", "")?;
        xml.text("allowmultiplestdins", "")?;
        xml.cdata("answer", record.source())?;
        xml.text("validateonsave", &cr.validate_on_save.to_string())?;
        xml.text("testsplitterre", "")?;
        xml.text("language", "")?;
        xml.text("acelang", "")?;
        xml.text("sandbox", "")?;
        xml.text("grader", "")?;
        xml.text("cputimelimitsecs", "")?;
        xml.text("memlimitmb", "")?;
        xml.text("sandboxparams", "")?;
        xml.text("templateparams", "")?;
        xml.text("hoisttemplateparams", &cr.hoist_template_params.to_string())?;
        xml.text("extractcodefromjson", &cr.extract_code_from_json.to_string())?;
        xml.text("templateparamslang", &cr.template_params_lang)?;
        xml.text("templateparamsevalpertry", &cr.template_params_eval_per_try.to_string())?;
        xml.text("templateparamsevald", &cr.template_params_evald)?;
        xml.text("twigall", &cr.twig_all.to_string())?;
        xml.text("uiplugin", "")?;
        xml.text("uiparameters", "")?;
        xml.text("attachments", "0")?;
        xml.text("attachmentsrequired", "0")?;
        xml.text("maxfilesize", "10240")?;
        xml.text("filenamesregex", "")?;
        xml.text("filenamesexplain", "")?;
        xml.text("displayfeedback", &cr.display_feedback.to_string())?;
        xml.text("giveupallowed", &cr.give_up_allowed.to_string())?;
        xml.text("prototypeextra", "")?;

        xml.open("testcases", &[])?;
        for case in record.cases() {
            self.testcase(xml, case)?;
        }
        xml.close("testcases")?;

        xml.open("tags", &[])?;
        for tag in &self.config.tags {
            xml.wrapped_text("tag", &[], tag)?;
        }
        xml.close("tags")?;

        xml.close("question")
    }

    /// Writes one test case.
    fn testcase(&self, xml: &mut XmlWriter, case: &ComposedCase) -> Result<()> {
        let tc = &self.config.testcase;
        let test_type = tc.test_type.to_string();
        let hide_rest = tc.hide_rest_if_fail.to_string();
        let mark = format!("{:.7}", tc.mark);
        let display = if case.visible() { &tc.display } else { &tc.hidden_display };

        xml.open(
            "testcase",
            &[
                ("testtype", test_type.as_str()),
                ("useasexample", if case.visible() { "1" } else { "0" }),
                ("hiderestiffail", hide_rest.as_str()),
                ("mark", mark.as_str()),
            ],
        )?;
        xml.wrapped_cdata("testcode", &[], case.code())?;
        xml.wrapped_text("stdin", &[], "")?;
        xml.wrapped_text("expected", &[], case.expected())?;
        xml.wrapped_text("extra", &[], "")?;
        xml.wrapped_text("display", &[], display)?;
        xml.close("testcase")
    }

    /// HTML statement: the configured introduction, then the docstring as
    /// preformatted text.
    fn question_text(&self, record: &ComposedRecord) -> String {
        let question = &self.config.question;
        let mut html = question
            .intro
            .replace("{name}", &escape(record.name()))
            .replace("{kind}", kind_label(record.kind()));
        if question.include_docstring && !record.statement().is_empty() {
            html.push_str("\n<pre>");
            html.push_str(&escape(record.statement()));
            html.push_str("</pre>");
        }
        html
    }

    /// CodeRunner template: dependencies, then the per-test Twig template.
    fn template(&self, record: &ComposedRecord) -> String {
        let twig = &self.config.template.twig;
        let preamble = record.preamble();
        if preamble.is_empty() {
            twig.clone()
        } else {
            format!("{preamble}{BLOCK_SEPARATOR}{twig}")
        }
    }
}

/// Word used for a declaration kind in question text.
fn kind_label(kind: DeclarationKind) -> &'static str {
    match kind {
        DeclarationKind::Callable => "function",
        DeclarationKind::StructuredType => "class",
    }
}

/// Editor preload: the declaration's header line and its docstring, with a
/// body left for the student.
fn answer_preload(record: &ComposedRecord) -> String {
    let keyword = match record.kind() {
        DeclarationKind::Callable => "def",
        DeclarationKind::StructuredType => "class",
    };
    let header = match record.kind() {
        DeclarationKind::Callable => format!("{keyword} {}{}:", record.name(), record.signature()),
        DeclarationKind::StructuredType => format!("{keyword} {}:", record.name()),
    };
    if record.statement().is_empty() {
        format!("{header}\n    pass\n")
    } else {
        let doc = record.statement().replace("\"\"\"", "\\\"\\\"\\\"");
        let doc = doc.lines().collect::<Vec<_>>().join("\n    ");
        format!("{header}\n    \"\"\"{doc}\"\"\"\n    pass\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pipeline, SourceText};

    const SOURCE: &str = "\"\"\"Drills & co.\"\"\"\n\n\ndef double(x):\n    \"\"\"Return 2 * x < 10.\"\"\"\n    return 2 * x\n\n\ndef quad(x):\n    return double(double(x))\n";
    const TESTS: &str = "import unittest\n\n\nclass TestDouble(unittest.TestCase):\n    def test_a(self):\n        self.assertEqual(double(2), 4)\n\n    def test_b(self):\n        self.assertEqual(double(\"a\"), \"aa\")\n\n\nclass TestQuad(unittest.TestCase):\n    def test_a(self):\n        self.assertEqual(quad(1), 4)\n";

    fn render(config: &Config) -> String {
        let output = Pipeline::builder()
            .source(SourceText::new("drills.py", SOURCE))
            .tests(SourceText::new("drills_unittest.py", TESTS))
            .build()
            .run()
            .expect("run");
        QuizWriter::new(config)
            .render(output.composition().records(), output.module().docstring())
            .expect("render")
    }

    #[test]
    fn writes_category_then_questions() {
        let xml = render(&Config::default());
        let category = xml.find("type=\"category\"").expect("category");
        let first = xml.find("type=\"coderunner\"").expect("question");
        assert!(category < first);
        assert_eq!(xml.matches("type=\"coderunner\"").count(), 2);
        assert!(xml.contains("<text>$course$/top/Python</text>"));
        assert!(xml.contains("<text>Drills &amp; co.</text>"));
    }

    #[test]
    fn testcases_carry_visibility_and_marks() {
        let xml = render(&Config::default());
        assert!(xml.contains(
            "<testcase testtype=\"0\" useasexample=\"1\" hiderestiffail=\"0\" mark=\"1.0000000\">"
        ));
        assert_eq!(xml.matches("useasexample=\"1\"").count(), 2);
        assert_eq!(xml.matches("useasexample=\"0\"").count(), 1);
        assert!(xml.contains("<text><![CDATA[print(double(2))]]></text>"));
        assert!(xml.contains("<text>aa</text>"));
        assert!(xml.contains("<text>HIDE</text>"));
    }

    #[test]
    fn template_holds_dependencies_before_twig() {
        let xml = render(&Config::default());
        let quad = &xml[xml.find("<name>\n      <text>quad</text>").expect("quad")..];
        let template = &quad[quad.find("<template>").expect("template")..];
        let dep = template.find("def double").expect("dependency");
        let twig = template.find("{{ STUDENT_ANSWER }}").expect("twig");
        assert!(dep < twig);
    }

    #[test]
    fn question_text_escapes_docstring() {
        let config = Config::default();
        let xml = render(&config);
        assert!(xml.contains("<em>double</em>"));
        assert!(xml.contains("<pre>Return 2 * x &lt; 10.</pre>"));
    }

    #[test]
    fn tags_are_listed() {
        let config = Config {
            tags: vec!["python".into(), "drill".into()],
            ..Config::default()
        };
        let xml = render(&config);
        assert_eq!(xml.matches("<text>drill</text>").count(), 2);
    }
}
