//! End-to-end runs of the pipeline over fixture modules.

use std::path::PathBuf;

use pyquiz::{
    Diagnostic, Pipeline, PipelineOutput, Severity, SourceText, TestStatement, python::MessageMatch,
};

fn fixture(dir: &str, file: &str) -> SourceText {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("python")
        .join(dir)
        .join(file);
    SourceText::from_path(&path).expect("read fixture")
}

fn run(dir: &str, stem: &str) -> PipelineOutput {
    Pipeline::builder()
        .source(fixture(dir, &format!("{stem}.py")))
        .tests(fixture(dir, &format!("{stem}_unittest.py")))
        .build()
        .run()
        .expect("pipeline run")
}

#[test]
fn doubles_compose_two_records_with_three_cases() {
    let output = run("doubles", "doubles");
    let composition = output.composition();

    assert_eq!(composition.records().len(), 2);
    assert_eq!(composition.case_count(), 3);
    for record in composition.records() {
        assert_eq!(record.cases().iter().filter(|c| c.visible()).count(), 1);
        assert!(record.cases()[0].visible());
    }

    let double = composition.get("double").expect("double record");
    assert!(double.dependencies().is_empty());
    assert_eq!(double.template(), double.source());

    let somme = composition.get("somme_doubles").expect("somme_doubles record");
    assert_eq!(somme.dependencies(), ["double".to_string()]);
    let template = somme.template();
    let double_at = template.find("def double(x):").expect("dependency source");
    let own_at = template.find("def somme_doubles(a, b):").expect("own source");
    assert!(double_at < own_at);

    assert!(output.diagnostics().is_empty());
}

#[test]
fn doubles_cases_render_probe_and_expected() {
    let output = run("doubles", "doubles");
    let double = output.composition().get("double").expect("double record");

    let first = &double.cases()[0];
    assert_eq!(first.name(), "test_positive");
    assert_eq!(first.code(), "print(double(5))");
    assert_eq!(first.expected(), "10");
    assert_eq!(first.description(), Some("Doubling a positive number."));

    let second = &double.cases()[1];
    assert_eq!(second.expected(), "-6");
    assert!(!second.visible());
}

#[test]
fn unmatched_groups_are_diagnosed_and_the_run_completes() {
    let output = run("shapes", "shapes");

    let bindings: Vec<&Diagnostic> = output
        .diagnostics()
        .iter()
        .filter(|d| d.kind() == "binding")
        .collect();
    assert_eq!(bindings.len(), 2);
    match bindings[0] {
        Diagnostic::Binding {
            group, expected, ..
        } => {
            assert_eq!(group, "TestArea2d");
            assert!(expected.contains(&"area2d".to_string()));
        }
        other => panic!("unexpected diagnostic {other:?}"),
    }
    assert!(output.diagnostics().has_errors());

    let composition = output.composition();
    assert_eq!(composition.records().len(), 1);
    assert_eq!(composition.records()[0].name(), "perimeter");
    assert_eq!(composition.records()[0].cases().len(), 2);
    assert_eq!(composition.skipped(), ["area_2d".to_string()]);
}

#[test]
fn calculator_groups_bind_functions_and_classes() {
    let output = run("calculator", "calculator");
    let names: Vec<&str> = output
        .composition()
        .records()
        .iter()
        .map(|r| r.name())
        .collect();
    assert_eq!(names, vec!["double", "average", "scaled_average", "Calculator"]);
    assert_eq!(output.composition().skipped(), ["untested_helper".to_string()]);
}

#[test]
fn calculator_dependencies_and_imports() {
    let output = run("calculator", "calculator");
    let composition = output.composition();

    let scaled = composition.get("scaled_average").expect("scaled_average");
    assert_eq!(scaled.dependencies(), ["average".to_string(), "double".to_string()]);
    assert_eq!(scaled.imports(), ["from math import fsum".to_string()]);

    let calculator = composition.get("Calculator").expect("Calculator");
    assert_eq!(calculator.dependencies(), ["double".to_string()]);
    assert!(calculator.imports().is_empty());
    assert_eq!(calculator.signature(), "(start=...)");
}

#[test]
fn exception_message_presence_is_distinguishable() {
    let output = run("calculator", "calculator");
    let group = output.suite().group_for("average").expect("average group");

    let statement = |case: &str| {
        group
            .cases()
            .iter()
            .find(|c| c.name() == case)
            .map(|c| c.statements()[0].clone())
            .expect("case")
    };

    match statement("test_empty") {
        TestStatement::ExceptionExpectation { kind, body, message, .. } => {
            assert_eq!(kind, "ValueError");
            assert_eq!(body, vec!["average([])".to_string()]);
            assert_eq!(message, None);
        }
        other => panic!("unexpected statement {other:?}"),
    }

    match statement("test_empty_message") {
        TestStatement::ExceptionExpectation { kind, message, .. } => {
            assert_eq!(kind, "ValueError");
            let MessageMatch { value, pattern, .. } = message.expect("message check");
            assert_eq!(value, "empty");
            assert!(!pattern);
        }
        other => panic!("unexpected statement {other:?}"),
    }

    match statement("test_call_form") {
        TestStatement::ExceptionExpectation { kind, body, message, .. } => {
            assert_eq!(kind, "TypeError");
            assert_eq!(body, vec!["average(None)".to_string()]);
            assert!(message.is_none());
        }
        other => panic!("unexpected statement {other:?}"),
    }
}

#[test]
fn setup_is_inlined_without_receiver() {
    let output = run("calculator", "calculator");
    let calculator = output.composition().get("Calculator").expect("Calculator");
    let chain = &calculator.cases()[1];
    assert_eq!(
        chain.code(),
        "calc = Calculator(10)\ncalc.add(5)\ncalc.double()\nprint(calc.result)"
    );
    assert_eq!(chain.expected(), "30");
}

#[test]
fn loops_and_helpers_surface_as_diagnostics() {
    let output = run("calculator", "calculator");
    let diagnostics = output.diagnostics();

    let kinds: Vec<&str> = diagnostics.iter().map(Diagnostic::kind).collect();
    assert!(kinds.contains(&"unsupported_form"));
    assert!(kinds.contains(&"ignored_member"));
    assert!(kinds.contains(&"coverage"));
    assert!(kinds.contains(&"missing_documentation"));
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.max_severity(), Some(Severity::Warning));
    assert_eq!(diagnostics.unrecognized_count(), 1);

    let scaled = output.composition().get("scaled_average").expect("scaled_average");
    assert!(scaled.cases()[1].code().starts_with("for factor in range(3):"));
}

#[test]
fn suites_and_outputs_serialize_to_json() {
    let output = run("calculator", "calculator");
    let suite = serde_json::to_value(output.suite()).expect("suite serializes");
    assert!(suite.to_string().contains("\"form\":\"verbatim\""));

    let whole = serde_json::to_string(&output).expect("output serializes");
    assert!(whole.contains("\"form\":\"exception_expectation\""));
}
