//! Quiz documents written from fixture modules.

use std::path::PathBuf;

use pyquiz::{Config, Pipeline, PipelineOutput, QuizWriter, SourceText};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn run(dir: &str, stem: &str, config: &Config) -> PipelineOutput {
    let root = fixtures().join("python").join(dir);
    Pipeline::builder()
        .source(SourceText::from_path(&root.join(format!("{stem}.py"))).expect("source"))
        .tests(SourceText::from_path(&root.join(format!("{stem}_unittest.py"))).expect("tests"))
        .template(config.template.clone())
        .build()
        .run()
        .expect("pipeline run")
}

fn render(dir: &str, stem: &str, config: &Config) -> String {
    let output = run(dir, stem, config);
    QuizWriter::new(config)
        .render(output.composition().records(), output.module().docstring())
        .expect("render")
}

#[test]
fn config_file_values_reach_the_document() {
    let config = Config::load(Some(&fixtures().join("config.yaml"))).expect("config");
    let xml = render("doubles", "doubles", &config);

    assert!(xml.contains("<text>$course$/top/Python/Drills</text>"));
    assert!(xml.contains("<allornothing>0</allornothing>"));
    assert!(xml.contains("<answerboxlines>25</answerboxlines>"));
    assert!(xml.contains("mark=\"2.5000000\""));
    assert_eq!(xml.matches("<text>drills</text>").count(), 2);
}

#[test]
fn module_docstring_describes_the_category() {
    let config = Config::load(Some(&fixtures().join("config.yaml"))).expect("config");
    let xml = render("doubles", "doubles", &config);
    assert!(xml.contains("<text>Warm-up exercises on doubling numbers.</text>"));
    assert!(!xml.contains("Generated drills"));

    let xml = render("shapes", "shapes", &config);
    assert!(xml.contains("<text>Geometry drills.</text>"));
}

#[test]
fn exception_probes_are_written_as_cdata() {
    let xml = render("calculator", "calculator", &Config::default());
    assert!(xml.contains(
        "<![CDATA[try:\n    average([])\n    print(\"KO\")\nexcept ValueError as e:\n    print(\"OK\" if \"empty\" in str(e) else \"KO\")]]>"
    ));
    assert!(xml.contains("<text>OK</text>"));
}

#[test]
fn answer_holds_the_reference_solution() {
    let xml = render("doubles", "doubles", &Config::default());
    assert!(xml.contains("<answer><![CDATA[def double(x):"));
    assert!(xml.contains("<answerpreload><![CDATA[def double(x):\n    \"\"\"Return twice the value of x.\"\"\"\n    pass\n]]></answerpreload>"));
}

#[test]
fn writes_to_disk() {
    let dir = std::env::temp_dir().join(format!("pyquiz-test-{}", std::process::id()));
    let path = dir.join("nested").join("doubles_moodle.xml");
    let config = Config::default();
    let output = run("doubles", "doubles", &config);

    QuizWriter::new(&config)
        .write_to(&path, output.composition().records(), output.module().docstring())
        .expect("write");
    let written = std::fs::read_to_string(&path).expect("read back");
    assert!(written.starts_with("<?xml"));
    assert_eq!(written.matches("<question type=\"coderunner\">").count(), 2);

    std::fs::remove_dir_all(&dir).ok();
}
