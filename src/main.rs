#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # pyquiz
//!
//! Turns a Python module and its `unittest` companion into a Moodle quiz of
//! CodeRunner questions, one per tested function or class.
//!
//! ```text
//! pyquiz generate exercises.py            # reads exercises_unittest.py
//! pyquiz generate exercises.py --strict   # non-zero exit on any warning
//! pyquiz inspect exercises.py             # declarations and dependencies
//! ```

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use pyquiz::{
    Config, Diagnostic, Pipeline, Severity, SourceText,
    constants::{OUTPUT_DIR, TEST_FILE_SUFFIX},
    moodle::QuizWriter,
    python::Module,
};
use serde_json::json;
use tracing::{Level, error, info, metadata::LevelFilter, warn};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Options of `generate`.
#[derive(Debug, Clone)]
struct Generate {
    /// The module under test.
    source:  PathBuf,
    /// Its unittest module.
    tests:   Option<PathBuf>,
    /// Configuration file.
    config:  Option<PathBuf>,
    /// Output document.
    output:  Option<PathBuf>,
    /// Fail on warnings too.
    strict:  bool,
    /// Debug logging.
    verbose: bool,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Write a quiz document
    Generate(Generate),
    /// Print the analysis of a module as JSON
    Inspect(PathBuf),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the source module path
    fn source_path() -> impl Parser<PathBuf> {
        positional("SOURCE").help("Python module holding the declarations")
    }

    let source = source_path();
    let tests = long("tests")
        .short('t')
        .help("unittest module; defaults to <stem>_unittest.py next to SOURCE")
        .argument::<PathBuf>("FILE")
        .optional();
    let config = long("config")
        .short('c')
        .help("YAML configuration file")
        .argument::<PathBuf>("FILE")
        .optional();
    let output = long("output")
        .short('o')
        .help("Output document; defaults to output/<stem>_moodle.xml")
        .argument::<PathBuf>("FILE")
        .optional();
    let strict = long("strict")
        .help("Exit with status 2 on warnings, not only errors")
        .switch();
    let verbose = long("verbose").short('v').help("Log debug events").switch();

    let generate = construct!(Generate {
        source,
        tests,
        config,
        output,
        strict,
        verbose
    })
    .to_options()
    .command("generate")
    .help("Generate a CodeRunner quiz from a module and its tests")
    .map(Cmd::Generate);

    let inspect = construct!(Cmd::Inspect(source_path()))
        .to_options()
        .command("inspect")
        .help("Prints a JSON description of the module's declarations");

    let cmd = construct!([generate, inspect]);

    cmd.to_options()
        .descr("Python unittest to Moodle CodeRunner converter")
        .run()
}

/// Installs the log subscriber.
fn init_logging(level: Level) {
    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();
}

/// `<dir>/<stem>_unittest.py` for `<dir>/<stem>.py`.
fn default_tests_path(source: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .with_context(|| format!("{} has no file name", source.display()))?;
    Ok(source.with_file_name(format!("{}{TEST_FILE_SUFFIX}", stem.to_string_lossy())))
}

/// `output/<stem>_moodle.xml` for `<dir>/<stem>.py`.
fn default_output_path(source: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .with_context(|| format!("{} has no file name", source.display()))?;
    Ok(Path::new(OUTPUT_DIR).join(format!("{}_moodle.xml", stem.to_string_lossy())))
}

/// Logs one diagnostic at its severity.
fn replay(diagnostic: &Diagnostic) {
    let at = diagnostic.location();
    match diagnostic.severity() {
        Severity::Error => error!(kind = diagnostic.kind(), at = %at, "{diagnostic}"),
        Severity::Warning => warn!(kind = diagnostic.kind(), at = %at, "{diagnostic}"),
        Severity::Info => info!(kind = diagnostic.kind(), at = %at, "{diagnostic}"),
    }
}

/// Runs `generate`.
fn generate(opts: Generate) -> Result<ExitCode> {
    let config = Config::load(opts.config.as_deref())?;
    let level = if opts.verbose {
        Level::DEBUG
    } else {
        Level::from_str(&config.logging.level).unwrap_or(Level::INFO)
    };
    init_logging(level);

    let tests_path = match opts.tests {
        Some(path) => path,
        None => default_tests_path(&opts.source)?,
    };
    let output_path = match opts.output {
        Some(path) => path,
        None => default_output_path(&opts.source)?,
    };
    info!(source = %opts.source.display(), tests = %tests_path.display(), "starting");

    let output = Pipeline::builder()
        .source(SourceText::from_path(&opts.source)?)
        .tests(SourceText::from_path(&tests_path)?)
        .template(config.template.clone())
        .build()
        .run()?;

    let diagnostics = output.diagnostics();
    diagnostics.iter().for_each(replay);

    QuizWriter::new(&config).write_to(
        &output_path,
        output.composition().records(),
        output.module().docstring(),
    )?;

    if !diagnostics.is_empty() {
        eprintln!("{}", diagnostics.to_table());
    }

    let failing = if opts.strict {
        diagnostics.max_severity() >= Some(Severity::Warning)
    } else {
        diagnostics.has_errors()
    };
    Ok(if failing {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

/// Runs `inspect`.
fn inspect(source: &Path) -> Result<()> {
    init_logging(Level::WARN);
    let text = SourceText::from_path(source)?;
    let module = Module::extract(text.origin(), text.text())?;
    let graph = module.graph();

    let declarations: Vec<_> = module
        .declarations()
        .iter()
        .map(|d| {
            json!({
                "name": d.name(),
                "kind": d.kind(),
                "line": d.line(),
                "signature": d.signature(),
                "documented": d.docstring().is_some(),
                "uses": d.uses(),
                "external": d.external(),
                "dependencies": graph.resolve(d.name()),
            })
        })
        .collect();
    let description = json!({
        "origin": module.origin(),
        "docstring": module.docstring(),
        "imports": module.imports(),
        "declarations": declarations,
    });

    println!(
        "{}",
        serde_json::to_string_pretty(&description).context("Failed to serialize module")?
    );
    Ok(())
}

fn main() -> Result<ExitCode> {
    dotenv().ok();

    match options() {
        Cmd::Generate(opts) => generate(opts),
        Cmd::Inspect(source) => inspect(&source).map(|_| ExitCode::SUCCESS),
    }
}
