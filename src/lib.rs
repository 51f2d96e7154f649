//! # pyquiz
//!
//! Turns a Python module and its `unittest` companion into self-contained,
//! auto-graded CodeRunner questions.
//!
//! The pipeline runs left to right over two input texts:
//! module text → declarations + dependency graph → resolved dependency sets,
//! test text → test groups bound to declarations → transformed assertions,
//! and finally one composed record per tested declaration.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Assembles per-declaration records from the analysis stages.
pub mod compose;
/// Run configuration loaded from YAML.
pub mod config;
/// Fixed names and markers shared by the analysis stages.
pub mod constants;
/// Non-fatal findings accumulated during a run.
pub mod diagnostics;
/// CodeRunner quiz document writer.
pub mod moodle;
/// Wires the analysis stages into a single run.
pub mod pipeline;
/// Python source analysis: declarations, scopes, tests and assertions.
pub mod python;
/// Small shared value types.
pub mod types;

pub use compose::{ComposedCase, ComposedRecord, Composer, Composition};
pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use moodle::QuizWriter;
pub use pipeline::{Pipeline, PipelineOutput, SourceText};
pub use python::{AnalysisError, Declaration, Module, TestGroup, TestStatement};
