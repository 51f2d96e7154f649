#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Runs the analysis stages over a source module and its test module.

use std::path::Path;

use anyhow::{Context, Result};
use bon::Builder;
use serde::Serialize;
use tracing::info;

use crate::{
    compose::{Composer, Composition},
    config::TemplateConfig,
    diagnostics::{Diagnostic, Diagnostics},
    python::{AnalysisError, Module, TestSuite},
};

/// An input text and the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    /// Name used in diagnostics, usually the file name.
    origin: String,
    /// The text, with `\n` line endings.
    text:   String,
}

impl SourceText {
    /// Wraps `text`, normalizing `\r\n` and `\r` line endings to `\n`.
    pub fn new(origin: impl Into<String>, text: impl AsRef<str>) -> Self {
        let text = text.as_ref().replace("\r\n", "\n").replace('\r', "\n");
        Self {
            origin: origin.into(),
            text,
        }
    }

    /// Reads a file; its file name becomes the origin.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
        let origin = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(origin, text))
    }

    /// Returns the origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A complete run over one module and its tests.
#[derive(Builder)]
pub struct Pipeline {
    /// The module under test.
    source:   SourceText,
    /// Its unittest module.
    tests:    SourceText,
    /// Template assembly options.
    #[builder(default)]
    template: TemplateConfig,
}

/// What a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// The analyzed module.
    module:      Module,
    /// The analyzed test suite.
    suite:       TestSuite,
    /// The composed records.
    composition: Composition,
    /// Every finding, test module first.
    diagnostics: Diagnostics,
}

impl PipelineOutput {
    /// Returns the analyzed module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Returns the analyzed test suite.
    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    /// Returns the composed records.
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Returns every finding of the run.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }
}

impl Pipeline {
    /// Runs every stage.
    ///
    /// Only unparseable input (or a repeated declaration name) fails the
    /// run; everything else ends up in the returned diagnostics.
    pub fn run(&self) -> Result<PipelineOutput, AnalysisError> {
        let module = Module::extract(self.source.origin(), self.source.text())?;
        info!(
            origin = self.source.origin(),
            declarations = module.declarations().len(),
            imports = module.imports().len(),
            "extracted declarations"
        );

        let suite = TestSuite::extract(self.tests.origin(), self.tests.text(), &module)?;
        info!(
            origin = self.tests.origin(),
            groups = suite.groups().len(),
            unbound = suite.binding_errors().len(),
            "extracted test groups"
        );

        let composition = Composer::builder()
            .module(&module)
            .suite(&suite)
            .include_dependencies(self.template.include_dependencies)
            .include_imports(self.template.include_imports)
            .build()
            .run();

        let origin = self.tests.origin();
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(
            suite
                .binding_errors()
                .iter()
                .map(|e| Diagnostic::from_binding(origin, e)),
        );
        diagnostics.extend(suite.issues().iter().map(|i| Diagnostic::from_issue(origin, i)));
        diagnostics.extend(suite.notes().iter().map(|n| Diagnostic::from_note(origin, n)));
        diagnostics.extend(composition.diagnostics().iter().cloned());

        info!(
            records = composition.records().len(),
            cases = composition.case_count(),
            skipped = composition.skipped().len(),
            diagnostics = diagnostics.len(),
            "composed"
        );

        Ok(PipelineOutput {
            module,
            suite,
            composition,
            diagnostics,
        })
    }
}
