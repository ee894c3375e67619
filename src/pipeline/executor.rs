//! Running a compiled test once and fanning its output out.
//!
//! ```text
//!                                 +--> ResultsCollector         (tally)
//! compiled test --x:main--> tee --+--> XmlWriter                (<stem>.xml)
//!                                 +--> reporter in push mode    (<stem>.html)
//! ```
//!
//! The test runs exactly once. If it aborts, every branch has seen the events emitted up to that point and is
//! closed normally, so the tally reflects only the results that were actually produced.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::collector::{ResultTally, ResultsCollector};
use super::compiler::CompiledArtifact;
use super::fanout::{BranchFailure, BranchKind, TeeDestination};
use super::layout::{ReportLayout, ensure_dir};
use crate::engine::{Engine, EngineError, Invocation, Program, ProgramSource};
use crate::xml::{SinkError, XmlWriter};

/// What to do with the reports of an execution that aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialReports {
    /// Leave them on disk; they show how far the test got.
    #[default]
    Keep,
    Discard,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("cannot load compiled test {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    #[error("execution aborted: {0}")]
    Aborted(#[source] EngineError),
}

/// What one execution produced.
#[derive(Debug)]
pub struct Execution {
    pub tally: ResultTally,
    /// Set when the test could not be loaded or did not run to completion.
    pub error: Option<ExecutionError>,
    pub branch_failures: Vec<BranchFailure>,
    pub xml_report: PathBuf,
    pub html_report: PathBuf,
}

/// Executes compiled tests against the engine, rendering reports with the reporter program.
pub struct Executor {
    engine: Arc<dyn Engine>,
    reporter: Arc<dyn Program>,
    layout: ReportLayout,
    partial_reports: PartialReports,
}

impl Executor {
    pub fn new(engine: Arc<dyn Engine>, reporter: Arc<dyn Program>, layout: ReportLayout) -> Self {
        Self {
            engine,
            reporter,
            layout,
            partial_reports: PartialReports::default(),
        }
    }

    pub fn with_partial_reports(mut self, policy: PartialReports) -> Self {
        self.partial_reports = policy;
        self
    }

    #[tracing::instrument(skip_all, fields(spec = %artifact.spec.name))]
    pub fn execute(&self, artifact: &CompiledArtifact) -> Execution {
        let xml_report = self.layout.xml_report(&artifact.spec);
        let html_report = self.layout.html_report(&artifact.spec);
        let mut execution = Execution {
            tally: ResultTally::default(),
            error: None,
            branch_failures: Vec::new(),
            xml_report,
            html_report,
        };

        let program = match self.load(&artifact.path) {
            Ok(program) => program,
            Err(source) => {
                execution.error = Some(ExecutionError::Load {
                    path: artifact.path.clone(),
                    source,
                });
                return execution;
            }
        };

        tracing::info!("Executing XSpec: {}", artifact.spec.name);
        ensure_dir(self.layout.root());

        let mut collector = ResultsCollector::new();
        let mut tee = TeeDestination::new();
        tee.add_branch(BranchKind::Results, &mut collector);
        match XmlWriter::create(&execution.xml_report) {
            Ok(writer) => tee.add_branch(BranchKind::Archive, writer),
            Err(e) => tee.add_failed_branch(BranchKind::Archive, e.into()),
        };
        match self.reporter.open(&execution.html_report) {
            Ok(renderer) => tee.add_branch(BranchKind::Report, renderer),
            Err(e) => tee.add_failed_branch(BranchKind::Report, SinkError::Failed(e.to_string())),
        };

        let entry_point = xspec_core::main_template_clark_name();
        let run = program.transform(Invocation::initial_template(&entry_point), &mut tee);
        execution.branch_failures = tee.finish();
        execution.tally = collector.finish();

        if let Err(e) = run {
            tracing::warn!("Execution of {} aborted: {}", artifact.spec.name, e);
            execution.error = Some(ExecutionError::Aborted(e));
            if self.partial_reports == PartialReports::Discard {
                discard(&execution.xml_report);
                discard(&execution.html_report);
            }
        }
        tracing::debug!("Observed {} for {}", execution.tally, artifact.spec.name);
        execution
    }

    fn load(&self, path: &Path) -> Result<Arc<dyn Program>, EngineError> {
        let source = ProgramSource::from_file(path)?;
        self.engine.load(source)
    }
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Discarded partial report {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial report {}: {}", path.display(), e),
    }
}
