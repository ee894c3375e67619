//! Per-run orchestration: compile, execute, reconcile, classify.
//!
//! ## Reconciliation
//!
//! A compiled test should produce one result per assertion it still contains:
//!
//! ```text
//! missed = declared - (observed + elided)
//! ```
//!
//! A positive `missed` means the execution stopped before reaching those assertions. It is reported on its
//! own and never folded into the passed or failed counts. More results than expected is reported as an
//! error instead of a negative count.
//!
//! `declared` is the number of assertion elements written in the specification. Scenarios reused through
//! `x:like` run the assertions of the shared scenario once per reference, so a specification that shares
//! scenarios can observe more results than it declares. Such a specification ends as an error with a
//! `surplus`, even when every assertion passed.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use miette::Diagnostic;
use thiserror::Error;

use super::collector::ResultTally;
use super::compiler::{CompileError, CompiledArtifact, Compiler};
use super::discovery::{DiscoveryError, SpecDiscovery};
use super::executor::{Execution, Executor};
use super::Specification;
use crate::config::RunnerConfig;
use crate::engine::{Engine, EngineError, FsResolver, Program, ProgramRole, Programs, ResourceResolver};

/// Single message for a run that did not pass.
pub const FAILURE_MESSAGE: &str = "Some XSpec tests failed or were missed!";

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Every expected result was observed and none failed.
    Passed,
    /// Failed or missed assertions.
    Failed,
    /// Compilation, execution or report writing went wrong.
    Error,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "passed",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::Error => "error",
        }
    }
}

/// Result of processing one specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub spec: Specification,
    /// Whether a compiled test was produced.
    pub compiled: bool,
    pub declared: usize,
    pub elided: usize,
    pub tally: ResultTally,
    pub missed: usize,
    /// Results observed beyond what was declared.
    pub surplus: usize,
    pub status: OutcomeStatus,
    pub errors: Vec<String>,
}

impl RunOutcome {
    /// Compare what the specification declared with what the execution produced.
    pub fn reconcile(artifact: &CompiledArtifact, execution: &Execution) -> Self {
        let expected = artifact.count.expected_results();
        let observed = execution.tally.total();
        let missed = expected.saturating_sub(observed);
        let surplus = observed.saturating_sub(expected);

        let mut errors = Vec::new();
        if let Some(e) = &execution.error {
            errors.push(e.to_string());
        }
        errors.extend(execution.branch_failures.iter().map(ToString::to_string));
        if surplus > 0 {
            errors.push(format!(
                "{surplus} more result(s) than the {expected} assertion(s) declared (are scenarios reused through x:like?)"
            ));
        }

        let status = if !errors.is_empty() {
            OutcomeStatus::Error
        } else if execution.tally.failed + missed > 0 {
            OutcomeStatus::Failed
        } else {
            OutcomeStatus::Passed
        };

        Self {
            spec: artifact.spec.clone(),
            compiled: true,
            declared: artifact.count.declared,
            elided: artifact.count.elided,
            tally: execution.tally,
            missed,
            surplus,
            status,
            errors,
        }
    }

    pub fn compile_failed(spec: &Specification, error: &CompileError) -> Self {
        Self {
            spec: spec.clone(),
            compiled: false,
            declared: 0,
            elided: 0,
            tally: ResultTally::default(),
            missed: 0,
            surplus: 0,
            status: OutcomeStatus::Error,
            errors: vec![error.to_string()],
        }
    }

    pub fn success(&self) -> bool {
        self.status == OutcomeStatus::Passed
    }

    /// `<name> results [Total/Passed/Failed/Missed] = [T/P/F/M]`
    pub fn summary_line(&self) -> String {
        if !self.compiled {
            return format!("{} could not be compiled", self.spec.name);
        }
        let mut line = format!(
            "{} results [Total/Passed/Failed/Missed] = [{}/{}/{}/{}]",
            self.spec.name, self.declared, self.tally.passed, self.tally.failed, self.missed
        );
        if self.tally.pending > 0 {
            line.push_str(&format!(", {} pending", self.tally.pending));
        }
        if self.elided > 0 {
            line.push_str(&format!(", {} elided", self.elided));
        }
        line
    }
}

/// Aggregate of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<RunOutcome>,
    pub skipped: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn skipped() -> Self {
        Self {
            outcomes: Vec::new(),
            skipped: true,
            duration: Duration::ZERO,
        }
    }

    /// True when every specification passed and at least one produced a compiled test.
    pub fn success(&self) -> bool {
        self.skipped || (self.outcomes.iter().any(|o| o.compiled) && self.outcomes.iter().all(RunOutcome::success))
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Sum of the per-specification tallies.
    pub fn totals(&self) -> (usize, ResultTally, usize) {
        self.outcomes.iter().fold((0, ResultTally::default(), 0), |(declared, tally, missed), o| {
            (
                declared + o.declared,
                ResultTally {
                    passed: tally.passed + o.tally.passed,
                    failed: tally.failed + o.tally.failed,
                    pending: tally.pending + o.tally.pending,
                },
                missed + o.missed,
            )
        })
    }

    /// `Ok` for a successful run, the run-level error otherwise.
    pub fn check(&self) -> Result<(), RunError> {
        if self.success() {
            return Ok(());
        }
        if self.outcomes.is_empty() {
            return Err(RunError::NoSpecifications);
        }
        Err(RunError::TestsFailed {
            unsuccessful: self.outcomes.iter().filter(|o| !o.success()).count(),
            total: self.outcomes.len(),
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that end a run.
#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error("cannot find the XSpec {role} at {location}")]
    #[diagnostic(
        code(xspec::program_missing),
        help("point --compiler / --reporter at the stylesheets of an XSpec distribution")
    )]
    ProgramMissing { role: ProgramRole, location: String },

    #[error("cannot read the XSpec {role} at {location}")]
    #[diagnostic(code(xspec::program_unreadable))]
    ProgramUnreadable {
        role: ProgramRole,
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot load the XSpec {role}")]
    #[diagnostic(code(xspec::program_load))]
    ProgramLoad {
        role: ProgramRole,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    #[diagnostic(code(xspec::discovery), help("set --test-dir to the directory holding your .xspec files"))]
    Discovery(#[from] DiscoveryError),

    #[error("Some XSpec tests failed or were missed!")]
    #[diagnostic(code(xspec::no_specifications), help("no specification produced a compiled test"))]
    NoSpecifications,

    #[error("Some XSpec tests failed or were missed!")]
    #[diagnostic(code(xspec::tests_failed), help("{unsuccessful} of {total} specification(s) did not pass"))]
    TestsFailed { unsuccessful: usize, total: usize },
}

// ============================================================================
// Reporting
// ============================================================================

/// Receives progress of a run.
pub trait RunReporter {
    /// Called once the specifications are known
    fn on_discovered(&mut self, _root: &Path, _specs: &[Specification]) {}

    /// Called before a specification is compiled
    fn on_spec_start(&mut self, _spec: &Specification) {}

    /// Called when a specification is done
    fn on_outcome(&mut self, outcome: &RunOutcome);

    /// Called when the run is over, skipped runs included
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Reports nothing.
#[derive(Debug, Default)]
pub struct NullReporter;

impl RunReporter for NullReporter {
    fn on_outcome(&mut self, _outcome: &RunOutcome) {}

    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

// ============================================================================
// Coordinator
// ============================================================================

/// Drives a whole run.
pub struct RunCoordinator {
    config: RunnerConfig,
    engine: Arc<dyn Engine>,
    discovery: Box<dyn SpecDiscovery>,
    resolver: Box<dyn ResourceResolver>,
}

impl fmt::Debug for RunCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunCoordinator").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RunCoordinator {
    /// A coordinator scanning the configured test directory and resolving programs from the working directory.
    pub fn new(config: RunnerConfig, engine: Arc<dyn Engine>) -> Self {
        let discovery = Box::new(config.discovery());
        Self {
            config,
            engine,
            discovery,
            resolver: Box::new(FsResolver::new(".")),
        }
    }

    pub fn with_discovery(mut self, discovery: impl SpecDiscovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every specification. `Err` only for problems that stop the whole run; test failures are in the
    /// returned summary (see [`RunSummary::check`]).
    pub fn run(&self, reporter: &mut dyn RunReporter) -> Result<RunSummary, RunError> {
        if self.config.skip_tests {
            tracing::info!("Skipping XSpec tests");
            let summary = RunSummary::skipped();
            reporter.on_run_complete(&summary);
            return Ok(summary);
        }

        let started = Instant::now();
        let programs = self.load_programs()?;
        let specs = self.discovery.discover(&self.config.test_dir)?;
        reporter.on_discovered(&self.config.test_dir, &specs);
        if specs.is_empty() {
            tracing::warn!("No XSpec tests found in {}", self.config.test_dir.display());
        }

        let layout = self.config.layout();
        let compiler = Compiler::new(programs.compiler, layout.clone(), self.config.pending);
        let executor = Executor::new(self.engine.clone(), programs.reporter, layout)
            .with_partial_reports(self.config.partial_reports);

        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in &specs {
            reporter.on_spec_start(spec);
            let outcome = self.process(spec, &compiler, &executor);
            if outcome.success() {
                tracing::info!("{}", outcome.summary_line());
            } else {
                tracing::error!("{}", outcome.summary_line());
                for error in &outcome.errors {
                    tracing::error!("  {}", error);
                }
            }
            reporter.on_outcome(&outcome);
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            outcomes,
            skipped: false,
            duration: started.elapsed(),
        };
        reporter.on_run_complete(&summary);
        Ok(summary)
    }

    fn process(&self, spec: &Specification, compiler: &Compiler, executor: &Executor) -> RunOutcome {
        tracing::info!("Processing XSpec: {}", spec.path.display());
        let artifact = match compiler.compile(spec) {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!("Unable to compile {}: {}", spec.name, e);
                return RunOutcome::compile_failed(spec, &e);
            }
        };
        let execution = executor.execute(&artifact);
        RunOutcome::reconcile(&artifact, &execution)
    }

    /// Resolve and load the compiler and reporter once for the whole run.
    pub fn load_programs(&self) -> Result<Programs, RunError> {
        Ok(Programs {
            compiler: self.load_program(ProgramRole::Compiler, &self.config.compiler)?,
            reporter: self.load_program(ProgramRole::Reporter, &self.config.reporter)?,
        })
    }

    fn load_program(&self, role: ProgramRole, location: &str) -> Result<Arc<dyn Program>, RunError> {
        let source = self
            .resolver
            .resolve(location)
            .map_err(|source| RunError::ProgramUnreadable {
                role,
                location: location.to_string(),
                source,
            })?
            .ok_or_else(|| RunError::ProgramMissing {
                role,
                location: location.to_string(),
            })?;
        tracing::debug!("Loading XSpec {} from {}", role, source.system_id);
        self.engine
            .load(source)
            .map_err(|source| RunError::ProgramLoad { role, source })
    }
}
