//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;
use std::sync::Arc;

use miette::Report;

use crate::config::RunnerConfig;
use crate::pipeline::{
    FsSpecDiscovery, PendingPolicies, RunCoordinator, RunError, RunReporter, SpecDiscovery, SpecFilter,
};
use crate::xml::{NullDestination, Source};

use super::reporter::{ConsoleReporter, write_summary_json};
use super::{CliError, CliResult, ExitCode};

/// Render a fatal run error with its diagnostic code and help.
fn diagnostic(err: RunError) -> CliError {
    CliError::failure(format!("{:?}", Report::new(err)))
}

/// Run the whole pipeline.
pub fn run_tests(config: RunnerConfig, verbose: bool, summary_json: Option<&Path>) -> CliResult<ExitCode> {
    let mut reporter = ConsoleReporter::new(verbose);
    run_with_reporter(config, &mut reporter, summary_json)
}

pub fn run_with_reporter(
    config: RunnerConfig,
    reporter: &mut dyn RunReporter,
    summary_json: Option<&Path>,
) -> CliResult<ExitCode> {
    let engine = Arc::new(config.engine());
    let coordinator = RunCoordinator::new(config, engine);
    let summary = coordinator.run(reporter).map_err(diagnostic)?;

    if let Some(path) = summary_json {
        write_summary_json(path, &summary)
            .map_err(|e| CliError::failure(format!("Error writing {}: {}", path.display(), e)))?;
    }

    summary.check().map_err(diagnostic)?;
    Ok(ExitCode::SUCCESS)
}

/// Print the specifications that a run would process.
pub fn list_specs(dir: &Path, suffix: &str) -> CliResult<ExitCode> {
    let specs = FsSpecDiscovery::new(suffix)
        .discover(dir)
        .map_err(|e| diagnostic(e.into()))?;
    if specs.is_empty() {
        eprintln!("No XSpec tests found in {}", dir.display());
    }
    for spec in &specs {
        println!("{}", spec.path.display());
    }
    Ok(ExitCode::SUCCESS)
}

/// Filter one specification and print its assertion counts.
pub fn count_assertions(file: &Path, pending: PendingPolicies) -> CliResult<ExitCode> {
    let mut filter = SpecFilter::open(file, pending)
        .map_err(|e| CliError::failure(format!("Error reading {}: {}", file.display(), e)))?;
    filter
        .pump(&mut NullDestination)
        .map_err(|e| CliError::failure(format!("Error in {}: {}", file.display(), e)))?;

    let (Some(count), Some(kind)) = (filter.count(), filter.kind()) else {
        return Err(CliError::failure(format!("{} was not filtered completely", file.display())));
    };
    println!(
        "{}: {} assertion(s), {} pending, {} elided ({})",
        file.display(),
        count.declared,
        count.pending,
        count.elided,
        kind.as_str()
    );
    Ok(ExitCode::SUCCESS)
}
