//! CLI module for the XSpec runner
//!
//! ## Commands
//!
//! - `run` - Compile and execute every specification, write reports
//! - `list [DIR]` - Show the specifications a run would pick up
//! - `count <FILE>` - Show the assertion counts of one specification
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `reporter` - Console and JSON run reporting
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod reporter;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use xspec_core::TestKind;

use crate::config::{DEFAULT_COMPILER, DEFAULT_REPORT_DIR, DEFAULT_REPORTER, DEFAULT_TEST_DIR, RunnerConfig};
use crate::engine::process::DEFAULT_PROCESSOR;
use crate::pipeline::{PartialReports, PendingPolicies};
use crate::version::XSPEC_RUNNER_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run XSpec test suites through an XSLT processor
#[derive(Parser, Debug)]
#[command(name = "xspec")]
#[command(version = XSPEC_RUNNER_VERSION)]
#[command(about = "Run XSpec test suites through an XSLT processor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and execute every specification under the test directory
    Run(RunArgs),

    /// List the specifications a run would process
    List {
        /// Directory to search
        #[arg(value_name = "DIR", default_value = DEFAULT_TEST_DIR)]
        dir: PathBuf,
        /// File-name suffix of specifications
        #[arg(long, default_value = xspec_core::SPEC_SUFFIX)]
        suffix: String,
    },

    /// Count the assertions declared by one specification
    Count {
        /// Specification file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Count pending assertions of this test kind as elided (repeatable)
        #[arg(long = "elide-pending", value_name = "KIND", value_parser = parse_kind)]
        elide_pending: Vec<TestKind>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Skip the whole run and report success
    #[arg(long = "skip-tests", env = "XSPEC_SKIP_TESTS")]
    pub skip_tests: bool,

    /// XSpec compiler stylesheet (path or file: URI)
    #[arg(long, env = "XSPEC_COMPILER", default_value = DEFAULT_COMPILER)]
    pub compiler: String,

    /// XSpec HTML reporter stylesheet (path or file: URI)
    #[arg(long, env = "XSPEC_REPORTER", default_value = DEFAULT_REPORTER)]
    pub reporter: String,

    /// Directory searched for specifications
    #[arg(long = "test-dir", env = "XSPEC_TEST_DIR", default_value = DEFAULT_TEST_DIR)]
    pub test_dir: PathBuf,

    /// Directory for compiled tests and reports
    #[arg(long = "report-dir", env = "XSPEC_REPORT_DIR", default_value = DEFAULT_REPORT_DIR)]
    pub report_dir: PathBuf,

    /// File-name suffix of specifications
    #[arg(long, default_value = xspec_core::SPEC_SUFFIX)]
    pub suffix: String,

    /// XSLT processor command line (Saxon-compatible arguments)
    #[arg(long, env = "XSPEC_PROCESSOR", default_value = DEFAULT_PROCESSOR)]
    pub processor: String,

    /// Leave pending assertions of this test kind out of the compiled test (repeatable)
    #[arg(long = "elide-pending", value_name = "KIND", value_parser = parse_kind)]
    pub elide_pending: Vec<TestKind>,

    /// Delete the reports of executions that aborted
    #[arg(long = "discard-partial-reports")]
    pub discard_partial_reports: bool,

    /// Also write a JSON summary of the run
    #[arg(long = "summary-json", value_name = "FILE")]
    pub summary_json: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn to_config(&self) -> RunnerConfig {
        let config = RunnerConfig::new()
            .with_skip_tests(self.skip_tests)
            .with_compiler(&self.compiler)
            .with_reporter(&self.reporter)
            .with_test_dir(&self.test_dir)
            .with_report_dir(&self.report_dir)
            .with_suffix(&self.suffix)
            .with_processor(&self.processor)
            .with_partial_reports(if self.discard_partial_reports {
                PartialReports::Discard
            } else {
                PartialReports::Keep
            });
        self.elide_pending
            .iter()
            .fold(config, |config, kind| config.with_elided_pending(*kind))
    }
}

fn parse_kind(value: &str) -> Result<TestKind, String> {
    value.parse::<TestKind>().map_err(|e| e.to_string())
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run(args) => commands::run_tests(args.to_config(), args.verbose, args.summary_json.as_deref()),
        Command::List { dir, suffix } => commands::list_specs(&dir, &suffix),
        Command::Count { file, elide_pending } => {
            commands::count_assertions(&file, PendingPolicies::eliding(&elide_pending))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
