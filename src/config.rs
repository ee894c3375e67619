//! Runner configuration.
//!
//! Defaults follow the conventional Maven-style layout of an XSpec project.

use std::path::PathBuf;

use xspec_core::TestKind;

use crate::engine::ProcessEngine;
use crate::pipeline::{FsSpecDiscovery, PartialReports, PendingPolicies, PendingPolicy, ReportLayout};

/// Default location of the XSpec compiler stylesheet.
pub const DEFAULT_COMPILER: &str = "xspec/src/compiler/generate-xspec-tests.xsl";

/// Default location of the XSpec HTML reporter stylesheet.
pub const DEFAULT_REPORTER: &str = "xspec/src/reporter/format-xspec-report.xsl";

pub const DEFAULT_TEST_DIR: &str = "src/test/xspec";

pub const DEFAULT_REPORT_DIR: &str = "target/xspec-reports";

/// Settings of one run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Bypass the whole pipeline and report success
    pub skip_tests: bool,
    /// Location of the XSpec compiler stylesheet (path or `file:` URI)
    pub compiler: String,
    /// Location of the XSpec reporter stylesheet (path or `file:` URI)
    pub reporter: String,
    /// Root searched for specifications
    pub test_dir: PathBuf,
    /// Root of compiled tests and reports
    pub report_dir: PathBuf,
    /// File-name suffix of specifications
    pub suffix: String,
    /// XSLT processor command line
    pub processor: String,
    pub pending: PendingPolicies,
    pub partial_reports: PartialReports,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            skip_tests: false,
            compiler: DEFAULT_COMPILER.to_string(),
            reporter: DEFAULT_REPORTER.to_string(),
            test_dir: PathBuf::from(DEFAULT_TEST_DIR),
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
            suffix: xspec_core::SPEC_SUFFIX.to_string(),
            processor: crate::engine::process::DEFAULT_PROCESSOR.to_string(),
            pending: PendingPolicies::default(),
            partial_reports: PartialReports::default(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_tests(mut self, skip: bool) -> Self {
        self.skip_tests = skip;
        self
    }

    pub fn with_compiler(mut self, location: impl Into<String>) -> Self {
        self.compiler = location.into();
        self
    }

    pub fn with_reporter(mut self, location: impl Into<String>) -> Self {
        self.reporter = location.into();
        self
    }

    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_processor(mut self, command: impl Into<String>) -> Self {
        self.processor = command.into();
        self
    }

    /// Elide pending assertions for one test kind
    pub fn with_elided_pending(mut self, kind: TestKind) -> Self {
        self.pending = self.pending.with(kind, PendingPolicy::Elide);
        self
    }

    pub fn with_partial_reports(mut self, policy: PartialReports) -> Self {
        self.partial_reports = policy;
        self
    }

    pub fn layout(&self) -> ReportLayout {
        ReportLayout::new(&self.report_dir, &self.suffix)
    }

    pub fn discovery(&self) -> FsSpecDiscovery {
        FsSpecDiscovery::new(&self.suffix)
    }

    pub fn engine(&self) -> ProcessEngine {
        ProcessEngine::from_command_line(&self.processor)
    }
}
