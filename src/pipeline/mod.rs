//! The XSpec execution pipeline.
//!
//! One specification at a time flows through:
//!
//! ```text
//! discovery -> filter -> compiler -> executor -> { collector, archive, report } -> coordinator
//! ```
//!
//! ## Modules
//!
//! - `discovery` - find `*.xspec` files under the test root
//! - `filter` - streaming pre-pass that counts (and optionally elides) assertions
//! - `compiler` - turn a specification into an executable test stylesheet
//! - `executor` - run a compiled test once and fan its output out
//! - `fanout` - the three-way tee used by the executor
//! - `collector` - tally results from the execution output
//! - `layout` - where every generated file goes
//! - `coordinator` - the per-run loop, reconciliation and outcomes

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod collector;
pub mod compiler;
pub mod coordinator;
pub mod discovery;
pub mod executor;
pub mod fanout;
pub mod filter;
pub mod layout;

use std::fmt;
use std::path::{Path, PathBuf};

pub use collector::{ResultTally, ResultsCollector};
pub use compiler::{CompileError, CompiledArtifact, Compiler};
pub use coordinator::{NullReporter, OutcomeStatus, RunCoordinator, RunError, RunOutcome, RunReporter, RunSummary};
pub use discovery::{DiscoveryError, FsSpecDiscovery, SpecDiscovery};
pub use executor::{Execution, ExecutionError, Executor, PartialReports};
pub use fanout::{BranchFailure, BranchKind, TeeDestination};
pub use filter::{AssertionCount, PendingPolicies, PendingPolicy, SpecFilter};
pub use layout::ReportLayout;

/// A discovered specification file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specification {
    pub path: PathBuf,
    /// File name, including the suffix (`sum.xspec`).
    pub name: String,
}

impl Specification {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name without `suffix`, used for report file names.
    pub fn stem(&self, suffix: &str) -> &str {
        self.name.strip_suffix(suffix).unwrap_or(&self.name)
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
