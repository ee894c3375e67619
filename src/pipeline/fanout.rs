//! Duplicating one event stream to several destinations.

use std::fmt;

use crate::xml::{Destination, SinkError, XmlEvent};

/// The consumers of an execution's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Structured results, tallied by the collector.
    Results,
    /// Verbatim XML archive.
    Archive,
    /// HTML report rendered by the reporter program.
    Report,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchKind::Results => "results",
            BranchKind::Archive => "XML report",
            BranchKind::Report => "HTML report",
        };
        f.write_str(name)
    }
}

/// A branch that stopped receiving events.
#[derive(Debug)]
pub struct BranchFailure {
    pub branch: BranchKind,
    pub error: SinkError,
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} branch failed: {}", self.branch, self.error)
    }
}

struct Branch<'a> {
    kind: BranchKind,
    dest: Option<Box<dyn Destination + 'a>>,
}

/// Hands every event to each live branch in turn.
///
/// A branch whose `accept` fails is detached and its error kept; the other branches keep receiving events,
/// so the tee itself never rejects an event. Closing the tee closes every branch that is still attached.
pub struct TeeDestination<'a> {
    branches: Vec<Branch<'a>>,
    failures: Vec<BranchFailure>,
    closed: bool,
}

impl Default for TeeDestination<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TeeDestination<'a> {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            failures: Vec::new(),
            closed: false,
        }
    }

    pub fn add_branch(&mut self, kind: BranchKind, dest: impl Destination + 'a) -> &mut Self {
        self.branches.push(Branch {
            kind,
            dest: Some(Box::new(dest)),
        });
        self
    }

    /// Record a branch that could not even be set up.
    pub fn add_failed_branch(&mut self, kind: BranchKind, error: SinkError) -> &mut Self {
        self.fail(kind, error);
        self
    }

    /// Number of branches still receiving events.
    pub fn live_branches(&self) -> usize {
        self.branches.iter().filter(|b| b.dest.is_some()).count()
    }

    /// Close (if needed) and return every failure recorded so far.
    pub fn finish(mut self) -> Vec<BranchFailure> {
        if !self.closed {
            self.close_branches();
        }
        self.failures
    }

    fn fail(&mut self, kind: BranchKind, error: SinkError) {
        tracing::warn!("{} branch failed: {}", kind, error);
        self.failures.push(BranchFailure { branch: kind, error });
    }

    fn close_branches(&mut self) {
        self.closed = true;
        let mut failed = Vec::new();
        for branch in &mut self.branches {
            let Some(mut dest) = branch.dest.take() else {
                continue;
            };
            if let Err(error) = dest.close() {
                failed.push((branch.kind, error));
            }
        }
        for (kind, error) in failed {
            self.fail(kind, error);
        }
    }
}

impl Destination for TeeDestination<'_> {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        let mut failed = Vec::new();
        for branch in &mut self.branches {
            let Some(dest) = branch.dest.as_mut() else {
                continue;
            };
            if let Err(error) = dest.accept(event) {
                // Detached without close: a branch that rejected an event is in an unknown state.
                branch.dest = None;
                failed.push((branch.kind, error));
            }
        }
        for (kind, error) in failed {
            self.fail(kind, error);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.close_branches();
        Ok(())
    }
}
