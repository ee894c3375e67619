//! Tallying results from an execution report.

use std::fmt;

use xspec_core::XSPEC_NS;
use xspec_core::vocab::{self, ElementId, PENDING_ATTR, SUCCESSFUL_ATTR};

use crate::xml::{Destination, SinkError, XmlEvent};

/// Observed results of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultTally {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

impl ResultTally {
    /// Number of result elements observed.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.pending
    }
}

impl fmt::Display for ResultTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} pending",
            self.passed, self.failed, self.pending
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Observing,
    Finalized,
}

/// Counts `x:test` results that are direct children of an `x:scenario`.
///
/// The report nests scenarios arbitrarily, and a test's payload (expected/actual results) may itself contain
/// XSpec-namespaced markup, so only the parent of a `test` element decides whether it is a result.
#[derive(Debug)]
pub struct ResultsCollector {
    state: CollectorState,
    tally: ResultTally,
    /// Whether each open element is an `x:scenario`.
    open: Vec<bool>,
}

impl Default for ResultsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsCollector {
    pub fn new() -> Self {
        Self {
            state: CollectorState::Idle,
            tally: ResultTally::default(),
            open: Vec::new(),
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// The final tally; `None` until the stream has been closed.
    pub fn tally(&self) -> Option<ResultTally> {
        match self.state {
            CollectorState::Finalized => Some(self.tally),
            _ => None,
        }
    }

    /// Finalize (if not already) and return the tally.
    pub fn finish(mut self) -> ResultTally {
        self.state = CollectorState::Finalized;
        self.tally
    }

    fn observe(&mut self, event: &XmlEvent) {
        match event {
            XmlEvent::Start(element) => {
                let id = if element.name.in_namespace(XSPEC_NS) {
                    vocab::from_local_name(&element.name.local)
                } else {
                    None
                };
                let parent_is_scenario = self.open.last().copied().unwrap_or(false);
                if id == Some(ElementId::Test) && parent_is_scenario {
                    if element.attr(PENDING_ATTR).is_some() {
                        self.tally.pending += 1;
                    } else if element.attr(SUCCESSFUL_ATTR).map(str::trim) == Some("true") {
                        self.tally.passed += 1;
                    } else {
                        self.tally.failed += 1;
                    }
                }
                self.open.push(id == Some(ElementId::Scenario));
            }
            XmlEvent::End(_) => {
                self.open.pop();
            }
            _ => {}
        }
    }
}

impl Destination for ResultsCollector {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        if self.state == CollectorState::Finalized {
            return Err(SinkError::Closed);
        }
        self.state = CollectorState::Observing;
        self.observe(event);
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.state == CollectorState::Finalized {
            return Err(SinkError::Closed);
        }
        self.state = CollectorState::Finalized;
        Ok(())
    }
}
