//! Run reporters for the command line.
//!
//! - [`ConsoleReporter`]: pytest-style progress on stderr
//! - [`summary_json`] / [`write_summary_json`]: machine-readable summary of a finished run

use std::fs;
use std::io::{self, Stderr, Write};
use std::path::Path;

use serde_json::{Value, json};

use crate::pipeline::{OutcomeStatus, RunOutcome, RunReporter, RunSummary, Specification};
use crate::version::XSPEC_RUNNER_VERSION;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Console reporter (pytest-style)
pub struct ConsoleReporter<W: Write = Stderr> {
    out: W,
    pub verbose: bool,
    pub color: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self::with_output(io::stderr(), verbose, true)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_output(out: W, verbose: bool, color: bool) -> Self {
        Self { out, verbose, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn status_color(status: OutcomeStatus) -> &'static str {
        match status {
            OutcomeStatus::Passed => GREEN,
            OutcomeStatus::Failed | OutcomeStatus::Error => RED,
        }
    }

    // Console output is best effort; a closed stderr must not fail the run.
    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

impl<W: Write> RunReporter for ConsoleReporter<W> {
    fn on_discovered(&mut self, root: &Path, specs: &[Specification]) {
        let line = if specs.is_empty() {
            format!("No XSpec tests found in {}\n", root.display())
        } else {
            format!("collected {} specification(s) in {}\n", specs.len(), root.display())
        };
        self.emit(&line);
    }

    fn on_spec_start(&mut self, spec: &Specification) {
        if self.verbose {
            let text = format!("{} ... ", spec.name);
            self.emit(&text);
        }
    }

    fn on_outcome(&mut self, outcome: &RunOutcome) {
        let color = Self::status_color(outcome.status);
        let text = if self.verbose {
            format!("{}\n", self.paint(color, &outcome.status.as_str().to_uppercase()))
        } else {
            let mark = match outcome.status {
                OutcomeStatus::Passed => ".",
                OutcomeStatus::Failed => "F",
                OutcomeStatus::Error => "E",
            };
            self.paint(color, mark)
        };
        self.emit(&text);

        if !outcome.success() {
            let mut details = format!("\n{}\n", self.paint(RED, &outcome.summary_line()));
            for error in &outcome.errors {
                details.push_str(&format!("  {error}\n"));
            }
            self.emit(&details);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if summary.skipped {
            let text = format!("{}\n", self.paint(YELLOW, "XSpec tests skipped"));
            self.emit(&text);
            return;
        }

        let mut parts = Vec::new();
        let passed = summary.count(OutcomeStatus::Passed);
        let failed = summary.count(OutcomeStatus::Failed);
        let errors = summary.count(OutcomeStatus::Error);
        let (_, tally, missed) = summary.totals();
        if passed > 0 {
            parts.push(self.paint(GREEN, &format!("{passed} passed")));
        }
        if failed > 0 {
            parts.push(self.paint(RED, &format!("{failed} failed")));
        }
        if errors > 0 {
            parts.push(self.paint(RED, &format!("{errors} error")));
        }
        if missed > 0 {
            parts.push(self.paint(RED, &format!("{missed} assertion(s) missed")));
        }
        if tally.pending > 0 {
            parts.push(self.paint(YELLOW, &format!("{} pending", tally.pending)));
        }
        if parts.is_empty() {
            parts.push("no specifications".to_string());
        }

        let lead = if self.verbose { "" } else { "\n" };
        let text = format!(
            "{lead}\n====== {} in {:.2}s ======\n",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
        self.emit(&text);
    }
}

fn outcome_json(outcome: &RunOutcome) -> Value {
    json!({
        "name": outcome.spec.name,
        "path": outcome.spec.path.display().to_string(),
        "status": outcome.status.as_str(),
        "compiled": outcome.compiled,
        "declared": outcome.declared,
        "passed": outcome.tally.passed,
        "failed": outcome.tally.failed,
        "pending": outcome.tally.pending,
        "missed": outcome.missed,
        "elided": outcome.elided,
        "errors": outcome.errors,
    })
}

/// The run as a JSON document.
pub fn summary_json(summary: &RunSummary) -> Value {
    let (declared, tally, missed) = summary.totals();
    json!({
        "runner_version": XSPEC_RUNNER_VERSION,
        "success": summary.success(),
        "skipped": summary.skipped,
        "duration_ms": summary.duration.as_millis() as u64,
        "totals": {
            "declared": declared,
            "passed": tally.passed,
            "failed": tally.failed,
            "pending": tally.pending,
            "missed": missed,
        },
        "specifications": summary.outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
    })
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(&summary_json(summary)).map_err(io::Error::other)?;
    fs::write(path, text + "\n")
}
