//! Shared fixtures for pipeline integration tests.
//!
//! [`ScriptedEngine`] stands in for an XSLT processor:
//!
//! - `*compiler.xsl` wraps the filtered specification in an `xsl:stylesheet` element, unless the engine was told
//!   to reject it on load or to fail compiling specifications with a given file name;
//! - a compiled test replays the specification: every `x:expect` yields one `x:test` result decided by its
//!   label prefix (`pass`, `fail`), expects in pending context yield pending results, and an `abort` label
//!   stops the execution with a runtime error;
//! - `*reporter.xsl` serializes whatever it receives to the output file.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use xspec_core::{XML_NS, XSLT_NS, XSPEC_NS};
use xspec_runner::RunnerConfig;
use xspec_runner::engine::{Engine, EngineError, Invocation, Program, ProgramSource};
use xspec_runner::xml::{Destination, Name, Recorder, StartElement, StreamError, XmlEvent, XmlReader, XmlWriter};

#[derive(Debug, Default)]
pub struct Calls {
    pub loads: AtomicUsize,
    pub transforms: AtomicUsize,
    pub reports: AtomicUsize,
}

impl Calls {
    pub fn total(&self) -> usize {
        self.loads.load(Ordering::SeqCst) + self.transforms.load(Ordering::SeqCst) + self.reports.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScriptedEngine {
    pub calls: Arc<Calls>,
    /// Loading the compiler fails as if the stylesheet did not compile.
    pub reject_compiler: bool,
    /// File names of specifications the compiler stops on with a static error.
    pub failing_compiles: Vec<String>,
}

impl ScriptedEngine {
    pub fn rejecting_compiler(mut self) -> Self {
        self.reject_compiler = true;
        self
    }

    pub fn failing_compile(mut self, file_name: &str) -> Self {
        self.failing_compiles.push(file_name.to_string());
        self
    }
}

impl Engine for ScriptedEngine {
    fn load(&self, source: ProgramSource) -> Result<Arc<dyn Program>, EngineError> {
        self.calls.loads.fetch_add(1, Ordering::SeqCst);
        let calls = self.calls.clone();
        let system_id = source.system_id.clone();
        if system_id.ends_with("compiler.xsl") {
            if self.reject_compiler {
                return Err(EngineError::Load {
                    system_id,
                    message: "XTSE0010: unknown XSLT element".into(),
                });
            }
            let failing = self.failing_compiles.clone();
            return Ok(Arc::new(FakeCompiler {
                calls,
                system_id,
                failing,
            }));
        }
        if system_id.ends_with("reporter.xsl") {
            return Ok(Arc::new(FakeReporter { calls, system_id }));
        }
        let plan = Plan::read(&source.bytes).map_err(|message| EngineError::Load {
            system_id: system_id.clone(),
            message,
        })?;
        Ok(Arc::new(FakeTest { calls, system_id, plan }))
    }
}

struct FakeCompiler {
    calls: Arc<Calls>,
    system_id: String,
    failing: Vec<String>,
}

impl Program for FakeCompiler {
    fn system_id(&self) -> &str {
        &self.system_id
    }

    fn transform(&self, invocation: Invocation<'_>, dest: &mut dyn Destination) -> Result<(), EngineError> {
        self.calls.transforms.fetch_add(1, Ordering::SeqCst);
        let Some(input) = invocation.input else {
            return Err(EngineError::Runtime {
                status: "exit status: 2".into(),
                diagnostics: "no specification".into(),
            });
        };
        let mut spec = Recorder::new();
        input.pump(&mut spec).map_err(EngineError::Input)?;

        let base = spec
            .events
            .first()
            .and_then(XmlEvent::as_start)
            .and_then(|root| root.attr_ns(XML_NS, "base"))
            .unwrap_or_default();
        if self.failing.iter().any(|name| base.ends_with(&format!("/{name}"))) {
            return Err(EngineError::Runtime {
                status: "exit status: 2".into(),
                diagnostics: "XTSE0010: unknown XSpec element".into(),
            });
        }

        let stylesheet = Name::new("xsl:stylesheet", Some(XSLT_NS.to_string()), "stylesheet");
        let root = StartElement::new(stylesheet.clone())
            .with_attribute(Name::new("xmlns:xsl", None, "xmlns:xsl"), XSLT_NS)
            .with_attribute(Name::unqualified("version"), "3.0");
        let deliver = |e| EngineError::Output(StreamError::Sink(e));
        dest.accept(&XmlEvent::Start(root)).map_err(deliver)?;
        for event in &spec.events {
            dest.accept(event).map_err(deliver)?;
        }
        dest.accept(&XmlEvent::End(stylesheet)).map_err(deliver)?;
        Ok(())
    }

    fn open(&self, _output: &Path) -> Result<Box<dyn Destination>, EngineError> {
        Err(EngineError::Load {
            system_id: self.system_id.clone(),
            message: "not a push-mode program".into(),
        })
    }
}

struct FakeReporter {
    calls: Arc<Calls>,
    system_id: String,
}

impl Program for FakeReporter {
    fn system_id(&self) -> &str {
        &self.system_id
    }

    fn transform(&self, _invocation: Invocation<'_>, _dest: &mut dyn Destination) -> Result<(), EngineError> {
        self.calls.transforms.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn open(&self, output: &Path) -> Result<Box<dyn Destination>, EngineError> {
        self.calls.reports.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(XmlWriter::create(output)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Enter(String),
    Leave,
    Pass,
    Fail,
    Pending,
    Abort,
}

#[derive(Debug, Clone, Default)]
struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// Read the replay plan out of a compiled test.
    fn read(bytes: &[u8]) -> Result<Self, String> {
        let mut reader = XmlReader::new(bytes);
        let mut steps = Vec::new();
        // (is a scenario, in pending context) per open element
        let mut open: Vec<(bool, bool)> = Vec::new();
        let mut saw_stylesheet = false;

        while let Some(event) = reader.next_event().map_err(|e| e.to_string())? {
            match event {
                XmlEvent::Start(element) => {
                    if open.is_empty() {
                        saw_stylesheet = element.name.is(XSLT_NS, "stylesheet");
                    }
                    let inherited = open.last().is_some_and(|(_, pending)| *pending);
                    let marked = element.attr("pending").is_some();
                    let label = element.attr("label").unwrap_or_default().to_string();
                    let xspec = element.name.in_namespace(XSPEC_NS);
                    let local = element.name.local.as_str();

                    let entry = match (xspec, local) {
                        (true, "scenario") => {
                            steps.push(Step::Enter(label));
                            (true, inherited || marked)
                        }
                        (true, "pending") => (false, true),
                        (true, "expect") => {
                            let pending = inherited || marked;
                            steps.push(if pending {
                                Step::Pending
                            } else if label.starts_with("abort") {
                                Step::Abort
                            } else if label.starts_with("fail") {
                                Step::Fail
                            } else {
                                Step::Pass
                            });
                            (false, pending)
                        }
                        _ => (false, inherited),
                    };
                    open.push(entry);
                }
                XmlEvent::End(_) => {
                    if let Some((true, _)) = open.pop() {
                        steps.push(Step::Leave);
                    }
                }
                _ => {}
            }
        }

        if !saw_stylesheet {
            return Err("not a compiled XSpec test".into());
        }
        Ok(Self { steps })
    }
}

struct FakeTest {
    calls: Arc<Calls>,
    system_id: String,
    plan: Plan,
}

impl Program for FakeTest {
    fn system_id(&self) -> &str {
        &self.system_id
    }

    fn transform(&self, invocation: Invocation<'_>, dest: &mut dyn Destination) -> Result<(), EngineError> {
        self.calls.transforms.fetch_add(1, Ordering::SeqCst);
        assert_eq!(
            invocation.initial_template.map(str::to_string),
            Some(xspec_core::main_template_clark_name())
        );

        let deliver = |e| EngineError::Output(StreamError::Sink(e));
        let report = Name::xspec("report");
        let root = StartElement::new(report.clone()).with_attribute(Name::new("xmlns:x", None, "xmlns:x"), XSPEC_NS);
        dest.accept(&XmlEvent::Start(root)).map_err(deliver)?;

        for step in &self.plan.steps {
            let test = |attr: &str, value: &str| {
                XmlEvent::Start(StartElement::new(Name::xspec("test")).with_attribute(Name::unqualified(attr), value))
            };
            let events = match step {
                Step::Enter(label) => vec![XmlEvent::Start(
                    StartElement::new(Name::xspec("scenario")).with_attribute(Name::unqualified("label"), label.clone()),
                )],
                Step::Leave => vec![XmlEvent::End(Name::xspec("scenario"))],
                Step::Pass => vec![test("successful", "true"), XmlEvent::End(Name::xspec("test"))],
                Step::Fail => vec![test("successful", "false"), XmlEvent::End(Name::xspec("test"))],
                Step::Pending => vec![test("pending", "later"), XmlEvent::End(Name::xspec("test"))],
                Step::Abort => {
                    return Err(EngineError::Runtime {
                        status: "exit status: 2".into(),
                        diagnostics: "XTDE0555: test aborted".into(),
                    });
                }
            };
            for event in &events {
                dest.accept(event).map_err(deliver)?;
            }
        }

        dest.accept(&XmlEvent::End(report)).map_err(deliver)?;
        Ok(())
    }

    fn open(&self, _output: &Path) -> Result<Box<dyn Destination>, EngineError> {
        Err(EngineError::Load {
            system_id: self.system_id.clone(),
            message: "not a push-mode program".into(),
        })
    }
}

// ============================================================================
// Workspace fixture
// ============================================================================

const STYLESHEET: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="3.0"/>"#;

/// A scratch project: compiler and reporter stylesheets, a spec directory and a report directory.
pub struct Project {
    pub dir: tempfile::TempDir,
    pub engine: ScriptedEngine,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("xspec")).unwrap();
        fs::write(dir.path().join("xspec/compiler.xsl"), STYLESHEET).unwrap();
        fs::write(dir.path().join("xspec/reporter.xsl"), STYLESHEET).unwrap();
        fs::create_dir_all(dir.path().join("specs")).unwrap();
        Self {
            dir,
            engine: ScriptedEngine::default(),
        }
    }

    pub fn specs_dir(&self) -> PathBuf {
        self.dir.path().join("specs")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.dir.path().join("reports")
    }

    pub fn config(&self) -> RunnerConfig {
        RunnerConfig::new()
            .with_compiler(self.dir.path().join("xspec/compiler.xsl").display().to_string())
            .with_reporter(self.dir.path().join("xspec/reporter.xsl").display().to_string())
            .with_test_dir(self.specs_dir())
            .with_report_dir(self.reports_dir())
    }

    /// Write a specification with one scenario per group of expect labels.
    pub fn spec(&self, relative: &str, scenarios: &[&[&str]]) -> PathBuf {
        self.write(relative, &description(scenarios))
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.specs_dir().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

/// An `x:description` with one scenario per group of expect labels.
pub fn description(scenarios: &[&[&str]]) -> String {
    let mut doc = format!(r#"<x:description xmlns:x="{XSPEC_NS}" stylesheet="under-test.xsl">"#);
    for (i, labels) in scenarios.iter().enumerate() {
        doc.push_str(&format!(r#"<x:scenario label="scenario {i}"><x:call template="t"/>"#));
        for label in labels.iter() {
            doc.push_str(&format!(r#"<x:expect label="{label}" select="1"/>"#));
        }
        doc.push_str("</x:scenario>");
    }
    doc.push_str("</x:description>");
    doc
}
