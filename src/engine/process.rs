//! External-process engine.
//!
//! Runs every transform as a child process of an XSLT 3.0 processor with a Saxon-compatible command line:
//!
//! ```text
//! <program> <args..> -xsl:<stylesheet> [-s:-] [-it:{uri}local]
//! ```
//!
//! Input documents are serialized to the child's stdin from a scoped thread while the main thread parses the
//! child's stdout and pushes events into the destination as they arrive. stderr is drained concurrently and
//! attached to runtime errors.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use xspec_core::XSLT_NS;

use super::{Engine, EngineError, Invocation, Program, ProgramSource};
use crate::xml::{Destination, SinkError, Source, StreamError, XmlEvent, XmlReader, XmlWriter};

/// Processor command used when none is configured.
pub const DEFAULT_PROCESSOR: &str = "saxon";

/// Root elements accepted as a stylesheet.
const STYLESHEET_ROOTS: &[&str] = &["stylesheet", "transform", "package"];

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    args: Vec<String>,
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSOR, Vec::new())
    }
}

impl ProcessEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line (`java -jar saxon.jar`). Blank means the default processor.
    pub fn from_command_line(command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_string);
        match words.next() {
            Some(program) => Self::new(program, words.collect()),
            None => Self::default(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Engine for ProcessEngine {
    fn load(&self, source: ProgramSource) -> Result<Arc<dyn Program>, EngineError> {
        let load_error = |message: String| EngineError::Load {
            system_id: source.system_id.clone(),
            message,
        };

        let Some(path) = source.path.clone() else {
            return Err(load_error("an external processor needs a stylesheet on disk".into()));
        };
        check_stylesheet(&source.bytes).map_err(load_error)?;

        tracing::debug!("Loaded stylesheet {}", source.system_id);
        Ok(Arc::new(ProcessProgram {
            engine: self.clone(),
            stylesheet: path,
            system_id: source.system_id,
        }))
    }
}

/// Check that the bytes are a well-formed document whose root is an XSLT stylesheet.
fn check_stylesheet(bytes: &[u8]) -> Result<(), String> {
    let mut reader = XmlReader::new(bytes);
    loop {
        match reader.next_event() {
            Ok(Some(XmlEvent::Start(root))) => {
                if root.name.in_namespace(XSLT_NS) && STYLESHEET_ROOTS.contains(&root.name.local.as_str()) {
                    break;
                }
                return Err(format!("root element <{}> is not an XSLT stylesheet", root.name.qualified));
            }
            Ok(Some(_)) => continue,
            Ok(None) => return Err("empty document".into()),
            Err(e) => return Err(e.to_string()),
        }
    }
    // The rest must parse too; a stylesheet truncated half-way is a load failure, not a runtime one.
    loop {
        match reader.next_event() {
            Ok(Some(_)) => continue,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e.to_string()),
        }
    }
}

#[derive(Debug)]
struct ProcessProgram {
    engine: ProcessEngine,
    stylesheet: PathBuf,
    system_id: String,
}

impl ProcessProgram {
    fn command(&self) -> Command {
        let mut command = Command::new(&self.engine.program);
        command
            .args(&self.engine.args)
            .arg(format!("-xsl:{}", self.stylesheet.display()));
        command
    }

    fn spawn(&self, mut command: Command) -> Result<Child, EngineError> {
        command.spawn().map_err(|source| EngineError::Launch {
            command: self.engine.command_line(),
            source,
        })
    }
}

impl Program for ProcessProgram {
    fn system_id(&self) -> &str {
        &self.system_id
    }

    #[tracing::instrument(skip_all, fields(stylesheet = %self.system_id))]
    fn transform(&self, invocation: Invocation<'_>, dest: &mut dyn Destination) -> Result<(), EngineError> {
        let Invocation {
            input,
            initial_template,
        } = invocation;

        let mut command = self.command();
        if let Some(template) = initial_template {
            command.arg(format!("-it:{template}"));
        }
        if input.is_some() {
            command.arg("-s:-").stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = self.spawn(command)?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        thread::scope(|scope| {
            let feeder = match (input, stdin) {
                (Some(source), Some(stdin)) => Some(scope.spawn(move || feed(source, stdin))),
                _ => None,
            };
            let drainer = stderr.map(|stderr| scope.spawn(move || drain(stderr)));

            let read = match stdout {
                Some(stdout) => {
                    let mut stdout = BufReader::new(stdout);
                    let read = XmlReader::new(&mut stdout).pump(dest);
                    match read {
                        // Nobody is listening any more; don't let the processor run on.
                        Err(StreamError::Sink(_)) => {
                            let _ = child.kill();
                        }
                        // Keep the pipe drained so the processor can exit on its own.
                        Err(StreamError::Xml(_)) => {
                            let _ = io::copy(&mut stdout, &mut io::sink());
                        }
                        Ok(()) => {}
                    }
                    read
                }
                None => Ok(()),
            };

            let fed = match feeder {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(SinkError::Failed("input feeder panicked".into()).into())),
                None => Ok(()),
            };
            let diagnostics = drainer.and_then(|h| h.join().ok()).unwrap_or_default();
            let status = child.wait()?;

            match (fed, read) {
                // A malformed input explains whatever the processor did next.
                (Err(err @ StreamError::Xml(_)), _) => Err(EngineError::Input(err)),
                (_, Err(err @ StreamError::Sink(_))) => Err(EngineError::Output(err)),
                _ if !status.success() => Err(EngineError::Runtime {
                    status: status.to_string(),
                    diagnostics,
                }),
                (Err(err), _) => Err(EngineError::Input(err)),
                (_, Err(err)) => Err(EngineError::Output(err)),
                (Ok(()), Ok(())) => Ok(()),
            }
        })
    }

    fn open(&self, output: &Path) -> Result<Box<dyn Destination>, EngineError> {
        let file = File::create(output)?;
        let mut command = self.command();
        command
            .arg("-s:-")
            .stdin(Stdio::piped())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped());

        let mut child = self.spawn(command)?;
        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Load {
                system_id: self.system_id.clone(),
                message: "processor stdin unavailable".into(),
            });
        };
        let drainer = child.stderr.take().map(|stderr| thread::spawn(move || drain(stderr)));

        Ok(Box::new(PipedTransform {
            child,
            writer: Some(XmlWriter::new(BufWriter::new(stdin))),
            drainer,
            system_id: self.system_id.clone(),
        }))
    }
}

fn feed(source: &mut (dyn Source + Send), stdin: ChildStdin) -> Result<(), StreamError> {
    let mut writer = XmlWriter::new(BufWriter::new(stdin));
    source.pump(&mut writer)?;
    writer.close()?;
    Ok(())
}

fn drain(mut stderr: ChildStderr) -> String {
    let mut text = String::new();
    let _ = stderr.read_to_string(&mut text);
    text
}

/// A running processor fed through its stdin.
struct PipedTransform {
    child: Child,
    writer: Option<XmlWriter<BufWriter<ChildStdin>>>,
    drainer: Option<JoinHandle<String>>,
    system_id: String,
}

impl Destination for PipedTransform {
    fn accept(&mut self, event: &XmlEvent) -> Result<(), SinkError> {
        match self.writer.as_mut() {
            Some(writer) => writer.accept(event),
            None => Err(SinkError::Closed),
        }
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let Some(mut writer) = self.writer.take() else {
            return Err(SinkError::Closed);
        };
        let flushed = writer.close();
        // Dropping the writer closes stdin so the processor sees end of input.
        drop(writer);

        let status = self.child.wait()?;
        let diagnostics = self.drainer.take().and_then(|h| h.join().ok()).unwrap_or_default();
        if !status.success() {
            return Err(SinkError::Failed(format!(
                "{} failed ({status}){}",
                self.system_id,
                super::format_diagnostics(&diagnostics)
            )));
        }
        flushed
    }
}

impl Drop for PipedTransform {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
