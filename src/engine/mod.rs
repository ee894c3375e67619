//! Transformation engine boundary.
//!
//! The pipeline never interprets XSLT itself. It loads programs (the XSpec compiler, the XSpec reporter and
//! every compiled test) through an [`Engine`] and drives them through the [`Program`] trait:
//!
//! - `transform` pulls an optional input [`Source`] and pushes the output into a [`Destination`]
//!   as it is produced;
//! - `open` starts a push-mode transform whose input is whatever gets written to the returned
//!   destination and whose serialized output goes to a file.
//!
//! Loaded programs are immutable and shared read-only (`Arc<dyn Program>`); every call owns its own
//! execution context.
//!
//! The shipped implementation is [`process::ProcessEngine`], which runs an external XSLT processor.

pub mod process;
pub mod resolver;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::xml::{Destination, Source, StreamError};

pub use process::ProcessEngine;
pub use resolver::{FsResolver, ResourceResolver};

/// Errors raised by an engine or a loaded program.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot load {system_id}: {message}")]
    Load { system_id: String, message: String },

    #[error("cannot launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("transformation failed ({status}){}", format_diagnostics(.diagnostics))]
    Runtime { status: String, diagnostics: String },

    #[error("cannot read transformation input: {0}")]
    Input(#[source] StreamError),

    #[error("cannot deliver transformation output: {0}")]
    Output(#[source] StreamError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn format_diagnostics(diagnostics: &str) -> String {
    let trimmed = diagnostics.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// The bytes of a program plus where they came from.
#[derive(Debug, Clone)]
pub struct ProgramSource {
    /// URI or path the program was resolved from; used in messages and as base URI.
    pub system_id: String,
    /// Filesystem location, when there is one.
    pub path: Option<PathBuf>,
    pub bytes: Vec<u8>,
}

impl ProgramSource {
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self {
            system_id: path.display().to_string(),
            path: Some(path.to_path_buf()),
            bytes,
        })
    }

    pub fn from_bytes(system_id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            system_id: system_id.into(),
            path: None,
            bytes,
        }
    }
}

/// How a program is invoked.
#[derive(Default)]
pub struct Invocation<'a> {
    /// Document to transform; `None` for programs started from a named template.
    pub input: Option<&'a mut (dyn Source + Send)>,
    /// Clark name (`{uri}local`) of the initial template.
    pub initial_template: Option<&'a str>,
}

impl<'a> Invocation<'a> {
    pub fn with_input(input: &'a mut (dyn Source + Send)) -> Self {
        Self {
            input: Some(input),
            initial_template: None,
        }
    }

    pub fn initial_template(name: &'a str) -> Self {
        Self {
            input: None,
            initial_template: Some(name),
        }
    }
}

/// A loaded, reusable transformation program.
pub trait Program: Send + Sync {
    /// Where the program was loaded from.
    fn system_id(&self) -> &str;

    /// Run once, pushing output events into `dest` as they are produced.
    ///
    /// Does not close `dest`. On failure, `dest` has received exactly the events produced before the
    /// failure.
    fn transform(&self, invocation: Invocation<'_>, dest: &mut dyn Destination) -> Result<(), EngineError>;

    /// Start a push-mode transform: events accepted by the returned destination are its input, its
    /// serialized result is written to `output`. Closing the destination waits for the transform to finish.
    fn open(&self, output: &Path) -> Result<Box<dyn Destination>, EngineError>;
}

/// Loads programs.
pub trait Engine: Send + Sync {
    fn load(&self, source: ProgramSource) -> Result<Arc<dyn Program>, EngineError>;
}

/// Which externally supplied program a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramRole {
    Compiler,
    Reporter,
}

impl fmt::Display for ProgramRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramRole::Compiler => write!(f, "Compiler"),
            ProgramRole::Reporter => write!(f, "Reporter"),
        }
    }
}

/// The XSpec compiler and reporter, loaded once per run and shared read-only by every specification.
#[derive(Clone)]
pub struct Programs {
    pub compiler: Arc<dyn Program>,
    pub reporter: Arc<dyn Program>,
}

impl fmt::Debug for Programs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Programs")
            .field("compiler", &self.compiler.system_id())
            .field("reporter", &self.reporter.system_id())
            .finish()
    }
}
