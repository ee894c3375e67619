//! Compiling a specification into an executable test stylesheet.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::filter::{AssertionCount, PendingPolicies, SpecFilter};
use super::layout::{ReportLayout, ensure_dir};
use super::Specification;
use crate::engine::{EngineError, Invocation, Program};
use crate::xml::{Destination, SinkError, StreamError, XmlError, XmlWriter};

/// Why one specification could not be compiled. Never fatal to the run.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("specification {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read specification {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed specification {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    #[error("XSpec compiler failed: {0}")]
    Engine(#[source] EngineError),

    #[error("cannot write compiled test {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: SinkError,
    },
}

/// A compiled specification, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub spec: Specification,
    /// The compiled test stylesheet on disk.
    pub path: PathBuf,
    pub count: AssertionCount,
}

impl CompiledArtifact {
    pub fn declared(&self) -> usize {
        self.count.declared
    }
}

/// Runs the XSpec compiler program over filtered specifications.
pub struct Compiler {
    program: Arc<dyn Program>,
    layout: ReportLayout,
    policies: PendingPolicies,
}

impl Compiler {
    pub fn new(program: Arc<dyn Program>, layout: ReportLayout, policies: PendingPolicies) -> Self {
        Self {
            program,
            layout,
            policies,
        }
    }

    #[tracing::instrument(skip_all, fields(spec = %spec.name))]
    pub fn compile(&self, spec: &Specification) -> Result<CompiledArtifact, CompileError> {
        if !spec.path.is_file() {
            return Err(CompileError::NotFound(spec.path.clone()));
        }
        tracing::info!("Compiling XSpec to XSLT: {}", spec.path.display());

        let mut filter = SpecFilter::open(&spec.path, self.policies).map_err(|source| CompileError::Read {
            path: spec.path.clone(),
            source,
        })?;

        let path = self.layout.artifact(spec);
        ensure_dir(&self.layout.artifact_dir());
        let artifact_error = |source: SinkError| CompileError::Artifact {
            path: path.clone(),
            source,
        };
        let mut writer = XmlWriter::create(&path).map_err(|e| artifact_error(e.into()))?;

        self.program
            .transform(Invocation::with_input(&mut filter), &mut writer)
            .map_err(|e| match e {
                EngineError::Input(StreamError::Xml(source)) => CompileError::Malformed {
                    path: spec.path.clone(),
                    source,
                },
                EngineError::Output(StreamError::Sink(source)) => artifact_error(source),
                other => CompileError::Engine(other),
            })?;
        writer.close().map_err(artifact_error)?;

        let count = filter.count().ok_or_else(|| {
            CompileError::Engine(EngineError::Input(StreamError::Sink(SinkError::Failed(
                "the compiler did not consume the whole specification".into(),
            ))))
        })?;
        tracing::debug!("Compiled {} to {}", spec.name, path.display());

        Ok(CompiledArtifact {
            spec: spec.clone(),
            path,
            count,
        })
    }
}
