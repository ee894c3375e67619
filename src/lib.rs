#![forbid(unsafe_code)]
//! XSpec test runner
//!
//! Discovers XSpec specifications, compiles each one into a test stylesheet with the XSpec compiler, runs it
//! once through an XSLT processor and fans its report out to a results collector, an XML archive and the
//! HTML reporter. Declared and observed assertion counts are reconciled so that tests lost to an aborted
//! execution show up as "missed" instead of disappearing.
//!
//! ## Modules
//!
//! - `xml` - owned XML events, streaming reader and writer, `Source`/`Destination` traits
//! - `engine` - transformation engine boundary and the external-process implementation
//! - `pipeline` - discovery, filter, compiler, executor, collector, coordinator
//! - `config` - run settings
//! - `cli` - command line
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `pipeline`
//!   modules enforce `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod version;
pub mod xml;

pub use config::RunnerConfig;
pub use engine::{Engine, ProcessEngine, Program};
pub use pipeline::{RunCoordinator, RunOutcome, RunSummary};
