//! Runner version information.
//!
//! The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time and shared by the CLI
//! `--version` output and the JSON run summary.

/// The runner version string (for example, `0.1.0`).
pub const XSPEC_RUNNER_VERSION: &str = env!("CARGO_PKG_VERSION");
