//! Locating the externally supplied stylesheets.

use std::io;
use std::path::{Path, PathBuf};

use super::ProgramSource;

/// Turns a configured location into program bytes.
///
/// `Ok(None)` means "not found", which the caller reports as a fatal configuration problem.
pub trait ResourceResolver {
    fn resolve(&self, location: &str) -> io::Result<Option<ProgramSource>>;
}

/// Resolves plain paths and `file:` URIs against a base directory.
#[derive(Debug, Clone)]
pub struct FsResolver {
    base: PathBuf,
}

impl FsResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn to_path(&self, location: &str) -> PathBuf {
        let stripped = location
            .strip_prefix("file://")
            .or_else(|| location.strip_prefix("file:"))
            .unwrap_or(location);
        let path = Path::new(stripped);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

impl ResourceResolver for FsResolver {
    fn resolve(&self, location: &str) -> io::Result<Option<ProgramSource>> {
        let path = self.to_path(location);
        if !path.is_file() {
            tracing::debug!("No resource at {}", path.display());
            return Ok(None);
        }
        ProgramSource::from_file(&path).map(Some)
    }
}
