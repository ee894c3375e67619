//! Finding specification files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Specification;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("test directory {} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Enumerates the specifications of a run.
pub trait SpecDiscovery {
    /// Every specification under `root`, at any depth, in a stable order.
    fn discover(&self, root: &Path) -> Result<Vec<Specification>, DiscoveryError>;
}

/// Recursive filesystem scan for files whose name ends with a suffix.
///
/// Results are sorted by path. Symlinked files are included; symlinked directories are not descended into.
#[derive(Debug, Clone)]
pub struct FsSpecDiscovery {
    suffix: String,
}

impl Default for FsSpecDiscovery {
    fn default() -> Self {
        Self::new(xspec_core::SPEC_SUFFIX)
    }
}

impl FsSpecDiscovery {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { suffix: suffix.into() }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    fn walk(&self, dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), DiscoveryError> {
        let unreadable = |source| DiscoveryError::Unreadable {
            path: dir.to_path_buf(),
            source,
        };
        for entry in fs::read_dir(dir).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(unreadable)?;

            if file_type.is_dir() {
                self.walk(&path, found)?;
            } else if self.matches(&path) && path.is_file() {
                found.push(path);
            } else if file_type.is_symlink() {
                tracing::debug!("Not following {}", path.display());
            }
        }
        Ok(())
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(&self.suffix))
    }
}

impl SpecDiscovery for FsSpecDiscovery {
    fn discover(&self, root: &Path) -> Result<Vec<Specification>, DiscoveryError> {
        if !root.exists() {
            return Err(DiscoveryError::Missing(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
        }

        let mut found = Vec::new();
        self.walk(root, &mut found)?;
        found.sort();
        tracing::debug!("Found {} specification(s) under {}", found.len(), root.display());
        Ok(found.into_iter().map(Specification::new).collect())
    }
}
