//! Output file naming under the report root.

use std::fs;
use std::path::{Path, PathBuf};

use super::Specification;

/// Sub-directory holding compiled test stylesheets.
pub const ARTIFACT_DIR: &str = "xslt";

#[derive(Debug, Clone)]
pub struct ReportLayout {
    root: PathBuf,
    suffix: String,
}

impl ReportLayout {
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join(ARTIFACT_DIR)
    }

    /// `xslt/<name>.xslt`
    pub fn artifact(&self, spec: &Specification) -> PathBuf {
        self.artifact_dir().join(format!("{}.xslt", spec.name))
    }

    /// `<stem>.xml`
    pub fn xml_report(&self, spec: &Specification) -> PathBuf {
        self.root.join(format!("{}.xml", spec.stem(&self.suffix)))
    }

    /// `<stem>.html`
    pub fn html_report(&self, spec: &Specification) -> PathBuf {
        self.root.join(format!("{}.html", spec.stem(&self.suffix)))
    }
}

/// Create `dir` if needed. Failure is only warned about; the write that needed the directory reports the
/// actual error against its specification.
pub fn ensure_dir(dir: &Path) {
    if let Err(e) = fs::create_dir_all(dir) {
        tracing::warn!("Failed to create directory {}: {}", dir.display(), e);
    }
}
