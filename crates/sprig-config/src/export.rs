//! Export bundle settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Directory for bundles written without `--output`. Empty means
    /// `<project>/.sprig/exports`.
    #[serde(default)]
    pub directory: String,
}

impl ExportConfig {
    #[must_use]
    pub fn resolve_dir(&self, project_root: &Path) -> PathBuf {
        if self.directory.is_empty() {
            project_root.join(".sprig").join("exports")
        } else {
            project_root.join(&self.directory)
        }
    }
}
