//! Database location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path to the libSQL database file. Empty means `<project>/.sprig/sprig.db`.
    #[serde(default)]
    pub path: String,
}

impl DatabaseConfig {
    /// Resolve the database file for a project rooted at `project_root`.
    ///
    /// Relative configured paths are resolved against the project root.
    #[must_use]
    pub fn resolve(&self, project_root: &Path) -> PathBuf {
        if self.path.is_empty() {
            return project_root.join(".sprig").join("sprig.db");
        }
        let configured = PathBuf::from(&self.path);
        if configured.is_absolute() {
            configured
        } else {
            project_root.join(configured)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_defaults_into_project_dir() {
        let config = DatabaseConfig::default();
        assert_eq!(
            config.resolve(Path::new("/farm")),
            PathBuf::from("/farm/.sprig/sprig.db")
        );
    }

    #[test]
    fn relative_path_is_joined_to_project_root() {
        let config = DatabaseConfig {
            path: "data/farm.db".into(),
        };
        assert_eq!(
            config.resolve(Path::new("/farm")),
            PathBuf::from("/farm/data/farm.db")
        );
    }

    #[test]
    fn absolute_path_is_kept() {
        let config = DatabaseConfig {
            path: "/var/lib/sprig.db".into(),
        };
        assert_eq!(
            config.resolve(Path::new("/farm")),
            PathBuf::from("/var/lib/sprig.db")
        );
    }
}
