use std::path::{Path, PathBuf};

/// Directory marking a Sprig project root.
pub const PROJECT_DIR: &str = ".sprig";

/// Walk upwards from `start` until a `.sprig` directory is found.
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}
