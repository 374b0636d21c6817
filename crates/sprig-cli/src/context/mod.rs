mod app_context;
mod project_root;

pub use app_context::AppContext;
pub use project_root::{PROJECT_DIR, find_project_root};
