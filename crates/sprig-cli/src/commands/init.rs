use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use sprig_config::SprigConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::InitArgs;
use crate::context::{AppContext, PROJECT_DIR};
use crate::output::output;

#[derive(Debug, Serialize)]
struct InitResponse {
    project_root: String,
    config_path: String,
    config_written: bool,
    database_path: String,
}

/// Handle `sprig init`.
pub async fn handle(args: &InitArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let root = match flags.project.as_deref() {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let project_dir = root.join(PROJECT_DIR);
    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("failed to create {}", project_dir.display()))?;

    let config_path = project_dir.join("config.toml");
    let config_written = args.force || !config_path.exists();
    if config_written {
        let rendered = toml::to_string_pretty(&SprigConfig::default())
            .context("failed to render default configuration")?;
        std::fs::write(&config_path, rendered)
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        tracing::info!(path = %config_path.display(), "wrote default config");
    }

    let config = SprigConfig::load_with_dotenv(&root)
        .context("failed to load sprig configuration")?;
    let database_path = config.database.resolve(&root);
    AppContext::init(root.clone(), config).await?;

    output(
        &InitResponse {
            project_root: root.display().to_string(),
            config_path: config_path.display().to_string(),
            config_written,
            database_path: database_path.display().to_string(),
        },
        flags.format,
    )
}
