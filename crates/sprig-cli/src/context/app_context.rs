use std::path::PathBuf;

use anyhow::Context;
use sprig_config::SprigConfig;
use sprig_db::service::{ServiceSettings, SprigService};

/// Shared application resources initialized once at startup.
pub struct AppContext {
    pub service: SprigService,
    pub config: SprigConfig,
    pub project_root: PathBuf,
}

impl AppContext {
    /// Open the project's database with settings taken from `config`.
    pub async fn init(project_root: PathBuf, config: SprigConfig) -> anyhow::Result<Self> {
        let db_path = config.database.resolve(&project_root);
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let settings = ServiceSettings::from(&config);
        let service = SprigService::new_local(&db_path.to_string_lossy(), settings)
            .await
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        tracing::debug!(db = %db_path.display(), "database opened");

        Ok(Self {
            service,
            config,
            project_root,
        })
    }

    /// Limit from `--limit`, else the configured default.
    #[must_use]
    pub fn limit(&self, flag: Option<u32>) -> u32 {
        crate::commands::shared::limit::effective_limit(flag, self.config.general.default_limit)
    }
}
