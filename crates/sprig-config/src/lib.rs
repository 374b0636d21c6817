//! # sprig-config
//!
//! Layered configuration loading for Sprig using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SPRIG_*` prefix, `__` as separator)
//! 2. Project-level `.sprig/config.toml`
//! 3. User-level `~/.config/sprig/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SPRIG_ORDERS__MAX_CATCH_UP` -> `orders.max_catch_up`,
//! `SPRIG_DATABASE__PATH` -> `database.path`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use sprig_config::SprigConfig;
//!
//! let config = SprigConfig::load_for_project(std::path::Path::new(".")).expect("config");
//! println!("harvest lead: {} days", config.orders.harvest_lead_days);
//! ```

mod database;
mod error;
mod export;
mod general;
mod orders;
mod tasks;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use export::ExportConfig;
pub use general::GeneralConfig;
pub use orders::OrdersConfig;
pub use tasks::TasksConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SprigConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl SprigConfig {
    /// Load configuration for the project rooted at `project_root`.
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_for_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(project_root).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<project>/.env` (if present), then the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if extraction fails or a value is out of range.
    pub fn load_with_dotenv(project_root: &Path) -> Result<Self, ConfigError> {
        let env_path = project_root.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        } else {
            let _ = dotenvy::dotenv();
        }
        Self::load_for_project(project_root)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or layer extra providers.
    #[must_use]
    pub fn figment(project_root: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = project_root.join(".sprig").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("SPRIG_").split("__"))
    }

    /// Reject values the jobs cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orders.max_catch_up == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orders.max_catch_up".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.orders.harvest_lead_days < 0 {
            return Err(ConfigError::InvalidValue {
                field: "orders.harvest_lead_days".into(),
                reason: "must not be negative".into(),
            });
        }
        if self.tasks.batch_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tasks.batch_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sprig").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SprigConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.general.default_limit, 20);
        assert_eq!(config.orders.harvest_lead_days, 1);
        assert_eq!(config.orders.max_catch_up, 12);
        assert_eq!(config.tasks.batch_limit, 200);
        assert!(config.database.path.is_empty());
    }

    #[test]
    fn zero_catch_up_is_rejected() {
        let mut config = SprigConfig::default();
        config.orders.max_catch_up = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("orders.max_catch_up"));
    }

    #[test]
    fn negative_lead_days_is_rejected() {
        let mut config = SprigConfig::default();
        config.orders.harvest_lead_days = -2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
