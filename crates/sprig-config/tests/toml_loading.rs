//! Integration tests for layered configuration loading.
//!
//! Uses `figment::Jail` for sandboxed files and env vars.

use figment::Jail;
use pretty_assertions::assert_eq;
use sprig_config::{ConfigError, SprigConfig};

#[test]
fn loads_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sprig")?;
        jail.create_file(
            ".sprig/config.toml",
            r#"
[general]
default_limit = 50

[database]
path = "data/farm.db"

[orders]
harvest_lead_days = 2
max_catch_up = 4

[tasks]
batch_limit = 25
"#,
        )?;

        let config = SprigConfig::load_for_project(jail.directory()).expect("config loads");
        assert_eq!(config.general.default_limit, 50);
        assert_eq!(config.database.path, "data/farm.db");
        assert_eq!(config.orders.harvest_lead_days, 2);
        assert_eq!(config.orders.max_catch_up, 4);
        assert_eq!(config.tasks.batch_limit, 25);
        Ok(())
    });
}

#[test]
fn env_beats_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sprig")?;
        jail.create_file(".sprig/config.toml", "[orders]\nmax_catch_up = 4\n")?;
        jail.set_env("SPRIG_ORDERS__MAX_CATCH_UP", "9");

        let config = SprigConfig::load_for_project(jail.directory()).expect("config loads");
        assert_eq!(config.orders.max_catch_up, 9);
        Ok(())
    });
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sprig")?;
        jail.create_file(".sprig/config.toml", "[tasks]\nbatch_limit = 10\n")?;

        let config = SprigConfig::load_for_project(jail.directory()).expect("config loads");
        assert_eq!(config.tasks.batch_limit, 10);
        assert_eq!(config.orders.harvest_lead_days, 1);
        assert_eq!(config.general.default_limit, 20);
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected_after_merge() {
    Jail::expect_with(|jail| {
        jail.set_env("SPRIG_TASKS__BATCH_LIMIT", "0");

        let result = SprigConfig::load_for_project(jail.directory());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        Ok(())
    });
}

#[test]
fn malformed_toml_is_a_figment_error() {
    Jail::expect_with(|jail| {
        jail.create_dir(".sprig")?;
        jail.create_file(".sprig/config.toml", "[orders\nmax_catch_up = ")?;

        let result = SprigConfig::load_for_project(jail.directory());
        assert!(matches!(result, Err(ConfigError::Figment(_))));
        Ok(())
    });
}
