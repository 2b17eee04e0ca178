//! Configuration for the GeoTrack workers.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. `config/default.{toml,yaml,json}` (optional)
//! 2. `config/<RUN_ENV>.{toml,yaml,json}` (optional, `RUN_ENV` defaults to `debug`)
//! 3. `GEOTRACK__SECTION__KEY` environment variables
//!
//! String values equal to `secret_from_env` are then resolved from the secret
//! environment variables described in [`env_vars`]. Nothing is logged while
//! loading, so unresolved markers are returned in
//! [`AppConfig::unresolved_secrets`] for the caller to report.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;

pub mod env_vars;
pub mod models;

pub use models::*;

/// Loads the application configuration.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let config_dir = env::var("GEOTRACK_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    load_config_from(&config_dir, &run_env)
}

/// Loads the configuration from an explicit directory and run environment.
pub fn load_config_from(config_dir: &std::path::Path, run_env: &str) -> Result<AppConfig, ConfigError> {
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(run_env);

    let builder = Config::builder()
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(
            Environment::with_prefix(env_vars::CONFIG_PREFIX)
                .prefix_separator(env_vars::CONFIG_SEPARATOR)
                .separator(env_vars::CONFIG_SEPARATOR)
                .try_parsing(true),
        );

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    let config = apply_env_overrides_from_marker(raw_config)?;
    config.tracking.validate()?;
    Ok(config)
}

/// Replaces every `secret_from_env` marker in the configuration with the
/// matching secret environment variable.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    let unresolved = env_vars::resolve_secret_markers(&mut json);
    let mut config: AppConfig = serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to deserialize config: {err}")))?;
    config.unresolved_secrets = unresolved;
    Ok(config)
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file into the process environment, once.
///
/// `DOTENV_OVERRIDE` selects a file other than `.env`. A missing file is not
/// an error. Returns the path that was used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_config_from_files() {
        let dir = env::temp_dir().join(format!("geotrack-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            r#"
[database]
url = "sqlite::memory:"

[tracking]
tracker_offline_after_seconds = 240

[jobs]
enabled = true
"#,
        )
        .unwrap();
        fs::write(
            dir.join("staging.toml"),
            r#"
[jobs]
traccar_sync_interval_seconds = 10
"#,
        )
        .unwrap();

        let config = load_config_from(&dir, "staging").unwrap();
        assert_eq!(config.database.unwrap().url, "sqlite::memory:");
        assert_eq!(config.tracking.tracker_offline_after_seconds, 240);
        assert_eq!(config.tracking.min_history_interval_seconds, 3);
        assert!(config.jobs.enabled);
        assert_eq!(config.jobs.traccar_sync_interval_seconds, 10);
        assert_eq!(config.jobs.wialon_poll_interval_seconds, 15);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_out_of_range_tracking_span_is_rejected() {
        let dir = env::temp_dir().join(format!("geotrack-config-test-span-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            "[tracking]\nhistory_ttl_days = 9223372036854775807\n",
        )
        .unwrap();

        let err = load_config_from(&dir, "debug").unwrap_err();
        assert!(err.to_string().contains("history_ttl_days"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unresolved_markers_are_reported() {
        let dir = env::temp_dir().join(format!("geotrack-config-test-marker-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            r#"
[traccar]
base_url = "http://localhost:8082/api"
username = "sync"
password = "secret_from_env"
"#,
        )
        .unwrap();
        std::env::remove_var("GEOTRACK_SECRET_TRACCAR_PASSWORD");
        std::env::remove_var("TRACCAR_PASSWORD");

        let config = load_config_from(&dir, "debug").unwrap();
        assert_eq!(config.unresolved_secrets, vec!["traccar.password".to_string()]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = env::temp_dir().join("geotrack-config-test-missing");
        let config = load_config_from(&dir, "nowhere").unwrap();
        assert!(config.traccar.is_none());
        assert!(config.encryption.is_none());
        assert_eq!(config.jobs.health_check_interval_seconds(), 30);
    }
}
