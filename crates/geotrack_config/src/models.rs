// --- File: crates/geotrack_config/src/models.rs ---

use config::ConfigError;
use serde::{Deserialize, Serialize};

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/geotrack.db, loaded via GEOTRACK__DATABASE__URL
}

// --- Logging Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are additionally written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// --- Traccar Config ---
// Forwarding gateway credentials. Password is usually "secret_from_env".
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TraccarConfig {
    pub base_url: String, // Mandatory
    pub username: String, // Mandatory
    pub password: String, // Secret: GEOTRACK_SECRET_TRACCAR_PASSWORD or TRACCAR_PASSWORD
}

// --- Wialon Config ---
// Per-tenant tokens live on the integration records, only shared defaults here.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WialonConfig {
    #[serde(default = "default_wialon_base_url")]
    pub default_base_url: String,
}

impl Default for WialonConfig {
    fn default() -> Self {
        Self {
            default_base_url: default_wialon_base_url(),
        }
    }
}

// --- Tracking Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackingConfig {
    /// Fixes closer than this (in fix time) to the previous one are not historized.
    #[serde(default = "default_min_history_interval_seconds")]
    pub min_history_interval_seconds: i64,
    /// ONLINE devices silent for longer than this are flipped OFFLINE.
    #[serde(default = "default_tracker_offline_after_seconds")]
    pub tracker_offline_after_seconds: i64,
    #[serde(default = "default_history_ttl_days")]
    pub history_ttl_days: i64,
    /// Window requested from Traccar when no cursor has been persisted yet.
    #[serde(default = "default_initial_sync_lookback_seconds")]
    pub initial_sync_lookback_seconds: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_history_interval_seconds: default_min_history_interval_seconds(),
            tracker_offline_after_seconds: default_tracker_offline_after_seconds(),
            history_ttl_days: default_history_ttl_days(),
            initial_sync_lookback_seconds: default_initial_sync_lookback_seconds(),
        }
    }
}

/// Longest span accepted for any tracking duration setting (100 years).
pub const MAX_SPAN_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

impl TrackingConfig {
    /// Rejects negative spans and spans too large to subtract from a timestamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seconds = [
            ("min_history_interval_seconds", self.min_history_interval_seconds),
            ("tracker_offline_after_seconds", self.tracker_offline_after_seconds),
            ("initial_sync_lookback_seconds", self.initial_sync_lookback_seconds),
        ];
        for (key, value) in seconds {
            if !(0..=MAX_SPAN_SECONDS).contains(&value) {
                return Err(ConfigError::Message(format!(
                    "tracking.{key} must be between 0 and {MAX_SPAN_SECONDS}, got {value}"
                )));
            }
        }

        let max_days = MAX_SPAN_SECONDS / (24 * 60 * 60);
        if !(1..=max_days).contains(&self.history_ttl_days) {
            return Err(ConfigError::Message(format!(
                "tracking.history_ttl_days must be between 1 and {max_days}, got {}",
                self.history_ttl_days
            )));
        }
        Ok(())
    }
}

// --- Background Jobs Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct JobsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_traccar_sync_interval_seconds")]
    pub traccar_sync_interval_seconds: u64,
    #[serde(default = "default_wialon_poll_interval_seconds")]
    pub wialon_poll_interval_seconds: u64,
    /// Defaults to max(30, traccar_sync_interval_seconds) when unset.
    #[serde(default)]
    pub health_check_interval_seconds: Option<u64>,
    #[serde(default = "default_history_retention_interval_seconds")]
    pub history_retention_interval_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            traccar_sync_interval_seconds: default_traccar_sync_interval_seconds(),
            wialon_poll_interval_seconds: default_wialon_poll_interval_seconds(),
            health_check_interval_seconds: None,
            history_retention_interval_seconds: default_history_retention_interval_seconds(),
        }
    }
}

/// Lower bound for the health monitor interval.
pub const MIN_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;

impl JobsConfig {
    /// Effective health monitor interval, never below [`MIN_HEALTH_CHECK_INTERVAL_SECS`].
    pub fn health_check_interval_seconds(&self) -> u64 {
        self.health_check_interval_seconds
            .unwrap_or(self.traccar_sync_interval_seconds)
            .max(MIN_HEALTH_CHECK_INTERVAL_SECS)
    }
}

// --- Encryption Config ---
// Key for integration credential fields, base64 of 32 bytes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EncryptionConfig {
    pub key_base64: String, // Secret: GEOTRACK_SECRET_ENCRYPTION_KEY_BASE64
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub traccar: Option<TraccarConfig>,
    #[serde(default)]
    pub wialon: WialonConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub encryption: Option<EncryptionConfig>,
    /// Config paths whose `secret_from_env` marker had no matching variable.
    /// Filled by the loader so the caller can report them once logging is up.
    #[serde(skip)]
    pub unresolved_secrets: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_wialon_base_url() -> String {
    "https://hst-api.wialon.com".to_string()
}

fn default_min_history_interval_seconds() -> i64 {
    3
}

fn default_tracker_offline_after_seconds() -> i64 {
    180
}

fn default_history_ttl_days() -> i64 {
    7
}

fn default_initial_sync_lookback_seconds() -> i64 {
    5 * 60
}

fn default_traccar_sync_interval_seconds() -> u64 {
    5
}

fn default_wialon_poll_interval_seconds() -> u64 {
    15
}

fn default_history_retention_interval_seconds() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(config.database.is_none());
        assert!(!config.jobs.enabled);
        assert_eq!(config.tracking.min_history_interval_seconds, 3);
        assert_eq!(config.tracking.tracker_offline_after_seconds, 180);
        assert_eq!(config.tracking.history_ttl_days, 7);
        assert_eq!(config.tracking.initial_sync_lookback_seconds, 300);
        assert_eq!(config.wialon.default_base_url, "https://hst-api.wialon.com");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_tracking_spans_are_validated() {
        assert!(TrackingConfig::default().validate().is_ok());

        let negative = TrackingConfig {
            tracker_offline_after_seconds: -1,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let huge_lookback = TrackingConfig {
            initial_sync_lookback_seconds: i64::MAX,
            ..Default::default()
        };
        let err = huge_lookback.validate().unwrap_err().to_string();
        assert!(err.contains("initial_sync_lookback_seconds"));

        for ttl in [0, i64::MAX] {
            let config = TrackingConfig {
                history_ttl_days: ttl,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "ttl {ttl} accepted");
        }
    }

    #[test]
    fn test_health_interval_has_lower_bound() {
        let mut jobs = JobsConfig::default();
        assert_eq!(jobs.health_check_interval_seconds(), 30);

        jobs.traccar_sync_interval_seconds = 45;
        assert_eq!(jobs.health_check_interval_seconds(), 45);

        jobs.health_check_interval_seconds = Some(10);
        assert_eq!(jobs.health_check_interval_seconds(), 30);

        jobs.health_check_interval_seconds = Some(120);
        assert_eq!(jobs.health_check_interval_seconds(), 120);
    }
}
