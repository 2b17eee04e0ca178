//! Database client for the tracking store
//!
//! Wraps an `sqlx::Any` pool so the store can target whatever driver the
//! configured URL names. SQLite is the default.

use crate::error::DbError;
use geotrack_config::DatabaseConfig;
use sqlx::pool::PoolOptions;
use sqlx::Pool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct DbClient {
    pool: Pool<sqlx::Any>,
}

impl DbClient {
    /// Create a new database client from the `database` config section.
    pub async fn from_config(db_config: &DatabaseConfig) -> Result<Self, DbError> {
        if db_config.url.is_empty() {
            return Err(DbError::ConfigError("Database URL is empty".to_string()));
        }
        Self::from_url(&db_config.url).await
    }

    /// Create a new database client from a database URL.
    pub async fn from_url(db_url: &str) -> Result<Self, DbError> {
        if db_url.is_empty() {
            return Err(DbError::UrlError("Database URL is empty".to_string()));
        }
        let pool = Self::create_pool(db_url).await?;
        Ok(Self { pool })
    }

    async fn create_pool(db_url: &str) -> Result<Pool<sqlx::Any>, DbError> {
        debug!(url = %db_url, "Creating database pool");

        sqlx::any::install_default_drivers();

        let in_memory = db_url.contains(":memory:");

        // Every connection to sqlite::memory: opens a fresh database, so the
        // pool must hold exactly one connection and never recycle it.
        let pool_options = if in_memory {
            PoolOptions::<sqlx::Any>::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            PoolOptions::<sqlx::Any>::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .idle_timeout(Duration::from_secs(600))
        };

        if !in_memory {
            if let Some(db_path) = sqlite_file_path(db_url) {
                ensure_sqlite_file(db_path)?;
            }
        }

        let pool = pool_options
            .connect_with(sqlx::any::AnyConnectOptions::from_str(db_url)?)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to create database pool");
                DbError::PoolError(e.to_string())
            })?;

        info!(in_memory, "Database pool created");
        Ok(pool)
    }

    pub fn pool(&self) -> &Pool<sqlx::Any> {
        &self.pool
    }

    /// Execute a statement that returns no rows; yields the affected row count.
    pub async fn execute(&self, query: &str) -> Result<u64, DbError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::QueryError(e.to_string()))
    }

    pub async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Extracts the file path from `sqlite:path` or `sqlite://path` URLs.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// SQLite will not create a missing database file through the Any driver.
fn ensure_sqlite_file(db_path: &str) -> Result<(), DbError> {
    let path = Path::new(db_path);
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!(dir = ?dir, "Creating directory for SQLite database");
            std::fs::create_dir_all(dir)
                .map_err(|e| DbError::PoolError(format!("Failed to create directory: {}", e)))?;
        }
    }
    if !path.exists() {
        debug!(path = %db_path, "Creating empty SQLite database file");
        std::fs::File::create(path)
            .map_err(|e| DbError::PoolError(format!("Failed to create database file: {}", e)))?;
    }
    Ok(())
}

impl std::fmt::Display for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbClient")
    }
}
