//! Error types for the tracking store

use thiserror::Error;

/// Errors that can occur when reading or writing tracking state
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Database configuration error: {0}")]
    ConfigError(String),

    #[error("Database URL error: {0}")]
    UrlError(String),

    #[error("Database pool error: {0}")]
    PoolError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    /// A stored value could not be mapped back into a domain type.
    #[error("Failed to decode stored value: {0}")]
    DecodeError(String),

    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<geotrack_common::models::UnknownVariant> for DbError {
    fn from(err: geotrack_common::models::UnknownVariant) -> Self {
        DbError::DecodeError(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::DecodeError(err.to_string())
    }
}

impl From<DbError> for geotrack_common::GeotrackError {
    fn from(err: DbError) -> Self {
        geotrack_common::GeotrackError::DatabaseError(err.to_string())
    }
}
