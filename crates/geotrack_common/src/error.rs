// --- File: crates/geotrack_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// Top-level error for the GeoTrack crates.
///
/// Crate-specific errors convert into this at process boundaries (worker
/// startup, job wiring). Inside a crate prefer the crate's own error enum.
#[derive(Error, Debug)]
pub enum GeotrackError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to parse data: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A provider (Traccar, Wialon) call failed.
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Crypto error: {0}")]
    CryptoError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Adds context to a foreign error while converting it into [`GeotrackError`].
pub trait Context<T, E> {
    fn context<C>(self, context: C) -> Result<T, GeotrackError>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, GeotrackError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| GeotrackError::InternalError(format!("{}: {}", context, error)))
    }
}

impl From<reqwest::Error> for GeotrackError {
    fn from(err: reqwest::Error) -> Self {
        GeotrackError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for GeotrackError {
    fn from(err: serde_json::Error) -> Self {
        GeotrackError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for GeotrackError {
    fn from(err: std::io::Error) -> Self {
        GeotrackError::InternalError(err.to_string())
    }
}

impl From<crate::crypto::SecretError> for GeotrackError {
    fn from(err: crate::crypto::SecretError) -> Self {
        GeotrackError::CryptoError(err.to_string())
    }
}

pub fn config_error<T: fmt::Display>(message: T) -> GeotrackError {
    GeotrackError::ConfigError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> GeotrackError {
    GeotrackError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_source_error() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing file",
        ));
        let err = result.context("reading key file").unwrap_err();
        assert_eq!(err.to_string(), "Internal error: reading key file: missing file");
    }

    #[test]
    fn test_external_service_error_display() {
        let err = external_service_error("traccar", "status 502");
        assert_eq!(err.to_string(), "External service error: traccar - status 502");
    }
}
