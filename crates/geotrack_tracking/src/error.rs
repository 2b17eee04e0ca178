// --- File: crates/geotrack_tracking/src/error.rs ---
use geotrack_common::{GeotrackError, ProviderError, SecretError};
use geotrack_db::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackingError {
    /// Storage failures abort the current tick.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Credential error: {0}")]
    Credential(#[from] SecretError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<TrackingError> for GeotrackError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::Storage(e) => e.into(),
            TrackingError::Provider(e) => {
                geotrack_common::external_service_error("position provider", e)
            }
            TrackingError::Credential(e) => e.into(),
            TrackingError::Validation(msg) => GeotrackError::ValidationError(msg),
            TrackingError::NotFound(msg) => GeotrackError::NotFoundError(msg),
        }
    }
}
