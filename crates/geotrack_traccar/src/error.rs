// --- File: crates/geotrack_traccar/src/error.rs ---
use geotrack_common::ProviderError;
use thiserror::Error;

pub(crate) const PROVIDER: &str = "traccar";

#[derive(Error, Debug)]
pub enum TraccarError {
    #[error("Traccar request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response.
    #[error("Traccar API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode Traccar response: {0}")]
    Decode(String),
}

impl From<TraccarError> for ProviderError {
    fn from(err: TraccarError) -> Self {
        match err {
            TraccarError::Http(e) => ProviderError::Transport {
                provider: PROVIDER.to_string(),
                message: e.to_string(),
            },
            TraccarError::Api { status, body } => ProviderError::Status {
                provider: PROVIDER.to_string(),
                status,
                body,
            },
            TraccarError::Decode(message) => ProviderError::Decode {
                provider: PROVIDER.to_string(),
                message,
            },
        }
    }
}
