// --- File: crates/geotrack_wialon/src/error.rs ---
use geotrack_common::ProviderError;
use thiserror::Error;

pub(crate) const PROVIDER: &str = "wialon";

#[derive(Error, Debug)]
pub enum WialonError {
    #[error("Wialon request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Wialon HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// The body carried a non-zero `error` code.
    #[error("Wialon API error code {code}")]
    Api { code: i64 },

    #[error("Failed to decode Wialon response: {0}")]
    Decode(String),
}

impl From<WialonError> for ProviderError {
    fn from(err: WialonError) -> Self {
        let provider = PROVIDER.to_string();
        match err {
            WialonError::Http(e) => ProviderError::Transport {
                provider,
                message: e.to_string(),
            },
            WialonError::Status { status, body } => ProviderError::Status {
                provider,
                status,
                body,
            },
            WialonError::Api { code } => ProviderError::Api {
                provider,
                message: format!("error code {}", code),
            },
            WialonError::Decode(message) => ProviderError::Decode { provider, message },
        }
    }
}
