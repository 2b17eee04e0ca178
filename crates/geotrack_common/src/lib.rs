// --- File: crates/geotrack_common/src/lib.rs ---

pub mod crypto;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod services;

pub use error::{config_error, external_service_error, Context, GeotrackError};

pub use crypto::{AesGcmCipher, SecretCipher, SecretError};

pub use http::client::{create_client, DEFAULT_TIMEOUT_SECS};

pub use logging::{init_from_config, init_with_level, log_result};

pub use services::{BoxFuture, PositionSource, PositionWindow, ProviderError};
