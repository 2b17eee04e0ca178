// --- File: crates/geotrack_common/src/services.rs ---
//! Provider abstractions.
//!
//! Traccar and Wialon report positions with different field layouts and
//! request shapes. Both are exposed to the tracking jobs through
//! [`PositionSource`], which returns normalized [`ProviderPosition`]s so the
//! jobs never see provider field names.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::models::ProviderPosition;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Failure at the provider boundary. Jobs log these and skip the tick or integration.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} returned status {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },

    #[error("{provider} response could not be decoded: {message}")]
    Decode { provider: String, message: String },
}

/// Something that can be asked for positions.
///
/// `Request` carries what the provider needs per call: a time window for the
/// Traccar gateway, a base URL and token for a Wialon account.
pub trait PositionSource: Send + Sync {
    type Request: Send + Sync;

    fn fetch_positions<'a>(
        &'a self,
        request: &'a Self::Request,
    ) -> BoxFuture<'a, Vec<ProviderPosition>, ProviderError>;
}

/// Time window `[from, to]`, optionally narrowed to one provider device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionWindow {
    pub device_id: Option<i64>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl PositionWindow {
    pub fn all_devices(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            device_id: None,
            from,
            to,
        }
    }

    pub fn for_device(device_id: i64, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            device_id: Some(device_id),
            from,
            to,
        }
    }
}
