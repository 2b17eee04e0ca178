// --- File: crates/geotrack_common/src/http.rs ---
//! Outbound HTTP helpers shared by the provider clients.

pub mod client;

pub use client::{create_client, is_json_response, DEFAULT_TIMEOUT_SECS};
