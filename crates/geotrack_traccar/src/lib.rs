// --- File: crates/geotrack_traccar/src/lib.rs ---
//! Client for the Traccar forwarding gateway.
//!
//! Devices forward their positions to Traccar; GeoTrack reads them back through
//! the REST API with basic auth and registers new devices there.

pub mod client;
pub mod error;
pub mod models;


pub use client::TraccarClient;
pub use error::TraccarError;
pub use models::{TraccarDevice, TraccarPosition};
