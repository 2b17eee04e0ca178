// --- File: crates/geotrack_wialon/src/lib.rs ---
//! Client for the Wialon `ajax.html` RPC endpoint.
//!
//! Every call is a GET with `svc`, JSON `params` and an optional `sid`. A
//! long-lived account token is exchanged for a session id with `token/login`;
//! sessions are not cached between polls.

pub mod client;
pub mod error;
pub mod models;


pub use client::{ajax_url, WialonClient, WialonQuery};
pub use error::WialonError;
pub use models::{WialonUnit, WialonUnitPosition};
