//! Tracking storage for GeoTrack
//!
//! Devices, latest locations, history, job cursors and integrations behind
//! repository traits. [`SqlTrackingStore`] runs on an `sqlx::Any` pool
//! (SQLite by default); [`MemoryTrackingStore`] keeps everything in process.
//!
//! ```rust,no_run
//! use geotrack_db::{DbClient, SqlTrackingStore};
//!
//! # async fn example() -> Result<(), geotrack_db::DbError> {
//! let client = DbClient::from_url("sqlite:data/geotrack.db").await?;
//! let store = SqlTrackingStore::new(client);
//! store.init_schema().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod repositories;

pub use client::DbClient;
pub use error::DbError;
pub use repositories::{
    LocationRepository, MemoryTrackingStore, SqlTrackingStore, SyncStateRepository,
    TrackingDeviceRepository, TrackingIntegrationRepository, TrackingStore,
};
