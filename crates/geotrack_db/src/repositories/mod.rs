//! Repository modules for tracking state
//!
//! Traits live in [`tracking`]; `tracking_sql` and `tracking_memory` provide
//! the two implementations.

pub mod tracking;
pub mod tracking_memory;
pub mod tracking_sql;

mod tracking_store_test;

pub use tracking::{
    LocationRepository, SyncStateRepository, TrackingDeviceRepository,
    TrackingIntegrationRepository, TrackingStore,
};
pub use tracking_memory::MemoryTrackingStore;
pub use tracking_sql::SqlTrackingStore;
