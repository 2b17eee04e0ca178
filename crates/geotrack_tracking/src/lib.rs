// --- File: crates/geotrack_tracking/src/lib.rs ---
//! Live position ingestion for GeoTrack.
//!
//! Positions reach the store through three paths: the Traccar sync job, the
//! Wialon poller and direct pings. All of them end in the position writer,
//! which keeps one latest row per entity and a deduplicated history, and fan
//! out through the in-process [`events::InProcessPubSub`]. The health monitor
//! turns silent devices OFFLINE.

pub mod device_refresh;
pub mod error;
pub mod events;
pub mod ingest;
pub mod jobs;
pub mod newest;
pub mod scheduler;
pub mod writer;

mod sql_store_test;

#[cfg(test)]
mod test_support;

pub use device_refresh::{DeviceRefresher, DeviceSnapshot};
pub use error::TrackingError;
pub use events::{EventPublisher, InProcessPubSub, Subscription, TrackingEvent};
pub use ingest::{LocationPing, PingIngestor};
pub use jobs::{HealthMonitorJob, HistoryRetentionJob, TraccarSyncJob, WialonPollerJob};
pub use scheduler::{run_job, spawn_job, BackgroundJob, IntervalTicker, ManualTicker, Ticker};
pub use writer::{write_latest_and_history, WriteOutcome};
