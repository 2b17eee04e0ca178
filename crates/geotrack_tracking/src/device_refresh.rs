// --- File: crates/geotrack_tracking/src/device_refresh.rs ---
//! On-demand refresh of one Traccar-backed device, used to verify that a
//! newly configured tracker is actually reporting.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use geotrack_common::models::{LastLocation, TrackingDevice, SOURCE_TRACCAR};
use geotrack_common::{PositionSource, PositionWindow};
use geotrack_config::TrackingConfig;
use geotrack_db::TrackingStore;
use serde::Serialize;
use tracing::info;

use crate::error::TrackingError;
use crate::events::EventPublisher;
use crate::jobs::apply::apply_device_fix;
use crate::newest::pick_newest;

/// How far back a refresh looks for positions.
pub const REFRESH_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_location: Option<LastLocation>,
}

impl From<&TrackingDevice> for DeviceSnapshot {
    fn from(device: &TrackingDevice) -> Self {
        Self {
            last_seen_at: device.last_seen_at,
            last_location: device.last_location.clone(),
        }
    }
}

pub struct DeviceRefresher<S, P> {
    store: Arc<S>,
    source: Arc<P>,
    publisher: Arc<dyn EventPublisher>,
    min_history_interval_seconds: i64,
}

impl<S, P> DeviceRefresher<S, P>
where
    S: TrackingStore,
    P: PositionSource<Request = PositionWindow>,
{
    pub fn new(
        store: Arc<S>,
        source: Arc<P>,
        publisher: Arc<dyn EventPublisher>,
        tracking: &TrackingConfig,
    ) -> Self {
        Self {
            store,
            source,
            publisher,
            min_history_interval_seconds: tracking.min_history_interval_seconds,
        }
    }

    /// Pulls the newest position of the last 30 minutes and applies it.
    ///
    /// Devices without a Traccar id, or with no recent position, return their
    /// stored snapshot unchanged. Provider failures are returned to the caller.
    pub async fn refresh_device(&self, device_id: &str) -> Result<DeviceSnapshot, TrackingError> {
        let mut device = self
            .store
            .find_device(device_id)
            .await?
            .ok_or_else(|| TrackingError::NotFound(format!("Tracking device {device_id}")))?;

        let Some(traccar_id) = device.traccar_device_id else {
            return Ok(DeviceSnapshot::from(&device));
        };

        let now = Utc::now();
        let window =
            PositionWindow::for_device(traccar_id, now - Duration::minutes(REFRESH_WINDOW_MINUTES), now);
        let positions = self.source.fetch_positions(&window).await?;

        let Some(newest) = pick_newest(&positions) else {
            info!(device_id, traccar_id, "No recent positions for device");
            return Ok(DeviceSnapshot::from(&device));
        };

        apply_device_fix(
            self.store.as_ref(),
            self.publisher.as_ref(),
            &mut device,
            &newest.to_fix(SOURCE_TRACCAR),
            self.min_history_interval_seconds,
        )
        .await?;

        info!(device_id, traccar_id, fix_time = %newest.fix_time, "Device refreshed");
        Ok(DeviceSnapshot::from(&device))
    }
}
