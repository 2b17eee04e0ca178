// --- File: crates/geotrack_tracking/src/jobs/health_monitor.rs ---
//! Marks devices OFFLINE once their last fix is older than the configured
//! threshold. This is the only place a device leaves ONLINE.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use geotrack_config::TrackingConfig;
use geotrack_db::TrackingStore;
use tracing::{debug, info};

use crate::error::TrackingError;
use crate::events::{tenant_health_topic, EventPublisher, TrackingEvent};
use crate::jobs::span_before;
use crate::scheduler::BackgroundJob;

#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub cutoff: DateTime<Utc>,
    pub candidates: usize,
    pub marked_offline: usize,
}

pub struct HealthMonitorJob<S> {
    store: Arc<S>,
    publisher: Arc<dyn EventPublisher>,
    offline_after_seconds: i64,
}

impl<S: TrackingStore> HealthMonitorJob<S> {
    pub fn new(store: Arc<S>, publisher: Arc<dyn EventPublisher>, tracking: &TrackingConfig) -> Self {
        Self {
            store,
            publisher,
            offline_after_seconds: tracking.tracker_offline_after_seconds,
        }
    }

    pub async fn check_at(&self, now: DateTime<Utc>) -> Result<HealthReport, TrackingError> {
        let cutoff = span_before(
            now,
            Duration::try_seconds(self.offline_after_seconds),
            "tracking.tracker_offline_after_seconds",
        )?;
        let candidates = self.store.find_stale_online(cutoff).await?;

        let mut marked_offline = 0;
        for device in &candidates {
            // Lost the race to a fresh fix; the device stays ONLINE.
            if !self.store.mark_offline_if_online(&device.id).await? {
                debug!(device_id = %device.id, "Device changed status before it could be marked offline");
                continue;
            }

            let Some(updated) = self.store.find_device(&device.id).await? else {
                continue;
            };
            marked_offline += 1;
            info!(
                device_id = %updated.id,
                tenant_id = %updated.tenant_id,
                last_seen_at = ?updated.last_seen_at,
                "Device went offline"
            );
            self.publisher.publish(
                &tenant_health_topic(&updated.tenant_id),
                TrackingEvent::DeviceHealthUpdated(updated),
            );
        }

        Ok(HealthReport {
            cutoff,
            candidates: candidates.len(),
            marked_offline,
        })
    }
}

impl<S: TrackingStore> BackgroundJob for HealthMonitorJob<S> {
    type Report = HealthReport;

    fn name(&self) -> &'static str {
        "device_health_monitor"
    }

    async fn tick(&self) -> Result<HealthReport, TrackingError> {
        self.check_at(Utc::now()).await
    }
}
