// --- File: crates/geotrack_tracking/src/jobs/apply.rs ---
//! The per-position sequence shared by every ingestion path that starts from
//! a tracking device: device update, position writer, event fan-out.

use geotrack_common::models::{EntityRef, HealthStatus, LocationFix, TrackingDevice};
use geotrack_db::{DbError, TrackingStore};
use tracing::debug;

use crate::events::{tenant_health_topic, tenant_location_topic, EventPublisher, TrackingEvent};
use crate::writer::{write_latest_and_history, WriteOutcome};

/// What [`apply_device_fix`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFix {
    /// Set when the device has a vehicle and the writer ran.
    pub written: Option<WriteOutcome>,
    pub health_transition: bool,
}

/// Records `fix` on `device` and fans it out.
///
/// `device` is the caller's copy. Its health, last-seen and last location are
/// updated in place, so a device seen twice in one batch reports its
/// transition to ONLINE only once.
pub async fn apply_device_fix<S>(
    store: &S,
    publisher: &dyn EventPublisher,
    device: &mut TrackingDevice,
    fix: &LocationFix,
    min_history_interval_seconds: i64,
) -> Result<AppliedFix, DbError>
where
    S: TrackingStore,
{
    let last_location = fix.to_last_location();
    store.record_fix(&device.id, &last_location).await?;

    let previous_status = device.health_status;
    device.health_status = HealthStatus::Online;
    device.last_seen_at = Some(fix.timestamp);
    device.last_location = Some(last_location);

    let written = match device.vehicle_id.as_deref() {
        Some(vehicle_id) => {
            let entity = EntityRef::vehicle(vehicle_id);
            let outcome =
                write_latest_and_history(store, &entity, fix, min_history_interval_seconds).await?;
            publisher.publish(
                &tenant_location_topic(&device.tenant_id),
                TrackingEvent::LocationUpdated(outcome.latest.clone()),
            );
            Some(outcome)
        }
        None => {
            debug!(device_id = %device.id, "Device has no vehicle, skipping position writer");
            None
        }
    };

    let health_transition = previous_status != HealthStatus::Online;
    if health_transition {
        if let Some(updated) = store.find_device(&device.id).await? {
            debug!(
                device_id = %device.id,
                from = %previous_status,
                to = %updated.health_status,
                "Device health changed"
            );
            publisher.publish(
                &tenant_health_topic(&updated.tenant_id),
                TrackingEvent::DeviceHealthUpdated(updated),
            );
        }
    }

    Ok(AppliedFix {
        written,
        health_transition,
    })
}
