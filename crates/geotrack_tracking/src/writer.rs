// --- File: crates/geotrack_tracking/src/writer.rs ---
//! Latest-state upsert with fix-time history deduplication.

use chrono::{DateTime, Utc};
use geotrack_common::models::{EntityRef, LatestLocation, LocationFix, TrackingHistoryEntry};
use geotrack_db::{DbError, LocationRepository};
use tracing::trace;

/// Result of one writer call.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub latest: LatestLocation,
    pub wrote_history: bool,
}

/// History is appended unless a previous fix exists and the two fix times
/// are strictly less than `min_interval_seconds` apart.
///
/// Measured in fix time, so replayed data deduplicates the same way as live data.
pub fn should_append_history(
    previous_fix: Option<DateTime<Utc>>,
    new_fix: DateTime<Utc>,
    min_interval_seconds: i64,
) -> bool {
    match previous_fix {
        None => true,
        Some(previous) => {
            let delta_seconds = (new_fix - previous).num_milliseconds().abs() as f64 / 1000.0;
            delta_seconds >= min_interval_seconds as f64
        }
    }
}

/// Upserts the entity's latest location and conditionally appends history.
///
/// The latest row is always replaced, even by an older fix. Only storage
/// failures are returned.
pub async fn write_latest_and_history<S>(
    store: &S,
    entity: &EntityRef,
    fix: &LocationFix,
    min_history_interval_seconds: i64,
) -> Result<WriteOutcome, DbError>
where
    S: LocationRepository + Sync,
{
    let received_at = Utc::now();
    let previous = store.find_latest(entity).await?;

    let latest = LatestLocation::from_fix(entity, fix, received_at);
    store.upsert_latest(&latest).await?;

    let wrote_history = should_append_history(
        previous.as_ref().map(|p| p.timestamp),
        fix.timestamp,
        min_history_interval_seconds,
    );
    if wrote_history {
        store
            .append_history(&TrackingHistoryEntry::from(&latest))
            .await?;
    }

    trace!(
        entity_type = %entity.entity_type,
        entity_id = %entity.entity_id,
        wrote_history,
        "Location written"
    );

    Ok(WriteOutcome {
        latest,
        wrote_history,
    })
}
