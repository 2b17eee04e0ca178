// --- File: crates/geotrack_tracking/src/jobs/history_retention.rs ---
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use geotrack_config::TrackingConfig;
use geotrack_db::TrackingStore;
use tracing::info;

use crate::error::TrackingError;
use crate::jobs::span_before;
use crate::scheduler::BackgroundJob;

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionReport {
    pub cutoff: DateTime<Utc>,
    pub purged: u64,
}

/// Deletes history rows whose fix time is older than the retention window.
/// Latest locations are never touched.
pub struct HistoryRetentionJob<S> {
    store: Arc<S>,
    ttl_days: i64,
}

impl<S: TrackingStore> HistoryRetentionJob<S> {
    pub fn new(store: Arc<S>, tracking: &TrackingConfig) -> Self {
        Self {
            store,
            ttl_days: tracking.history_ttl_days,
        }
    }

    pub async fn purge_at(&self, now: DateTime<Utc>) -> Result<RetentionReport, TrackingError> {
        let cutoff = span_before(now, Duration::try_days(self.ttl_days), "tracking.history_ttl_days")?;
        let purged = self.store.purge_history_before(cutoff).await?;
        if purged > 0 {
            info!(purged, %cutoff, "Purged expired location history");
        }
        Ok(RetentionReport { cutoff, purged })
    }
}

impl<S: TrackingStore> BackgroundJob for HistoryRetentionJob<S> {
    type Report = RetentionReport;

    fn name(&self) -> &'static str {
        "history_retention"
    }

    async fn tick(&self) -> Result<RetentionReport, TrackingError> {
        self.purge_at(Utc::now()).await
    }
}
