// --- File: crates/geotrack_tracking/src/jobs/traccar_sync.rs ---
//! Incremental pull of every position the Traccar gateway saw since the last tick.
//!
//! The cursor is the newest fix time ever processed, kept in the sync-state
//! table under [`SYNC_KEY`]. The query window is inclusive, so the newest
//! position of the previous tick is fetched again; the writer's history
//! threshold absorbs the repeat.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use geotrack_common::models::{TrackingDevice, SOURCE_TRACCAR};
use geotrack_common::{PositionSource, PositionWindow};
use geotrack_config::TrackingConfig;
use geotrack_db::TrackingStore;
use geotrack_traccar::client::format_traccar_time;
use tracing::{debug, error, info, warn};

use crate::error::TrackingError;
use crate::events::EventPublisher;
use crate::jobs::apply::apply_device_fix;
use crate::jobs::span_before;
use crate::newest::newest_fix_time;
use crate::scheduler::BackgroundJob;

pub const SYNC_KEY: &str = "traccar.lastFixTimeIso";

/// Summary of one sync tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub provider_failed: bool,
    pub fetched: usize,
    pub applied: usize,
    pub unmatched: usize,
    pub history_written: usize,
    pub health_transitions: usize,
    /// Cursor after the tick.
    pub cursor: Option<DateTime<Utc>>,
}

pub struct TraccarSyncJob<S, P> {
    store: Arc<S>,
    source: Arc<P>,
    publisher: Arc<dyn EventPublisher>,
    min_history_interval_seconds: i64,
    initial_lookback_seconds: i64,
}

impl<S, P> TraccarSyncJob<S, P>
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
            initial_lookback_seconds: tracking.initial_sync_lookback_seconds,
        }
    }

    /// The stored cursor. An unparseable value is treated as absent.
    pub async fn cursor(&self) -> Result<Option<DateTime<Utc>>, TrackingError> {
        let Some(raw) = self.store.get_sync_value(SYNC_KEY).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring unparseable Traccar sync cursor");
                Ok(None)
            }
        }
    }

    pub async fn sync_once(&self) -> Result<SyncReport, TrackingError> {
        let now = Utc::now();
        let cursor = self.cursor().await?;
        let from = match cursor {
            Some(cursor) => cursor,
            None => span_before(
                now,
                Duration::try_seconds(self.initial_lookback_seconds),
                "tracking.initial_sync_lookback_seconds",
            )?,
        };
        let window = PositionWindow::all_devices(from, now);

        let positions = match self.source.fetch_positions(&window).await {
            Ok(positions) => positions,
            Err(e) => {
                error!(error = %e, "Traccar sync failed");
                return Ok(SyncReport {
                    provider_failed: true,
                    cursor,
                    ..Default::default()
                });
            }
        };

        let mut report = SyncReport {
            fetched: positions.len(),
            cursor,
            ..Default::default()
        };
        if positions.is_empty() {
            return Ok(report);
        }

        let mut traccar_ids: Vec<i64> = positions.iter().map(|p| p.provider_device_id).collect();
        traccar_ids.sort_unstable();
        traccar_ids.dedup();

        let mut devices: HashMap<i64, TrackingDevice> = self
            .store
            .find_by_traccar_ids(&traccar_ids)
            .await?
            .into_iter()
            .filter_map(|d| d.traccar_device_id.map(|id| (id, d)))
            .collect();

        for position in &positions {
            let Some(device) = devices.get_mut(&position.provider_device_id) else {
                report.unmatched += 1;
                continue;
            };

            let fix = position.to_fix(SOURCE_TRACCAR);
            let applied = apply_device_fix(
                self.store.as_ref(),
                self.publisher.as_ref(),
                device,
                &fix,
                self.min_history_interval_seconds,
            )
            .await?;

            report.applied += 1;
            if applied.written.is_some_and(|w| w.wrote_history) {
                report.history_written += 1;
            }
            if applied.health_transition {
                report.health_transitions += 1;
            }
        }

        if let Some(newest) = newest_fix_time(&positions) {
            let next = cursor.map_or(newest, |current| current.max(newest));
            self.store
                .put_sync_value(SYNC_KEY, &format_traccar_time(next))
                .await?;
            report.cursor = Some(next);
        }

        if report.unmatched > 0 {
            debug!(unmatched = report.unmatched, "Dropped positions of unknown devices");
        }
        info!(
            fetched = report.fetched,
            applied = report.applied,
            history_written = report.history_written,
            health_transitions = report.health_transitions,
            "Traccar sync tick"
        );
        Ok(report)
    }
}

impl<S, P> BackgroundJob for TraccarSyncJob<S, P>
where
    S: TrackingStore,
    P: PositionSource<Request = PositionWindow>,
{
    type Report = SyncReport;

    fn name(&self) -> &'static str {
        "traccar_sync"
    }

    async fn tick(&self) -> Result<SyncReport, TrackingError> {
        self.sync_once().await
    }
}
