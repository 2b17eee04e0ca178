//! Background jobs. Each one is an independent [`crate::scheduler::BackgroundJob`]
//! with no shared lock; races on a device record resolve last-write-wins,
//! except ONLINE to OFFLINE which is a conditional update.

pub mod apply;
pub mod health_monitor;
pub mod history_retention;
pub mod traccar_sync;
pub mod wialon_poller;

use chrono::{DateTime, Duration, Utc};

use crate::error::TrackingError;

mod health_monitor_test;

pub use apply::{apply_device_fix, AppliedFix};
pub use health_monitor::{HealthMonitorJob, HealthReport};
pub use history_retention::{HistoryRetentionJob, RetentionReport};
pub use traccar_sync::{SyncReport, TraccarSyncJob, SYNC_KEY};
pub use wialon_poller::{PollReport, WialonPollerJob};

/// `now` minus a configured span. Spans that do not fit a timestamp are
/// reported against the setting they came from.
pub(crate) fn span_before(
    now: DateTime<Utc>,
    span: Option<Duration>,
    setting: &str,
) -> Result<DateTime<Utc>, TrackingError> {
    span.and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| TrackingError::Validation(format!("{setting} is out of range")))
}
