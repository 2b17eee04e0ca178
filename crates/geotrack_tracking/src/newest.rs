// --- File: crates/geotrack_tracking/src/newest.rs ---
use chrono::{DateTime, Utc};
use geotrack_common::models::ProviderPosition;

/// The position with the latest fix time. On equal fix times the one that
/// comes first in `positions` wins.
pub fn pick_newest(positions: &[ProviderPosition]) -> Option<&ProviderPosition> {
    positions.iter().fold(None, |best, current| match best {
        Some(best) if current.fix_time <= best.fix_time => Some(best),
        _ => Some(current),
    })
}

pub fn newest_fix_time(positions: &[ProviderPosition]) -> Option<DateTime<Utc>> {
    positions.iter().map(|p| p.fix_time).max()
}
