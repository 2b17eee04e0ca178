// --- File: crates/geotrack_wialon/src/models.rs ---
use chrono::DateTime;
use geotrack_common::models::ProviderPosition;
use serde::{Deserialize, Serialize};

/// Last known position of a unit, in Wialon's short field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WialonUnitPosition {
    /// Latitude.
    pub y: f64,
    /// Longitude.
    pub x: f64,
    /// Speed.
    #[serde(default)]
    pub s: Option<f64>,
    /// Course in degrees.
    #[serde(default)]
    pub c: Option<f64>,
    /// Fix time, unix seconds.
    pub t: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WialonUnit {
    pub id: i64,
    #[serde(default)]
    pub nm: String,
    #[serde(default)]
    pub pos: Option<WialonUnitPosition>,
}

impl WialonUnit {
    /// `None` when the unit has no position or an unrepresentable fix time.
    pub fn to_provider_position(&self) -> Option<ProviderPosition> {
        let pos = self.pos.as_ref()?;
        let fix_time = DateTime::from_timestamp(pos.t, 0)?;
        Some(ProviderPosition {
            provider_device_id: self.id,
            latitude: pos.y,
            longitude: pos.x,
            speed: pos.s,
            heading: pos.c,
            accuracy: None,
            fix_time,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenLoginResponse {
    pub eid: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItemsResponse {
    #[serde(default)]
    pub items: Vec<WialonUnit>,
}
