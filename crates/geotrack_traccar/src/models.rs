// --- File: crates/geotrack_traccar/src/models.rs ---
use chrono::{DateTime, Utc};
use geotrack_common::models::ProviderPosition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraccarDevice {
    pub id: i64,
    pub name: String,
    pub unique_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateDeviceRequest<'a> {
    pub name: &'a str,
    pub unique_id: &'a str,
}

/// A position as returned by `GET /positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraccarPosition {
    #[serde(default)]
    pub id: i64,
    pub device_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    /// Heading in degrees.
    #[serde(default)]
    pub course: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub server_time: DateTime<Utc>,
    #[serde(default)]
    pub fix_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub device_time: Option<DateTime<Utc>>,
}

impl TraccarPosition {
    /// Device fix time, falling back to the time Traccar received the report.
    pub fn effective_fix_time(&self) -> DateTime<Utc> {
        self.fix_time.unwrap_or(self.server_time)
    }
}

impl From<&TraccarPosition> for ProviderPosition {
    fn from(position: &TraccarPosition) -> Self {
        ProviderPosition {
            provider_device_id: position.device_id,
            latitude: position.latitude,
            longitude: position.longitude,
            speed: position.speed,
            heading: position.course,
            accuracy: position.accuracy,
            fix_time: position.effective_fix_time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_position_decodes_traccar_payload() {
        let json = r#"{
            "id": 991,
            "deviceId": 7,
            "latitude": 47.3769,
            "longitude": 8.5417,
            "speed": 12.0,
            "course": 180.0,
            "serverTime": "2024-01-01T12:00:05.000+00:00",
            "fixTime": "2024-01-01T12:00:00.000+00:00",
            "attributes": {"ignition": true}
        }"#;
        let position: TraccarPosition = serde_json::from_str(json).unwrap();
        assert_eq!(position.device_id, 7);
        assert_eq!(position.accuracy, None);
        assert_eq!(
            position.effective_fix_time(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );

        let normalized = ProviderPosition::from(&position);
        assert_eq!(normalized.heading, Some(180.0));
        assert_eq!(normalized.provider_device_id, 7);
    }

    #[test]
    fn test_missing_fix_time_falls_back_to_server_time() {
        let json = r#"{
            "deviceId": 7,
            "latitude": 1.0,
            "longitude": 2.0,
            "serverTime": "2024-01-01T12:00:05Z"
        }"#;
        let position: TraccarPosition = serde_json::from_str(json).unwrap();
        assert_eq!(
            position.effective_fix_time(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 5).unwrap()
        );
    }
}
