// --- File: crates/geotrack_common/src/models.rs ---

// Domain records shared by the storage layer, the provider clients and the
// tracking jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source tag written by the Traccar sync job and the connection test.
pub const SOURCE_TRACCAR: &str = "TRACCAR";
/// Source tag written by the Wialon poller.
pub const SOURCE_WIALON_API: &str = "WIALON_API";
/// Default source tag for direct location pings.
pub const SOURCE_PHONE: &str = "PHONE";

/// Error returned when parsing one of the string-backed enums fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// Implements as_str/Display/FromStr for enums persisted as SCREAMING_SNAKE_CASE text.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Kind of mobile entity a location belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Vehicle,
    DeliveryTask,
    Yard,
}

string_enum!(EntityType, "entity type", {
    Vehicle => "VEHICLE",
    DeliveryTask => "DELIVERY_TASK",
    Yard => "YARD",
});

/// (entity type, entity id) pair identifying one LatestLocation row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    pub fn vehicle(vehicle_id: impl Into<String>) -> Self {
        Self::new(EntityType::Vehicle, vehicle_id)
    }
}

/// Inferred liveness of a tracking device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

string_enum!(HealthStatus, "health status", {
    Online => "ONLINE",
    Offline => "OFFLINE",
    Unknown => "UNKNOWN",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderType {
    Wialon,
    TraccarDirect,
    Phone,
    WialonApi,
}

string_enum!(ProviderType, "provider type", {
    Wialon => "WIALON",
    TraccarDirect => "TRACCAR_DIRECT",
    Phone => "PHONE",
    WialonApi => "WIALON_API",
});

/// Pull: this system polls the provider. Forward: the provider pushes to a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingMethod {
    Forward,
    Pull,
}

string_enum!(TrackingMethod, "tracking method", {
    Forward => "FORWARD",
    Pull => "PULL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationStatus {
    Active,
    Paused,
    Error,
}

string_enum!(IntegrationStatus, "integration status", {
    Active => "ACTIVE",
    Paused => "PAUSED",
    Error => "ERROR",
});

/// Snapshot of the last position stored on a device record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastLocation {
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// A physical or logical tracker registered under a tenant integration.
///
/// `(tenant_id, integration_id, external_device_id)` is unique. Health and
/// last-position fields are only mutated by the tracking jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingDevice {
    pub id: String,
    pub tenant_id: String,
    pub integration_id: String,
    /// Assigned vehicle, if any. Only assigned devices feed the position writer.
    pub vehicle_id: Option<String>,
    pub label: String,
    pub provider_type: ProviderType,
    pub method: TrackingMethod,
    pub external_device_id: String,
    /// Numeric id in the Traccar gateway, when the device is registered there.
    pub traccar_device_id: Option<i64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_location: Option<LastLocation>,
    pub health_status: HealthStatus,
    pub assigned_at: Option<DateTime<Utc>>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingDevice {
    /// Creates an unassigned, never-seen device with health UNKNOWN.
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        integration_id: impl Into<String>,
        label: impl Into<String>,
        provider_type: ProviderType,
        method: TrackingMethod,
        external_device_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            integration_id: integration_id.into(),
            vehicle_id: None,
            label: label.into(),
            provider_type,
            method,
            external_device_id: external_device_id.into(),
            traccar_device_id: None,
            last_seen_at: None,
            last_location: None,
            health_status: HealthStatus::Unknown,
            assigned_at: None,
            unassigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_vehicle(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self.assigned_at = Some(Utc::now());
        self
    }

    pub fn with_traccar_id(mut self, traccar_device_id: i64) -> Self {
        self.traccar_device_id = Some(traccar_device_id);
        self
    }
}

/// A position to be written for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    /// Time the device says the position was measured.
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl LocationFix {
    /// The snapshot stored on the device record (accuracy is not kept there).
    pub fn to_last_location(&self) -> LastLocation {
        LastLocation {
            lat: self.lat,
            lng: self.lng,
            heading: self.heading,
            speed: self.speed,
            timestamp: self.timestamp,
            source: self.source.clone(),
        }
    }
}

/// Current state of one entity. Exactly one row per `(entity_type, entity_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestLocation {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    /// Time this system received the fix.
    pub received_at: DateTime<Utc>,
}

impl LatestLocation {
    pub fn from_fix(entity: &EntityRef, fix: &LocationFix, received_at: DateTime<Utc>) -> Self {
        Self {
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            lat: fix.lat,
            lng: fix.lng,
            heading: fix.heading,
            speed: fix.speed,
            accuracy: fix.accuracy,
            timestamp: fix.timestamp,
            source: fix.source.clone(),
            received_at,
        }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type, self.entity_id.clone())
    }
}

/// Row of the append-only history. Same columns as [`LatestLocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingHistoryEntry {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub lat: f64,
    pub lng: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub received_at: DateTime<Utc>,
}

impl From<&LatestLocation> for TrackingHistoryEntry {
    fn from(latest: &LatestLocation) -> Self {
        Self {
            entity_type: latest.entity_type,
            entity_id: latest.entity_id.clone(),
            lat: latest.lat,
            lng: latest.lng,
            heading: latest.heading,
            speed: latest.speed,
            accuracy: latest.accuracy,
            timestamp: latest.timestamp,
            source: latest.source.clone(),
            received_at: latest.received_at,
        }
    }
}

/// AES-256-GCM output, every part base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedSecret {
    pub ciphertext_b64: String,
    pub iv_b64: String,
    pub tag_b64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WialonIntegrationConfig {
    /// Falls back to the configured default host when absent.
    pub base_url: Option<String>,
    pub token_enc: Option<EncryptedSecret>,
    pub polling_interval_seconds: Option<u64>,
}

/// Tenant-scoped provider connection. Read-only for the tracking core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingIntegration {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub provider_type: ProviderType,
    pub method: TrackingMethod,
    pub status: IntegrationStatus,
    pub wialon: Option<WialonIntegrationConfig>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingIntegration {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        provider_type: ProviderType,
        method: TrackingMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            provider_type,
            method,
            status: IntegrationStatus::Active,
            wialon: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True for integrations the Wialon poller should visit.
    pub fn is_active_pull(&self, provider_type: ProviderType) -> bool {
        self.provider_type == provider_type
            && self.method == TrackingMethod::Pull
            && self.status == IntegrationStatus::Active
    }
}

/// Provider-neutral position returned by every [`crate::services::PositionSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPosition {
    /// Traccar device id or Wialon unit id.
    pub provider_device_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    /// Device fix time, already resolved against the provider's fallbacks.
    pub fix_time: DateTime<Utc>,
}

impl ProviderPosition {
    pub fn to_fix(&self, source: &str) -> LocationFix {
        LocationFix {
            lat: self.latitude,
            lng: self.longitude,
            heading: self.heading,
            speed: self.speed,
            accuracy: self.accuracy,
            timestamp: self.fix_time,
            source: source.to_string(),
        }
    }
}
