// --- File: crates/geotrack_tracking/src/ingest.rs ---
//! Direct location pings, typically from a driver's phone.
//!
//! Ownership of the entity is checked by the caller before a ping gets here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geotrack_common::models::{EntityRef, EntityType, LatestLocation, LocationFix, SOURCE_PHONE};
use geotrack_config::TrackingConfig;
use geotrack_db::TrackingStore;
use serde::Deserialize;
use tracing::debug;

use crate::error::TrackingError;
use crate::events::{booking_topic, tenant_location_topic, EventPublisher, TrackingEvent};
use crate::writer::write_latest_and_history;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPing {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Defaults to the time of ingestion.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Defaults to `PHONE`.
    #[serde(default)]
    pub source: Option<String>,
}

pub fn is_valid_lat_lng(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

pub struct PingIngestor<S> {
    store: Arc<S>,
    publisher: Arc<dyn EventPublisher>,
    min_history_interval_seconds: i64,
}

impl<S: TrackingStore> PingIngestor<S> {
    pub fn new(store: Arc<S>, publisher: Arc<dyn EventPublisher>, tracking: &TrackingConfig) -> Self {
        Self {
            store,
            publisher,
            min_history_interval_seconds: tracking.min_history_interval_seconds,
        }
    }

    /// Writes the ping and publishes it on the topic matching the entity type.
    /// Yard pings are stored but not published.
    pub async fn ingest_ping(
        &self,
        tenant_id: &str,
        ping: LocationPing,
    ) -> Result<LatestLocation, TrackingError> {
        if !is_valid_lat_lng(ping.lat, ping.lng) {
            return Err(TrackingError::Validation("Invalid coordinates".to_string()));
        }
        if ping.entity_id.trim().is_empty() {
            return Err(TrackingError::Validation("Entity id is required".to_string()));
        }

        let entity = EntityRef::new(ping.entity_type, ping.entity_id);
        let fix = LocationFix {
            lat: ping.lat,
            lng: ping.lng,
            heading: ping.heading,
            speed: ping.speed,
            accuracy: ping.accuracy,
            timestamp: ping.timestamp.unwrap_or_else(Utc::now),
            source: ping.source.unwrap_or_else(|| SOURCE_PHONE.to_string()),
        };

        let outcome = write_latest_and_history(
            self.store.as_ref(),
            &entity,
            &fix,
            self.min_history_interval_seconds,
        )
        .await?;

        let topic = match entity.entity_type {
            EntityType::Vehicle => Some(tenant_location_topic(tenant_id)),
            EntityType::DeliveryTask => Some(booking_topic(&entity.entity_id)),
            EntityType::Yard => None,
        };
        if let Some(topic) = topic {
            self.publisher
                .publish(&topic, TrackingEvent::LocationUpdated(outcome.latest.clone()));
        }

        debug!(
            tenant_id,
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            source = %fix.source,
            "Location ping received"
        );
        Ok(outcome.latest)
    }
}
