//! In-memory implementation of the tracking repositories
//!
//! Used by the worker when no database is configured, and by tests.

use crate::error::DbError;
use crate::repositories::tracking::{
    LocationRepository, SyncStateRepository, TrackingDeviceRepository,
    TrackingIntegrationRepository,
};
use chrono::{DateTime, Utc};
use geotrack_common::models::{
    EntityRef, HealthStatus, LastLocation, LatestLocation, ProviderType, TrackingDevice,
    TrackingHistoryEntry, TrackingIntegration,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    devices: BTreeMap<String, TrackingDevice>,
    integrations: BTreeMap<String, TrackingIntegration>,
    latest: HashMap<EntityRef, LatestLocation>,
    history: Vec<TrackingHistoryEntry>,
    sync_state: HashMap<String, String>,
}

/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackingStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of LatestLocation rows held.
    pub async fn latest_count(&self) -> usize {
        self.state.read().await.latest.len()
    }

    /// Overwrite a device record as-is. Lets tests set up arbitrary health and
    /// last-seen combinations.
    pub async fn put_device(&self, device: TrackingDevice) {
        self.state
            .write()
            .await
            .devices
            .insert(device.id.clone(), device);
    }
}

impl TrackingDeviceRepository for MemoryTrackingStore {
    async fn insert_device(&self, device: TrackingDevice) -> Result<TrackingDevice, DbError> {
        let mut state = self.state.write().await;
        let duplicate = state.devices.values().any(|existing| {
            existing.tenant_id == device.tenant_id
                && existing.integration_id == device.integration_id
                && existing.external_device_id == device.external_device_id
        });
        if duplicate || state.devices.contains_key(&device.id) {
            return Err(DbError::Conflict(format!(
                "device '{}' already registered for integration '{}'",
                device.external_device_id, device.integration_id
            )));
        }
        state.devices.insert(device.id.clone(), device.clone());
        Ok(device)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<TrackingDevice>, DbError> {
        Ok(self.state.read().await.devices.get(device_id).cloned())
    }

    async fn find_by_traccar_ids(&self, traccar_ids: &[i64]) -> Result<Vec<TrackingDevice>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .values()
            .filter(|d| d.traccar_device_id.is_some_and(|id| traccar_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn find_by_integration(&self, integration_id: &str) -> Result<Vec<TrackingDevice>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .values()
            .filter(|d| d.integration_id == integration_id)
            .cloned()
            .collect())
    }

    async fn record_fix(&self, device_id: &str, location: &LastLocation) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        if let Some(device) = state.devices.get_mut(device_id) {
            device.last_seen_at = Some(location.timestamp);
            device.last_location = Some(location.clone());
            device.health_status = HealthStatus::Online;
            device.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_stale_online(&self, cutoff: DateTime<Utc>) -> Result<Vec<TrackingDevice>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .values()
            .filter(|d| {
                d.health_status == HealthStatus::Online
                    && d.last_seen_at.is_some_and(|seen| seen < cutoff)
            })
            .cloned()
            .collect())
    }

    async fn mark_offline_if_online(&self, device_id: &str) -> Result<bool, DbError> {
        let mut state = self.state.write().await;
        match state.devices.get_mut(device_id) {
            Some(device) if device.health_status == HealthStatus::Online => {
                device.health_status = HealthStatus::Offline;
                device.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl LocationRepository for MemoryTrackingStore {
    async fn find_latest(&self, entity: &EntityRef) -> Result<Option<LatestLocation>, DbError> {
        Ok(self.state.read().await.latest.get(entity).cloned())
    }

    async fn upsert_latest(&self, latest: &LatestLocation) -> Result<(), DbError> {
        self.state
            .write()
            .await
            .latest
            .insert(latest.entity(), latest.clone());
        Ok(())
    }

    async fn append_history(&self, entry: &TrackingHistoryEntry) -> Result<(), DbError> {
        self.state.write().await.history.push(entry.clone());
        Ok(())
    }

    async fn history_for(&self, entity: &EntityRef) -> Result<Vec<TrackingHistoryEntry>, DbError> {
        let state = self.state.read().await;
        let mut rows: Vec<TrackingHistoryEntry> = state
            .history
            .iter()
            .filter(|h| h.entity_type == entity.entity_type && h.entity_id == entity.entity_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal fix times.
        rows.sort_by_key(|h| h.timestamp);
        Ok(rows)
    }

    async fn purge_history_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut state = self.state.write().await;
        let before = state.history.len();
        state.history.retain(|h| h.timestamp >= cutoff);
        Ok((before - state.history.len()) as u64)
    }
}

impl SyncStateRepository for MemoryTrackingStore {
    async fn get_sync_value(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.state.read().await.sync_state.get(key).cloned())
    }

    async fn put_sync_value(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.state
            .write()
            .await
            .sync_state
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl TrackingIntegrationRepository for MemoryTrackingStore {
    async fn insert_integration(
        &self,
        integration: TrackingIntegration,
    ) -> Result<TrackingIntegration, DbError> {
        let mut state = self.state.write().await;
        if state.integrations.contains_key(&integration.id) {
            return Err(DbError::Conflict(format!(
                "integration '{}' already exists",
                integration.id
            )));
        }
        state
            .integrations
            .insert(integration.id.clone(), integration.clone());
        Ok(integration)
    }

    async fn find_active_pull_integrations(
        &self,
        provider_type: ProviderType,
    ) -> Result<Vec<TrackingIntegration>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .integrations
            .values()
            .filter(|i| i.is_active_pull(provider_type))
            .cloned()
            .collect())
    }
}
