//! Repository traits for tracking state
//!
//! The tracking jobs are generic over [`TrackingStore`], so the SQL store and
//! the in-memory store are interchangeable.

use crate::error::DbError;
use chrono::{DateTime, Utc};
use geotrack_common::models::{
    EntityRef, LastLocation, LatestLocation, ProviderType, TrackingDevice, TrackingHistoryEntry,
    TrackingIntegration,
};

pub trait TrackingDeviceRepository {
    /// Insert a new device. Fails with [`DbError::Conflict`] when
    /// `(tenant, integration, external device id)` already exists.
    fn insert_device(
        &self,
        device: TrackingDevice,
    ) -> impl std::future::Future<Output = Result<TrackingDevice, DbError>> + Send;

    fn find_device(
        &self,
        device_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<TrackingDevice>, DbError>> + Send;

    /// All devices whose Traccar id is in `traccar_ids`.
    fn find_by_traccar_ids(
        &self,
        traccar_ids: &[i64],
    ) -> impl std::future::Future<Output = Result<Vec<TrackingDevice>, DbError>> + Send;

    fn find_by_integration(
        &self,
        integration_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<TrackingDevice>, DbError>> + Send;

    /// Unconditionally set last-seen (the fix time), last location and health ONLINE.
    fn record_fix(
        &self,
        device_id: &str,
        location: &LastLocation,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// ONLINE devices with a non-null last-seen strictly before `cutoff`.
    fn find_stale_online(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<TrackingDevice>, DbError>> + Send;

    /// Set health OFFLINE only if it is currently ONLINE.
    ///
    /// Returns `false` when another writer changed the status first.
    fn mark_offline_if_online(
        &self,
        device_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, DbError>> + Send;
}

pub trait LocationRepository {
    fn find_latest(
        &self,
        entity: &EntityRef,
    ) -> impl std::future::Future<Output = Result<Option<LatestLocation>, DbError>> + Send;

    /// Insert or replace the single row for the entity.
    fn upsert_latest(
        &self,
        latest: &LatestLocation,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    fn append_history(
        &self,
        entry: &TrackingHistoryEntry,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// History rows for the entity ordered by fix time.
    fn history_for(
        &self,
        entity: &EntityRef,
    ) -> impl std::future::Future<Output = Result<Vec<TrackingHistoryEntry>, DbError>> + Send;

    /// Delete history with a fix time before `cutoff`; returns the number removed.
    fn purge_history_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, DbError>> + Send;
}

/// Named key/value rows used as job cursors.
pub trait SyncStateRepository {
    fn get_sync_value(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, DbError>> + Send;

    fn put_sync_value(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;
}

pub trait TrackingIntegrationRepository {
    fn insert_integration(
        &self,
        integration: TrackingIntegration,
    ) -> impl std::future::Future<Output = Result<TrackingIntegration, DbError>> + Send;

    /// ACTIVE integrations of `provider_type` using the PULL method.
    fn find_active_pull_integrations(
        &self,
        provider_type: ProviderType,
    ) -> impl std::future::Future<Output = Result<Vec<TrackingIntegration>, DbError>> + Send;
}

/// Everything the tracking jobs need from storage.
pub trait TrackingStore:
    TrackingDeviceRepository
    + LocationRepository
    + SyncStateRepository
    + TrackingIntegrationRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> TrackingStore for T where
    T: TrackingDeviceRepository
        + LocationRepository
        + SyncStateRepository
        + TrackingIntegrationRepository
        + Send
        + Sync
        + 'static
{
}
