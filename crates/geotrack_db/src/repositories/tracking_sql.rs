//! SQL implementation of the tracking repositories
//!
//! Queries go through `sqlx::Any`, which cannot decode `DateTime<Utc>`, so all
//! timestamps are stored as epoch milliseconds and rows are mapped by hand.

use crate::error::DbError;
use crate::repositories::tracking::{
    LocationRepository, SyncStateRepository, TrackingDeviceRepository,
    TrackingIntegrationRepository,
};
use crate::DbClient;
use chrono::{DateTime, Utc};
use geotrack_common::models::{
    EntityRef, HealthStatus, LastLocation, LatestLocation, ProviderType, TrackingDevice,
    TrackingHistoryEntry, TrackingIntegration, TrackingMethod, WialonIntegrationConfig,
};
use sqlx::any::AnyRow;
use sqlx::{Row, ValueRef};
use tracing::{debug, error, info};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tracking_integrations (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        name TEXT NOT NULL,
        provider_type TEXT NOT NULL,
        method TEXT NOT NULL,
        status TEXT NOT NULL,
        wialon_config TEXT,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tracking_devices (
        id TEXT PRIMARY KEY,
        tenant_id TEXT NOT NULL,
        integration_id TEXT NOT NULL,
        vehicle_id TEXT,
        label TEXT NOT NULL,
        provider_type TEXT NOT NULL,
        method TEXT NOT NULL,
        external_device_id TEXT NOT NULL,
        traccar_device_id BIGINT,
        last_seen_at BIGINT,
        loc_lat DOUBLE PRECISION,
        loc_lng DOUBLE PRECISION,
        loc_heading DOUBLE PRECISION,
        loc_speed DOUBLE PRECISION,
        loc_timestamp BIGINT,
        loc_source TEXT,
        health_status TEXT NOT NULL DEFAULT 'UNKNOWN',
        assigned_at BIGINT,
        unassigned_at BIGINT,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL,
        UNIQUE (tenant_id, integration_id, external_device_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tracking_devices_traccar ON tracking_devices (traccar_device_id)",
    "CREATE INDEX IF NOT EXISTS idx_tracking_devices_health ON tracking_devices (health_status, last_seen_at)",
    r#"
    CREATE TABLE IF NOT EXISTS latest_locations (
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lng DOUBLE PRECISION NOT NULL,
        heading DOUBLE PRECISION,
        speed DOUBLE PRECISION,
        accuracy DOUBLE PRECISION,
        timestamp BIGINT NOT NULL,
        source TEXT NOT NULL,
        received_at BIGINT NOT NULL,
        PRIMARY KEY (entity_type, entity_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tracking_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        entity_type TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lng DOUBLE PRECISION NOT NULL,
        heading DOUBLE PRECISION,
        speed DOUBLE PRECISION,
        accuracy DOUBLE PRECISION,
        timestamp BIGINT NOT NULL,
        source TEXT NOT NULL,
        received_at BIGINT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tracking_history_entity ON tracking_history (entity_type, entity_id, timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_tracking_history_timestamp ON tracking_history (timestamp)",
    r#"
    CREATE TABLE IF NOT EXISTS sync_state (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at BIGINT NOT NULL
    )
    "#,
];

const DEVICE_COLUMNS: &str = "id, tenant_id, integration_id, vehicle_id, label, provider_type, method, \
     external_device_id, traccar_device_id, last_seen_at, loc_lat, loc_lng, loc_heading, \
     loc_speed, loc_timestamp, loc_source, health_status, assigned_at, unassigned_at, \
     created_at, updated_at";

const LOCATION_COLUMNS: &str =
    "entity_type, entity_id, lat, lng, heading, speed, accuracy, timestamp, source, received_at";

#[derive(Debug, Clone)]
pub struct SqlTrackingStore {
    db_client: DbClient,
}

impl SqlTrackingStore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Create the tracking tables and indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing tracking schema");
        for statement in SCHEMA {
            self.db_client.execute(statement).await?;
        }
        info!("Tracking schema initialized");
        Ok(())
    }

    fn pool(&self) -> &sqlx::Pool<sqlx::Any> {
        self.db_client.pool()
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::DecodeError(format!("timestamp out of range: {}", millis)))
}

fn opt_from_millis(millis: Option<i64>) -> Result<Option<DateTime<Utc>>, DbError> {
    millis.map(from_millis).transpose()
}

fn query_failed(context: &'static str) -> impl Fn(sqlx::Error) -> DbError {
    move |e| {
        error!(error = %e, "{}", context);
        DbError::QueryError(e.to_string())
    }
}

/// Reads a nullable column. The Any driver reports SQL `NULL` as its own type,
/// which `Option<T>` refuses to decode, so NULL is checked on the raw value first.
fn nullable<'r, T>(row: &'r AnyRow, column: &str) -> Result<Option<T>, DbError>
where
    T: sqlx::Decode<'r, sqlx::Any> + sqlx::Type<sqlx::Any>,
{
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    Ok(Some(row.try_get::<T, _>(column)?))
}

fn device_from_row(row: &AnyRow) -> Result<TrackingDevice, DbError> {
    let provider_type: String = row.try_get("provider_type")?;
    let method: String = row.try_get("method")?;
    let health_status: String = row.try_get("health_status")?;

    let last_location = match (
        nullable::<f64>(row, "loc_lat")?,
        nullable::<f64>(row, "loc_lng")?,
        nullable::<i64>(row, "loc_timestamp")?,
    ) {
        (Some(lat), Some(lng), Some(timestamp)) => Some(LastLocation {
            lat,
            lng,
            heading: nullable(row, "loc_heading")?,
            speed: nullable(row, "loc_speed")?,
            timestamp: from_millis(timestamp)?,
            source: nullable::<String>(row, "loc_source")?.unwrap_or_default(),
        }),
        _ => None,
    };

    Ok(TrackingDevice {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        integration_id: row.try_get("integration_id")?,
        vehicle_id: nullable(row, "vehicle_id")?,
        label: row.try_get("label")?,
        provider_type: provider_type.parse::<ProviderType>()?,
        method: method.parse::<TrackingMethod>()?,
        external_device_id: row.try_get("external_device_id")?,
        traccar_device_id: nullable(row, "traccar_device_id")?,
        last_seen_at: opt_from_millis(nullable(row, "last_seen_at")?)?,
        last_location,
        health_status: health_status.parse::<HealthStatus>()?,
        assigned_at: opt_from_millis(nullable(row, "assigned_at")?)?,
        unassigned_at: opt_from_millis(nullable(row, "unassigned_at")?)?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

fn latest_from_row(row: &AnyRow) -> Result<LatestLocation, DbError> {
    let entity_type: String = row.try_get("entity_type")?;
    Ok(LatestLocation {
        entity_type: entity_type.parse()?,
        entity_id: row.try_get("entity_id")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        heading: nullable(row, "heading")?,
        speed: nullable(row, "speed")?,
        accuracy: nullable(row, "accuracy")?,
        timestamp: from_millis(row.try_get("timestamp")?)?,
        source: row.try_get("source")?,
        received_at: from_millis(row.try_get("received_at")?)?,
    })
}

fn integration_from_row(row: &AnyRow) -> Result<TrackingIntegration, DbError> {
    let provider_type: String = row.try_get("provider_type")?;
    let method: String = row.try_get("method")?;
    let status: String = row.try_get("status")?;
    let wialon = match nullable::<String>(row, "wialon_config")? {
        Some(json) => Some(serde_json::from_str::<WialonIntegrationConfig>(&json)?),
        None => None,
    };

    Ok(TrackingIntegration {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        name: row.try_get("name")?,
        provider_type: provider_type.parse()?,
        method: method.parse()?,
        status: status.parse()?,
        wialon,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

impl TrackingDeviceRepository for SqlTrackingStore {
    async fn insert_device(&self, device: TrackingDevice) -> Result<TrackingDevice, DbError> {
        debug!(device_id = %device.id, tenant_id = %device.tenant_id, "Inserting tracking device");

        let location = device.last_location.as_ref();
        let query = format!(
            "INSERT INTO tracking_devices ({}) VALUES ({})",
            DEVICE_COLUMNS,
            placeholders(1, 21)
        );

        let result = sqlx::query(&query)
            .bind(&device.id)
            .bind(&device.tenant_id)
            .bind(&device.integration_id)
            .bind(device.vehicle_id.clone())
            .bind(&device.label)
            .bind(device.provider_type.as_str())
            .bind(device.method.as_str())
            .bind(&device.external_device_id)
            .bind(device.traccar_device_id)
            .bind(device.last_seen_at.map(to_millis))
            .bind(location.map(|l| l.lat))
            .bind(location.map(|l| l.lng))
            .bind(location.and_then(|l| l.heading))
            .bind(location.and_then(|l| l.speed))
            .bind(location.map(|l| to_millis(l.timestamp)))
            .bind(location.map(|l| l.source.clone()))
            .bind(device.health_status.as_str())
            .bind(device.assigned_at.map(to_millis))
            .bind(device.unassigned_at.map(to_millis))
            .bind(to_millis(device.created_at))
            .bind(to_millis(device.updated_at))
            .execute(self.pool())
            .await;

        match result {
            Ok(_) => Ok(device),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DbError::Conflict(format!(
                    "device '{}' already registered for integration '{}'",
                    device.external_device_id, device.integration_id
                )))
            }
            Err(e) => Err(query_failed("Failed to insert tracking device")(e)),
        }
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<TrackingDevice>, DbError> {
        let query = format!("SELECT {} FROM tracking_devices WHERE id = $1", DEVICE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(device_id)
            .fetch_optional(self.pool())
            .await
            .map_err(query_failed("Failed to find tracking device"))?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn find_by_traccar_ids(&self, traccar_ids: &[i64]) -> Result<Vec<TrackingDevice>, DbError> {
        if traccar_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {} FROM tracking_devices WHERE traccar_device_id IN ({}) ORDER BY created_at, id",
            DEVICE_COLUMNS,
            placeholders(1, traccar_ids.len())
        );
        let mut q = sqlx::query(&query);
        for id in traccar_ids {
            q = q.bind(*id);
        }
        let rows = q
            .fetch_all(self.pool())
            .await
            .map_err(query_failed("Failed to find devices by Traccar id"))?;
        rows.iter().map(device_from_row).collect()
    }

    async fn find_by_integration(&self, integration_id: &str) -> Result<Vec<TrackingDevice>, DbError> {
        let query = format!(
            "SELECT {} FROM tracking_devices WHERE integration_id = $1 ORDER BY created_at, id",
            DEVICE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(integration_id)
            .fetch_all(self.pool())
            .await
            .map_err(query_failed("Failed to find devices by integration"))?;
        rows.iter().map(device_from_row).collect()
    }

    async fn record_fix(&self, device_id: &str, location: &LastLocation) -> Result<(), DbError> {
        let query = r#"
            UPDATE tracking_devices
            SET last_seen_at = $1, loc_lat = $2, loc_lng = $3, loc_heading = $4, loc_speed = $5,
                loc_timestamp = $6, loc_source = $7, health_status = $8, updated_at = $9
            WHERE id = $10
        "#;
        sqlx::query(query)
            .bind(to_millis(location.timestamp))
            .bind(location.lat)
            .bind(location.lng)
            .bind(location.heading)
            .bind(location.speed)
            .bind(to_millis(location.timestamp))
            .bind(&location.source)
            .bind(HealthStatus::Online.as_str())
            .bind(to_millis(Utc::now()))
            .bind(device_id)
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to record device fix"))?;
        Ok(())
    }

    async fn find_stale_online(&self, cutoff: DateTime<Utc>) -> Result<Vec<TrackingDevice>, DbError> {
        let query = format!(
            "SELECT {} FROM tracking_devices \
             WHERE health_status = $1 AND last_seen_at IS NOT NULL AND last_seen_at < $2 \
             ORDER BY last_seen_at, id",
            DEVICE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(HealthStatus::Online.as_str())
            .bind(to_millis(cutoff))
            .fetch_all(self.pool())
            .await
            .map_err(query_failed("Failed to find stale devices"))?;
        rows.iter().map(device_from_row).collect()
    }

    async fn mark_offline_if_online(&self, device_id: &str) -> Result<bool, DbError> {
        let query = r#"
            UPDATE tracking_devices
            SET health_status = $1, updated_at = $2
            WHERE id = $3 AND health_status = $4
        "#;
        let result = sqlx::query(query)
            .bind(HealthStatus::Offline.as_str())
            .bind(to_millis(Utc::now()))
            .bind(device_id)
            .bind(HealthStatus::Online.as_str())
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to mark device offline"))?;
        Ok(result.rows_affected() == 1)
    }
}

impl LocationRepository for SqlTrackingStore {
    async fn find_latest(&self, entity: &EntityRef) -> Result<Option<LatestLocation>, DbError> {
        let query = format!(
            "SELECT {} FROM latest_locations WHERE entity_type = $1 AND entity_id = $2",
            LOCATION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(entity.entity_type.as_str())
            .bind(&entity.entity_id)
            .fetch_optional(self.pool())
            .await
            .map_err(query_failed("Failed to read latest location"))?;
        row.as_ref().map(latest_from_row).transpose()
    }

    async fn upsert_latest(&self, latest: &LatestLocation) -> Result<(), DbError> {
        let query = format!(
            "INSERT INTO latest_locations ({}) VALUES ({}) \
             ON CONFLICT (entity_type, entity_id) DO UPDATE SET \
             lat = excluded.lat, lng = excluded.lng, heading = excluded.heading, \
             speed = excluded.speed, accuracy = excluded.accuracy, timestamp = excluded.timestamp, \
             source = excluded.source, received_at = excluded.received_at",
            LOCATION_COLUMNS,
            placeholders(1, 10)
        );
        sqlx::query(&query)
            .bind(latest.entity_type.as_str())
            .bind(&latest.entity_id)
            .bind(latest.lat)
            .bind(latest.lng)
            .bind(latest.heading)
            .bind(latest.speed)
            .bind(latest.accuracy)
            .bind(to_millis(latest.timestamp))
            .bind(&latest.source)
            .bind(to_millis(latest.received_at))
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to upsert latest location"))?;
        Ok(())
    }

    async fn append_history(&self, entry: &TrackingHistoryEntry) -> Result<(), DbError> {
        let query = format!(
            "INSERT INTO tracking_history ({}) VALUES ({})",
            LOCATION_COLUMNS,
            placeholders(1, 10)
        );
        sqlx::query(&query)
            .bind(entry.entity_type.as_str())
            .bind(&entry.entity_id)
            .bind(entry.lat)
            .bind(entry.lng)
            .bind(entry.heading)
            .bind(entry.speed)
            .bind(entry.accuracy)
            .bind(to_millis(entry.timestamp))
            .bind(&entry.source)
            .bind(to_millis(entry.received_at))
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to append tracking history"))?;
        Ok(())
    }

    async fn history_for(&self, entity: &EntityRef) -> Result<Vec<TrackingHistoryEntry>, DbError> {
        let query = format!(
            "SELECT {} FROM tracking_history WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY timestamp, id",
            LOCATION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(entity.entity_type.as_str())
            .bind(&entity.entity_id)
            .fetch_all(self.pool())
            .await
            .map_err(query_failed("Failed to read tracking history"))?;
        rows.iter()
            .map(|row| latest_from_row(row).map(|latest| TrackingHistoryEntry::from(&latest)))
            .collect()
    }

    async fn purge_history_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM tracking_history WHERE timestamp < $1")
            .bind(to_millis(cutoff))
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to purge tracking history"))?;
        Ok(result.rows_affected())
    }
}

impl SyncStateRepository for SqlTrackingStore {
    async fn get_sync_value(&self, key: &str) -> Result<Option<String>, DbError> {
        let row = sqlx::query("SELECT value FROM sync_state WHERE key = $1")
            .bind(key)
            .fetch_optional(self.pool())
            .await
            .map_err(query_failed("Failed to read sync state"))?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn put_sync_value(&self, key: &str, value: &str) -> Result<(), DbError> {
        let query = r#"
            INSERT INTO sync_state (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#;
        sqlx::query(query)
            .bind(key)
            .bind(value)
            .bind(to_millis(Utc::now()))
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to write sync state"))?;
        Ok(())
    }
}

impl TrackingIntegrationRepository for SqlTrackingStore {
    async fn insert_integration(
        &self,
        integration: TrackingIntegration,
    ) -> Result<TrackingIntegration, DbError> {
        let wialon_json = integration
            .wialon
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let query = r#"
            INSERT INTO tracking_integrations
                (id, tenant_id, name, provider_type, method, status, wialon_config, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;
        sqlx::query(query)
            .bind(&integration.id)
            .bind(&integration.tenant_id)
            .bind(&integration.name)
            .bind(integration.provider_type.as_str())
            .bind(integration.method.as_str())
            .bind(integration.status.as_str())
            .bind(wialon_json)
            .bind(to_millis(integration.created_at))
            .bind(to_millis(integration.updated_at))
            .execute(self.pool())
            .await
            .map_err(query_failed("Failed to insert tracking integration"))?;
        Ok(integration)
    }

    async fn find_active_pull_integrations(
        &self,
        provider_type: ProviderType,
    ) -> Result<Vec<TrackingIntegration>, DbError> {
        let query = r#"
            SELECT id, tenant_id, name, provider_type, method, status, wialon_config, created_at, updated_at
            FROM tracking_integrations
            WHERE provider_type = $1 AND method = $2 AND status = $3
            ORDER BY created_at, id
        "#;
        let rows = sqlx::query(query)
            .bind(provider_type.as_str())
            .bind(TrackingMethod::Pull.as_str())
            .bind(geotrack_common::models::IntegrationStatus::Active.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(query_failed("Failed to list pull integrations"))?;
        rows.iter().map(integration_from_row).collect()
    }
}
