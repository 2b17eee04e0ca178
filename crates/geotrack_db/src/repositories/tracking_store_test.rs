#[cfg(test)]
mod tests {
    use crate::repositories::{MemoryTrackingStore, SqlTrackingStore, TrackingStore};
    use crate::{DbClient, DbError};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use geotrack_common::models::{
        EntityRef, EntityType, EncryptedSecret, HealthStatus, IntegrationStatus, LastLocation,
        LatestLocation, ProviderType, TrackingDevice, TrackingHistoryEntry, TrackingIntegration,
        TrackingMethod, WialonIntegrationConfig,
    };

    async fn sql_store() -> SqlTrackingStore {
        let client = DbClient::from_url("sqlite::memory:").await.unwrap();
        let store = SqlTrackingStore::new(client);
        store.init_schema().await.unwrap();
        store
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn device(id: &str, external_id: &str) -> TrackingDevice {
        TrackingDevice::new(
            id,
            "tenant-1",
            "integration-1",
            format!("Tracker {}", id),
            ProviderType::TraccarDirect,
            TrackingMethod::Forward,
            external_id,
        )
    }

    fn last_location(at: DateTime<Utc>) -> LastLocation {
        LastLocation {
            lat: 47.37,
            lng: 8.54,
            heading: Some(90.0),
            speed: None,
            timestamp: at,
            source: "TRACCAR".to_string(),
        }
    }

    fn latest(entity: &EntityRef, at: DateTime<Utc>, lat: f64) -> LatestLocation {
        LatestLocation {
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            lat,
            lng: 8.5,
            heading: None,
            speed: Some(12.5),
            accuracy: Some(4.0),
            timestamp: at,
            source: "PHONE".to_string(),
            received_at: at,
        }
    }

    async fn devices_are_unique_per_integration<S: TrackingStore>(store: &S) {
        store.insert_device(device("d1", "IMEI-1")).await.unwrap();
        let duplicate = store.insert_device(device("d2", "IMEI-1")).await;
        assert!(matches!(duplicate, Err(DbError::Conflict(_))));

        let mut other_integration = device("d3", "IMEI-1");
        other_integration.integration_id = "integration-2".to_string();
        store.insert_device(other_integration).await.unwrap();
    }

    async fn devices_are_found_by_traccar_id<S: TrackingStore>(store: &S) {
        store
            .insert_device(device("d1", "A").with_traccar_id(10).with_vehicle("v1"))
            .await
            .unwrap();
        store
            .insert_device(device("d2", "B").with_traccar_id(20))
            .await
            .unwrap();
        store.insert_device(device("d3", "C")).await.unwrap();

        let found = store.find_by_traccar_ids(&[10, 20, 30]).await.unwrap();
        let mut ids: Vec<_> = found.iter().map(|d| d.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["d1", "d2"]);

        let d1 = found.iter().find(|d| d.id == "d1").unwrap();
        assert_eq!(d1.vehicle_id.as_deref(), Some("v1"));
        assert_eq!(d1.health_status, HealthStatus::Unknown);

        assert!(store.find_by_traccar_ids(&[]).await.unwrap().is_empty());
    }

    async fn record_fix_sets_online<S: TrackingStore>(store: &S) {
        store.insert_device(device("d1", "A")).await.unwrap();
        store.record_fix("d1", &last_location(t0())).await.unwrap();

        let updated = store.find_device("d1").await.unwrap().unwrap();
        assert_eq!(updated.health_status, HealthStatus::Online);
        assert_eq!(updated.last_seen_at, Some(t0()));
        assert_eq!(updated.last_location, Some(last_location(t0())));
    }

    async fn stale_devices_and_offline_cas<S: TrackingStore>(store: &S) {
        let now = t0();
        store.insert_device(device("never-seen", "A")).await.unwrap();
        store.insert_device(device("stale", "B")).await.unwrap();
        store.insert_device(device("fresh", "C")).await.unwrap();
        store
            .record_fix("stale", &last_location(now - Duration::seconds(200)))
            .await
            .unwrap();
        store
            .record_fix("fresh", &last_location(now - Duration::seconds(10)))
            .await
            .unwrap();

        let cutoff = now - Duration::seconds(180);
        let stale = store.find_stale_online(cutoff).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, "stale");

        assert!(store.mark_offline_if_online("stale").await.unwrap());
        assert!(!store.mark_offline_if_online("stale").await.unwrap());
        assert!(!store.mark_offline_if_online("never-seen").await.unwrap());

        let offline = store.find_device("stale").await.unwrap().unwrap();
        assert_eq!(offline.health_status, HealthStatus::Offline);
        assert!(store.find_stale_online(cutoff).await.unwrap().is_empty());
    }

    async fn latest_is_one_row_per_entity<S: TrackingStore>(store: &S) {
        let v1 = EntityRef::vehicle("v1");
        store.upsert_latest(&latest(&v1, t0(), 1.0)).await.unwrap();
        store
            .upsert_latest(&latest(&v1, t0() + Duration::seconds(5), 2.0))
            .await
            .unwrap();
        let task = EntityRef::new(EntityType::DeliveryTask, "v1");
        store.upsert_latest(&latest(&task, t0(), 3.0)).await.unwrap();

        let row = store.find_latest(&v1).await.unwrap().unwrap();
        assert_eq!(row.lat, 2.0);
        assert_eq!(row.timestamp, t0() + Duration::seconds(5));
        assert_eq!(row.accuracy, Some(4.0));
        assert_eq!(store.find_latest(&task).await.unwrap().unwrap().lat, 3.0);
        assert!(store.find_latest(&EntityRef::vehicle("v2")).await.unwrap().is_none());
    }

    async fn history_is_ordered_and_purged<S: TrackingStore>(store: &S) {
        let v1 = EntityRef::vehicle("v1");
        for offset in [20, 0, 10] {
            let row = latest(&v1, t0() + Duration::days(offset), offset as f64);
            store
                .append_history(&TrackingHistoryEntry::from(&row))
                .await
                .unwrap();
        }

        let rows = store.history_for(&v1).await.unwrap();
        let lats: Vec<f64> = rows.iter().map(|r| r.lat).collect();
        assert_eq!(lats, vec![0.0, 10.0, 20.0]);

        let removed = store
            .purge_history_before(t0() + Duration::days(10))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.history_for(&v1).await.unwrap().len(), 2);
    }

    async fn null_columns_read_back_as_none<S: TrackingStore>(store: &S) {
        store.insert_device(device("bare", "A")).await.unwrap();
        let bare = store.find_device("bare").await.unwrap().unwrap();
        assert_eq!(bare.vehicle_id, None);
        assert_eq!(bare.traccar_device_id, None);
        assert_eq!(bare.last_seen_at, None);
        assert_eq!(bare.last_location, None);
        assert_eq!(bare.assigned_at, None);

        let without_motion = LastLocation {
            heading: None,
            speed: None,
            ..last_location(t0())
        };
        store.record_fix("bare", &without_motion).await.unwrap();
        let seen = store.find_device("bare").await.unwrap().unwrap();
        assert_eq!(seen.last_location, Some(without_motion));

        let v1 = EntityRef::vehicle("v1");
        let sparse = LatestLocation {
            heading: None,
            speed: None,
            accuracy: None,
            ..latest(&v1, t0(), 1.0)
        };
        store.upsert_latest(&sparse).await.unwrap();
        store
            .append_history(&TrackingHistoryEntry::from(&sparse))
            .await
            .unwrap();
        assert_eq!(store.find_latest(&v1).await.unwrap(), Some(sparse.clone()));
        let history = store.history_for(&v1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].accuracy, None);
    }

    async fn sync_state_is_upserted<S: TrackingStore>(store: &S) {
        assert!(store.get_sync_value("traccar.lastFixTimeIso").await.unwrap().is_none());
        store
            .put_sync_value("traccar.lastFixTimeIso", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();
        store
            .put_sync_value("traccar.lastFixTimeIso", "2024-01-01T00:05:00.000Z")
            .await
            .unwrap();
        assert_eq!(
            store.get_sync_value("traccar.lastFixTimeIso").await.unwrap().as_deref(),
            Some("2024-01-01T00:05:00.000Z")
        );
    }

    async fn only_active_pull_integrations_are_listed<S: TrackingStore>(store: &S) {
        let mut active = TrackingIntegration::new(
            "i1",
            "tenant-1",
            "Fleet",
            ProviderType::WialonApi,
            TrackingMethod::Pull,
        );
        active.wialon = Some(WialonIntegrationConfig {
            base_url: Some("https://wialon.example.com".to_string()),
            token_enc: Some(EncryptedSecret {
                ciphertext_b64: "Y3Q=".to_string(),
                iv_b64: "aXY=".to_string(),
                tag_b64: "dGFn".to_string(),
            }),
            polling_interval_seconds: Some(15),
        });
        let mut paused = TrackingIntegration::new(
            "i2",
            "tenant-1",
            "Paused",
            ProviderType::WialonApi,
            TrackingMethod::Pull,
        );
        paused.status = IntegrationStatus::Paused;
        let forward = TrackingIntegration::new(
            "i3",
            "tenant-2",
            "Gateway",
            ProviderType::TraccarDirect,
            TrackingMethod::Forward,
        );
        for integration in [active.clone(), paused, forward] {
            store.insert_integration(integration).await.unwrap();
        }

        let listed = store
            .find_active_pull_integrations(ProviderType::WialonApi)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "i1");
        assert_eq!(listed[0].wialon, active.wialon);
    }

    macro_rules! store_tests {
        ($($name:ident),+ $(,)?) => {
            mod memory {
                use super::*;
                $(
                    #[tokio::test]
                    async fn $name() {
                        super::$name(&MemoryTrackingStore::new()).await;
                    }
                )+
            }

            mod sql {
                use super::*;
                $(
                    #[tokio::test]
                    async fn $name() {
                        super::$name(&sql_store().await).await;
                    }
                )+
            }
        };
    }

    store_tests!(
        devices_are_unique_per_integration,
        devices_are_found_by_traccar_id,
        record_fix_sets_online,
        stale_devices_and_offline_cas,
        latest_is_one_row_per_entity,
        history_is_ordered_and_purged,
        sync_state_is_upserted,
        only_active_pull_integrations_are_listed,
        null_columns_read_back_as_none,
    );
}
