#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use geotrack_common::models::{EntityRef, HealthStatus, LastLocation, LocationFix};
    use geotrack_common::PositionWindow;
    use geotrack_config::TrackingConfig;
    use geotrack_db::{
        LocationRepository, SqlTrackingStore, SyncStateRepository, TrackingDeviceRepository,
    };

    use crate::events::{tenant_health_topic, tenant_location_topic, InProcessPubSub, TrackingEvent};
    use crate::jobs::health_monitor::HealthMonitorJob;
    use crate::jobs::traccar_sync::{TraccarSyncJob, SYNC_KEY};
    use crate::test_support::{position_at, sql_store, traccar_device, FakeSource};
    use crate::writer::write_latest_and_history;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 14, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn bare_fix(at: DateTime<Utc>) -> LocationFix {
        LocationFix {
            lat: 47.3769,
            lng: 8.5417,
            heading: None,
            speed: None,
            accuracy: None,
            timestamp: at,
            source: "PHONE".to_string(),
        }
    }

    #[tokio::test]
    async fn test_writer_scenarios_a_b_c() {
        let store = sql_store().await;
        let v1 = EntityRef::vehicle("V1");

        let a = write_latest_and_history(&store, &v1, &bare_fix(t(0)), 3).await.unwrap();
        assert!(a.wrote_history);

        let b = write_latest_and_history(&store, &v1, &bare_fix(t(1)), 3).await.unwrap();
        assert!(!b.wrote_history);
        assert_eq!(store.find_latest(&v1).await.unwrap().unwrap().timestamp, t(1));
        assert_eq!(store.history_for(&v1).await.unwrap().len(), 1);

        let c = write_latest_and_history(&store, &v1, &bare_fix(t(10)), 3).await.unwrap();
        assert!(c.wrote_history);

        let latest = store.find_latest(&v1).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, t(10));
        assert_eq!(latest.heading, None);
        assert_eq!(latest.accuracy, None);
        let history: Vec<_> = store
            .history_for(&v1)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.timestamp)
            .collect();
        assert_eq!(history, vec![t(0), t(10)]);
    }

    #[tokio::test]
    async fn test_traccar_sync_scenario_d() {
        let store = Arc::new(sql_store().await);
        store
            .insert_device(traccar_device("d1", "t1", 7).with_vehicle("V1"))
            .await
            .unwrap();
        let source = Arc::new(FakeSource::returning(vec![
            position_at(7, t(10)),
            position_at(7, t(30)),
            position_at(99, t(20)),
        ]));
        let bus = Arc::new(InProcessPubSub::new());
        let mut locations = bus.subscribe(&tenant_location_topic("t1"));
        let mut health = bus.subscribe(&tenant_health_topic("t1"));
        let job: TraccarSyncJob<SqlTrackingStore, FakeSource<PositionWindow>> = TraccarSyncJob::new(
            Arc::clone(&store),
            Arc::clone(&source),
            bus.clone(),
            &TrackingConfig::default(),
        );

        let report = job.sync_once().await.unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.history_written, 2);
        assert_eq!(report.health_transitions, 1);
        assert_eq!(
            store.get_sync_value(SYNC_KEY).await.unwrap().as_deref(),
            Some("2024-02-10T14:00:30.000Z")
        );

        let device = store.find_device("d1").await.unwrap().unwrap();
        assert_eq!(device.health_status, HealthStatus::Online);
        assert_eq!(device.last_seen_at, Some(t(30)));
        let latest = store.find_latest(&EntityRef::vehicle("V1")).await.unwrap().unwrap();
        assert_eq!(latest.timestamp, t(30));
        assert_eq!(latest.source, "TRACCAR");

        assert_eq!(locations.drain().len(), 2);
        assert_eq!(health.drain().len(), 1);

        // The next window starts at the stored cursor.
        job.sync_once().await.unwrap();
        assert_eq!(source.requests()[1].from, t(30));
    }

    #[tokio::test]
    async fn test_health_monitor_scenario_e() {
        let store = Arc::new(sql_store().await);
        let now = Utc::now();
        store.insert_device(traccar_device("stale", "t1", 1)).await.unwrap();
        store.insert_device(traccar_device("fresh", "t1", 2)).await.unwrap();
        store.insert_device(traccar_device("never", "t1", 3)).await.unwrap();
        for (id, ago) in [("stale", 200), ("fresh", 30)] {
            let location = LastLocation {
                lat: 47.0,
                lng: 8.0,
                heading: None,
                speed: None,
                timestamp: now - Duration::seconds(ago),
                source: "TRACCAR".to_string(),
            };
            store.record_fix(id, &location).await.unwrap();
        }

        let bus = Arc::new(InProcessPubSub::new());
        let mut health = bus.subscribe(&tenant_health_topic("t1"));
        let job = HealthMonitorJob::new(Arc::clone(&store), bus.clone(), &TrackingConfig::default());

        let report = job.check_at(now).await.unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.marked_offline, 1);
        match health.try_recv() {
            Some(TrackingEvent::DeviceHealthUpdated(device)) => {
                assert_eq!(device.id, "stale");
                assert_eq!(device.health_status, HealthStatus::Offline);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let again = job.check_at(now).await.unwrap();
        assert_eq!(again.marked_offline, 0);
        assert!(health.try_recv().is_none());

        let statuses = [
            ("stale", HealthStatus::Offline),
            ("fresh", HealthStatus::Online),
            ("never", HealthStatus::Unknown),
        ];
        for (id, expected) in statuses {
            let device = store.find_device(id).await.unwrap().unwrap();
            assert_eq!(device.health_status, expected, "device {id}");
        }
    }
}
