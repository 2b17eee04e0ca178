#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use geotrack_common::models::HealthStatus;
    use geotrack_config::TrackingConfig;
    use geotrack_db::{MemoryTrackingStore, TrackingDeviceRepository};

    use crate::error::TrackingError;
    use crate::events::{tenant_health_topic, InProcessPubSub, TrackingEvent};
    use crate::jobs::health_monitor::HealthMonitorJob;
    use crate::scheduler::{run_job, ManualTicker};
    use crate::test_support::traccar_device;

    fn seen(id: &str, tenant: &str, status: HealthStatus, ago_secs: Option<i64>) -> geotrack_common::models::TrackingDevice {
        let mut device = traccar_device(id, tenant, 1);
        device.health_status = status;
        device.last_seen_at = ago_secs.map(|s| Utc::now() - Duration::seconds(s));
        device
    }

    fn setup() -> (HealthMonitorJob<MemoryTrackingStore>, Arc<MemoryTrackingStore>, Arc<InProcessPubSub>) {
        let store = Arc::new(MemoryTrackingStore::new());
        let bus = Arc::new(InProcessPubSub::new());
        let job = HealthMonitorJob::new(Arc::clone(&store), bus.clone(), &TrackingConfig::default());
        (job, store, bus)
    }

    #[tokio::test]
    async fn test_stale_online_device_goes_offline_once() {
        let (job, store, bus) = setup();
        store.put_device(seen("d1", "t1", HealthStatus::Online, Some(200))).await;
        let mut health = bus.subscribe(&tenant_health_topic("t1"));

        let report = job.check_at(Utc::now()).await.unwrap();
        assert_eq!(report.candidates, 1);
        assert_eq!(report.marked_offline, 1);

        let device = store.find_device("d1").await.unwrap().unwrap();
        assert_eq!(device.health_status, HealthStatus::Offline);

        match health.try_recv() {
            Some(TrackingEvent::DeviceHealthUpdated(d)) => {
                assert_eq!(d.id, "d1");
                assert_eq!(d.health_status, HealthStatus::Offline);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(health.try_recv().is_none());

        // A second pass finds nothing left to do.
        let again = job.check_at(Utc::now()).await.unwrap();
        assert_eq!(again.marked_offline, 0);
        assert!(health.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_fresh_never_seen_and_offline_devices_are_left_alone() {
        let (job, store, bus) = setup();
        store.put_device(seen("fresh", "t1", HealthStatus::Online, Some(60))).await;
        store.put_device(seen("never", "t1", HealthStatus::Unknown, None)).await;
        store.put_device(seen("gone", "t1", HealthStatus::Offline, Some(3600))).await;
        let mut health = bus.subscribe(&tenant_health_topic("t1"));

        let report = job.check_at(Utc::now()).await.unwrap();
        assert_eq!(report.candidates, 0);
        assert!(health.try_recv().is_none());

        let never = store.find_device("never").await.unwrap().unwrap();
        assert_eq!(never.health_status, HealthStatus::Unknown);
        let fresh = store.find_device("fresh").await.unwrap().unwrap();
        assert_eq!(fresh.health_status, HealthStatus::Online);
    }

    #[tokio::test]
    async fn test_out_of_range_threshold_fails_the_check() {
        let store = Arc::new(MemoryTrackingStore::new());
        store.put_device(seen("d1", "t1", HealthStatus::Online, Some(200))).await;
        let tracking = TrackingConfig {
            tracker_offline_after_seconds: i64::MAX,
            ..Default::default()
        };
        let job = HealthMonitorJob::new(Arc::clone(&store), Arc::new(InProcessPubSub::new()), &tracking);

        assert!(matches!(job.check_at(Utc::now()).await, Err(TrackingError::Validation(_))));
        let device = store.find_device("d1").await.unwrap().unwrap();
        assert_eq!(device.health_status, HealthStatus::Online);
    }

    #[tokio::test]
    async fn test_events_go_to_each_devices_tenant() {
        let (job, store, bus) = setup();
        store.put_device(seen("a", "t1", HealthStatus::Online, Some(500))).await;
        store.put_device(seen("b", "t2", HealthStatus::Online, Some(500))).await;
        let mut t1 = bus.subscribe(&tenant_health_topic("t1"));
        let mut t2 = bus.subscribe(&tenant_health_topic("t2"));

        run_job(&job, ManualTicker::times(1)).await;

        assert_eq!(t1.drain().len(), 1);
        assert_eq!(t2.drain().len(), 1);
    }
}
