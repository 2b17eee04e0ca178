// --- File: crates/geotrack_tracking/src/test_support.rs ---
//! Fakes shared by the job tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use geotrack_common::models::{ProviderPosition, ProviderType, TrackingDevice, TrackingMethod};
use geotrack_common::{BoxFuture, PositionSource, ProviderError};
use geotrack_db::{DbClient, SqlTrackingStore};

type Responder<R> = Box<dyn Fn(&R) -> Result<Vec<ProviderPosition>, ProviderError> + Send + Sync>;

/// Position source that records every request and answers from a closure.
pub struct FakeSource<R> {
    requests: Mutex<Vec<R>>,
    respond: Responder<R>,
}

impl<R: Clone + Send + Sync + 'static> FakeSource<R> {
    pub fn with(
        respond: impl Fn(&R) -> Result<Vec<ProviderPosition>, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub fn empty() -> Self {
        Self::with(|_| Ok(Vec::new()))
    }

    /// Returns the same batch on every call.
    pub fn returning(positions: Vec<ProviderPosition>) -> Self {
        Self::with(move |_| Ok(positions.clone()))
    }

    /// Returns one batch per call, then empty batches.
    pub fn sequence(batches: Vec<Vec<ProviderPosition>>) -> Self {
        let batches = Mutex::new(VecDeque::from(batches));
        Self::with(move |_| Ok(batches.lock().unwrap().pop_front().unwrap_or_default()))
    }

    pub fn failing(make_error: impl Fn() -> ProviderError + Send + Sync + 'static) -> Self {
        Self::with(move |_| Err(make_error()))
    }

    pub fn requests(&self) -> Vec<R> {
        self.requests.lock().unwrap().clone()
    }
}

impl<R: Clone + Send + Sync + 'static> PositionSource for FakeSource<R> {
    type Request = R;

    fn fetch_positions<'a>(
        &'a self,
        request: &'a R,
    ) -> BoxFuture<'a, Vec<ProviderPosition>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let result = (self.respond)(request);
        Box::pin(async move { result })
    }
}

pub fn position_at(provider_device_id: i64, fix_time: DateTime<Utc>) -> ProviderPosition {
    ProviderPosition {
        provider_device_id,
        latitude: 47.3769,
        longitude: 8.5417,
        speed: Some(12.0),
        heading: Some(180.0),
        accuracy: Some(4.0),
        fix_time,
    }
}

pub fn traccar_device(id: &str, tenant_id: &str, traccar_id: i64) -> TrackingDevice {
    TrackingDevice::new(
        id,
        tenant_id,
        "traccar-integration",
        format!("Tracker {id}"),
        ProviderType::TraccarDirect,
        TrackingMethod::Forward,
        format!("imei-{id}"),
    )
    .with_traccar_id(traccar_id)
}

pub fn wialon_device(id: &str, tenant_id: &str, integration_id: &str, unit_id: &str) -> TrackingDevice {
    TrackingDevice::new(
        id,
        tenant_id,
        integration_id,
        format!("Unit {unit_id}"),
        ProviderType::WialonApi,
        TrackingMethod::Pull,
        unit_id,
    )
}

/// Fresh SQLite store with the schema applied.
pub async fn sql_store() -> SqlTrackingStore {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let store = SqlTrackingStore::new(client);
    store.init_schema().await.unwrap();
    store
}
