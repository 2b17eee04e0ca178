// --- File: crates/services/geotrack_worker/src/job_factory.rs ---
//! Builds provider clients from the config and spawns the enabled jobs.

use std::sync::Arc;

use geotrack_common::{create_client, AesGcmCipher, GeotrackError, SecretCipher, DEFAULT_TIMEOUT_SECS};
use geotrack_config::AppConfig;
use geotrack_db::TrackingStore;
use geotrack_traccar::TraccarClient;
use geotrack_tracking::{
    spawn_job, EventPublisher, HealthMonitorJob, HistoryRetentionJob, InProcessPubSub,
    IntervalTicker, TraccarSyncJob, WialonPollerJob,
};
use geotrack_wialon::WialonClient;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Everything the jobs share, built once at startup.
pub struct WorkerServices<S> {
    pub config: Arc<AppConfig>,
    pub store: Arc<S>,
    pub publisher: Arc<InProcessPubSub>,
    pub traccar: Option<Arc<TraccarClient>>,
    pub wialon: Arc<WialonClient>,
    pub cipher: Option<Arc<dyn SecretCipher>>,
}

impl<S: TrackingStore> WorkerServices<S> {
    pub fn new(config: Arc<AppConfig>, store: Arc<S>) -> Result<Self, GeotrackError> {
        let http = create_client(DEFAULT_TIMEOUT_SECS, true)?;

        let traccar = match &config.traccar {
            Some(traccar_config) => {
                info!(base_url = %traccar_config.base_url, "✅ Traccar client initialized");
                Some(Arc::new(TraccarClient::new(http.clone(), traccar_config)))
            }
            None => {
                info!("ℹ️ No traccar section configured, Traccar sync disabled");
                None
            }
        };

        let cipher: Option<Arc<dyn SecretCipher>> = match &config.encryption {
            Some(encryption) => {
                let cipher: Arc<dyn SecretCipher> =
                    Arc::new(AesGcmCipher::from_base64_key(&encryption.key_base64)?);
                Some(cipher)
            }
            None => {
                warn!("No encryption key configured, Wialon poller disabled");
                None
            }
        };

        Ok(Self {
            config,
            store,
            publisher: Arc::new(InProcessPubSub::new()),
            traccar,
            wialon: Arc::new(WialonClient::new(http)),
            cipher,
        })
    }

    fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.publisher.clone()
    }

    /// Spawns every job whose dependencies are configured. Each job gets its
    /// own interval ticker.
    pub fn spawn_jobs(&self) -> Vec<JoinHandle<usize>> {
        let jobs_config = &self.config.jobs;
        let tracking = &self.config.tracking;
        let mut handles = Vec::new();

        if let Some(traccar) = &self.traccar {
            let job = TraccarSyncJob::new(
                Arc::clone(&self.store),
                Arc::clone(traccar),
                self.publisher(),
                tracking,
            );
            info!(interval_secs = jobs_config.traccar_sync_interval_seconds, "Starting Traccar sync job");
            handles.push(spawn_job(
                Arc::new(job),
                IntervalTicker::from_secs(jobs_config.traccar_sync_interval_seconds),
            ));
        }

        if let Some(cipher) = &self.cipher {
            let job = WialonPollerJob::new(
                Arc::clone(&self.store),
                Arc::clone(&self.wialon),
                self.publisher(),
                Arc::clone(cipher),
                &self.config.wialon,
                tracking,
            );
            info!(interval_secs = jobs_config.wialon_poll_interval_seconds, "Starting Wialon poller job");
            handles.push(spawn_job(
                Arc::new(job),
                IntervalTicker::from_secs(jobs_config.wialon_poll_interval_seconds),
            ));
        }

        let health_interval = jobs_config.health_check_interval_seconds();
        info!(interval_secs = health_interval, "Starting device health monitor job");
        handles.push(spawn_job(
            Arc::new(HealthMonitorJob::new(
                Arc::clone(&self.store),
                self.publisher(),
                tracking,
            )),
            IntervalTicker::from_secs(health_interval),
        ));

        info!(
            interval_secs = jobs_config.history_retention_interval_seconds,
            ttl_days = tracking.history_ttl_days,
            "Starting history retention job"
        );
        handles.push(spawn_job(
            Arc::new(HistoryRetentionJob::new(Arc::clone(&self.store), tracking)),
            IntervalTicker::from_secs(jobs_config.history_retention_interval_seconds),
        ));

        handles
    }
}
