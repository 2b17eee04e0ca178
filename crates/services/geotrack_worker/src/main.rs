// File: services/geotrack_worker/src/main.rs
mod job_factory;

use std::sync::Arc;

use geotrack_common::{config_error, init_from_config, log_result, Context, GeotrackError};
use geotrack_config::{load_config, AppConfig};
use geotrack_db::{DbClient, MemoryTrackingStore, SqlTrackingStore, TrackingStore};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::job_factory::WorkerServices;

#[tokio::main]
async fn main() -> Result<(), GeotrackError> {
    let config = Arc::new(load_config().map_err(config_error)?);
    let _log_guard = init_from_config(&config.logging);
    warn_unresolved_secrets(&config);

    // Two workers against one database duplicate events; the id tells them apart in logs.
    let instance_id = Uuid::new_v4();
    let span = info_span!("geotrack_worker", instance = %instance_id);

    async move {
        if !config.jobs.enabled {
            info!("ℹ️ Background jobs disabled via config (jobs.enabled = false)");
            return Ok::<(), GeotrackError>(());
        }

        match &config.database {
            Some(database) => {
                let client = DbClient::from_config(database)
                    .await
                    .context("connecting to the tracking database")?;
                let store = SqlTrackingStore::new(client);
                log_result(
                    store.init_schema().await,
                    "✅ SQL tracking store ready",
                    "🚨 Failed to initialize tracking schema",
                )?;
                run(Arc::clone(&config), Arc::new(store)).await
            }
            None => {
                warn!("No database configured, tracking state is kept in memory only");
                run(Arc::clone(&config), Arc::new(MemoryTrackingStore::new())).await
            }
        }
    }
    .instrument(span)
    .await
}

/// The loader cannot log before the subscriber exists, so it hands back the
/// markers it could not resolve.
fn warn_unresolved_secrets(config: &AppConfig) -> usize {
    for path in &config.unresolved_secrets {
        warn!(path = %path, "No environment variable found for secret_from_env marker");
    }
    config.unresolved_secrets.len()
}

async fn run<S: TrackingStore>(config: Arc<AppConfig>, store: Arc<S>) -> Result<(), GeotrackError> {
    let services = WorkerServices::new(config, store)?;
    let handles = services.spawn_jobs();
    info!(jobs = handles.len(), "🚀 GeoTrack worker running");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Could not listen for shutdown signal"),
    }

    for handle in &handles {
        handle.abort();
    }
    info!("GeoTrack worker stopped");
    Ok(())
}
