// --- File: crates/geotrack_tracking/src/jobs/wialon_poller.rs ---
//! Polls every active Wialon PULL integration for the last position of its units.
//!
//! Integrations are isolated from each other: a missing token, a token that
//! does not decrypt, or a failed login only skips that integration. Storage
//! errors abort the whole tick.

use std::collections::HashMap;
use std::sync::Arc;

use geotrack_common::models::{
    ProviderPosition, ProviderType, TrackingIntegration, SOURCE_WIALON_API,
};
use geotrack_common::{PositionSource, SecretCipher};
use geotrack_config::{TrackingConfig, WialonConfig};
use geotrack_db::TrackingStore;
use geotrack_wialon::client::WialonQuery;
use tracing::{debug, error, info, warn};

use crate::error::TrackingError;
use crate::events::EventPublisher;
use crate::jobs::apply::apply_device_fix;
use crate::scheduler::BackgroundJob;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    pub integrations: usize,
    pub skipped_integrations: usize,
    pub applied: usize,
    pub history_written: usize,
    pub health_transitions: usize,
}

pub struct WialonPollerJob<S, P> {
    store: Arc<S>,
    source: Arc<P>,
    publisher: Arc<dyn EventPublisher>,
    cipher: Arc<dyn SecretCipher>,
    default_base_url: String,
    min_history_interval_seconds: i64,
}

impl<S, P> WialonPollerJob<S, P>
where
    S: TrackingStore,
    P: PositionSource<Request = WialonQuery>,
{
    pub fn new(
        store: Arc<S>,
        source: Arc<P>,
        publisher: Arc<dyn EventPublisher>,
        cipher: Arc<dyn SecretCipher>,
        wialon: &WialonConfig,
        tracking: &TrackingConfig,
    ) -> Self {
        Self {
            store,
            source,
            publisher,
            cipher,
            default_base_url: wialon.default_base_url.clone(),
            min_history_interval_seconds: tracking.min_history_interval_seconds,
        }
    }

    pub async fn poll_once(&self) -> Result<PollReport, TrackingError> {
        let integrations = self
            .store
            .find_active_pull_integrations(ProviderType::WialonApi)
            .await?;

        let mut report = PollReport {
            integrations: integrations.len(),
            ..Default::default()
        };

        for integration in &integrations {
            if !self.poll_integration(integration, &mut report).await? {
                report.skipped_integrations += 1;
            }
        }

        info!(
            integrations = report.integrations,
            skipped = report.skipped_integrations,
            applied = report.applied,
            health_transitions = report.health_transitions,
            "Wialon poll tick"
        );
        Ok(report)
    }

    /// Builds the login request for an integration, or `None` if it cannot be polled.
    fn query_for(&self, integration: &TrackingIntegration) -> Option<WialonQuery> {
        let config = integration.wialon.as_ref();
        let Some(token_enc) = config.and_then(|c| c.token_enc.as_ref()) else {
            debug!(integration_id = %integration.id, "Wialon integration has no token");
            return None;
        };

        let token = match self.cipher.decrypt(token_enc) {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    integration_id = %integration.id,
                    tenant_id = %integration.tenant_id,
                    error = %e,
                    "Could not decrypt Wialon token"
                );
                return None;
            }
        };

        let base_url = config
            .and_then(|c| c.base_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(self.default_base_url.as_str())
            .to_string();

        Some(WialonQuery { base_url, token })
    }

    /// Returns `false` if the integration was skipped.
    async fn poll_integration(
        &self,
        integration: &TrackingIntegration,
        report: &mut PollReport,
    ) -> Result<bool, TrackingError> {
        let Some(query) = self.query_for(integration) else {
            return Ok(false);
        };

        let positions = match self.source.fetch_positions(&query).await {
            Ok(positions) => positions,
            Err(e) => {
                error!(
                    integration_id = %integration.id,
                    tenant_id = %integration.tenant_id,
                    error = %e,
                    "Wialon poll failed"
                );
                return Ok(false);
            }
        };

        let by_unit: HashMap<i64, ProviderPosition> = positions
            .into_iter()
            .map(|p| (p.provider_device_id, p))
            .collect();

        let devices = self.store.find_by_integration(&integration.id).await?;
        for mut device in devices {
            let Ok(unit_id) = device.external_device_id.trim().parse::<i64>() else {
                debug!(device_id = %device.id, "External id is not a Wialon unit id");
                continue;
            };
            let Some(position) = by_unit.get(&unit_id) else {
                continue;
            };

            let mut fix = position.to_fix(SOURCE_WIALON_API);
            fix.accuracy = None;

            let applied = apply_device_fix(
                self.store.as_ref(),
                self.publisher.as_ref(),
                &mut device,
                &fix,
                self.min_history_interval_seconds,
            )
            .await?;

            report.applied += 1;
            if applied.written.is_some_and(|w| w.wrote_history) {
                report.history_written += 1;
            }
            if applied.health_transition {
                report.health_transitions += 1;
            }
        }

        Ok(true)
    }
}

impl<S, P> BackgroundJob for WialonPollerJob<S, P>
where
    S: TrackingStore,
    P: PositionSource<Request = WialonQuery>,
{
    type Report = PollReport;

    fn name(&self) -> &'static str {
        "wialon_poller"
    }

    async fn tick(&self) -> Result<PollReport, TrackingError> {
        self.poll_once().await
    }
}
