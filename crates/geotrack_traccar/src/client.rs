// --- File: crates/geotrack_traccar/src/client.rs ---
use chrono::{DateTime, SecondsFormat, Utc};
use geotrack_common::http::is_json_response;
use geotrack_common::models::ProviderPosition;
use geotrack_common::{BoxFuture, PositionSource, PositionWindow, ProviderError};
use geotrack_config::TraccarConfig;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::TraccarError;
use crate::models::{CreateDeviceRequest, TraccarDevice, TraccarPosition};

/// Traccar REST client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TraccarClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

/// Traccar expects ISO-8601 with a `Z` suffix.
pub fn format_traccar_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl TraccarClient {
    pub fn new(http: Client, config: &TraccarConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the request with basic auth.
    ///
    /// Non-2xx responses become [`TraccarError::Api`]. A success without a
    /// JSON content type yields `None`; Traccar answers some writes with an
    /// empty body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, TraccarError> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Traccar request failed");
            return Err(TraccarError::Api {
                status: status.as_u16(),
                body,
            });
        }

        if !is_json_response(&response) {
            debug!(status = status.as_u16(), "Traccar returned a non-JSON body");
            return Ok(None);
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| TraccarError::Decode(e.to_string()))
    }

    /// Registers a device in Traccar. `unique_id` is the tracker's identifier
    /// (usually the IMEI).
    pub async fn create_device(
        &self,
        name: &str,
        unique_id: &str,
    ) -> Result<Option<TraccarDevice>, TraccarError> {
        let url = format!("{}/devices", self.base_url);
        debug!(name, unique_id, "Creating Traccar device");
        self.send(
            self.http
                .post(url)
                .json(&CreateDeviceRequest { name, unique_id }),
        )
        .await
    }

    /// Positions in `[from, to]`, for one device or for all devices the
    /// account can see.
    pub async fn get_positions(
        &self,
        device_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TraccarPosition>, TraccarError> {
        let url = format!("{}/positions", self.base_url);
        let mut query: Vec<(&str, String)> = Vec::with_capacity(3);
        if let Some(device_id) = device_id {
            query.push(("deviceId", device_id.to_string()));
        }
        query.push(("from", format_traccar_time(from)));
        query.push(("to", format_traccar_time(to)));

        let positions: Option<Vec<TraccarPosition>> =
            self.send(self.http.get(url).query(&query)).await?;
        let positions = positions.unwrap_or_default();
        debug!(count = positions.len(), ?device_id, "Fetched Traccar positions");
        Ok(positions)
    }
}

impl PositionSource for TraccarClient {
    type Request = PositionWindow;

    fn fetch_positions<'a>(
        &'a self,
        request: &'a PositionWindow,
    ) -> BoxFuture<'a, Vec<ProviderPosition>, ProviderError> {
        Box::pin(async move {
            let positions = self
                .get_positions(request.device_id, request.from, request.to)
                .await?;
            Ok::<_, ProviderError>(positions.iter().map(ProviderPosition::from).collect())
        })
    }
}
