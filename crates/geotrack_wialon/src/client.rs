// --- File: crates/geotrack_wialon/src/client.rs ---
use geotrack_common::models::ProviderPosition;
use geotrack_common::{BoxFuture, PositionSource, ProviderError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::error::WialonError;
use crate::models::{SearchItemsResponse, TokenLoginResponse, WialonUnit};

const AJAX_PATH: &str = "/wialon/ajax.html";

/// Unit list flags: base information (1) plus last message and position (1024).
pub const UNIT_FLAGS_WITH_POSITION: u32 = 1025;

/// Resolves the RPC endpoint for a host. URLs already pointing at
/// `/wialon/ajax.html` are used unchanged.
pub fn ajax_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(AJAX_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, AJAX_PATH)
    }
}

/// One Wialon account to poll.
#[derive(Clone)]
pub struct WialonQuery {
    pub base_url: String,
    pub token: String,
}

impl fmt::Debug for WialonQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WialonQuery")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WialonClient {
    http: Client,
}

impl WialonClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Performs one RPC call.
    pub async fn call<T: DeserializeOwned>(
        &self,
        base_url: &str,
        svc: &str,
        params: &Value,
        sid: Option<&str>,
    ) -> Result<T, WialonError> {
        let url = ajax_url(base_url);
        let mut query: Vec<(&str, String)> = vec![("svc", svc.to_string()), ("params", params.to_string())];
        if let Some(sid) = sid {
            query.push(("sid", sid.to_string()));
        }

        debug!(svc, "Calling Wialon");
        let response = self.http.get(&url).query(&query).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(svc, status = status.as_u16(), "Wialon request failed");
            return Err(WialonError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value =
            serde_json::from_str(&body).map_err(|e| WialonError::Decode(e.to_string()))?;
        if let Some(code) = error_code(&json) {
            warn!(svc, code, "Wialon returned an API error");
            return Err(WialonError::Api { code });
        }

        serde_json::from_value(json).map_err(|e| WialonError::Decode(e.to_string()))
    }

    /// Exchanges a long-lived token for a session id (`eid`).
    pub async fn token_login(&self, base_url: &str, token: &str) -> Result<String, WialonError> {
        let response: TokenLoginResponse = self
            .call(base_url, "token/login", &json!({ "token": token }), None)
            .await?;
        Ok(response.eid)
    }

    /// Lists every unit of the account with its last known position.
    pub async fn search_units_with_last_position(
        &self,
        base_url: &str,
        sid: &str,
    ) -> Result<Vec<WialonUnit>, WialonError> {
        let params = json!({
            "spec": {
                "itemsType": "avl_unit",
                "propName": "sys_name",
                "propValueMask": "*",
                "sortType": "sys_name"
            },
            "force": 1,
            "flags": UNIT_FLAGS_WITH_POSITION,
            "from": 0,
            "to": 0
        });
        let response: SearchItemsResponse = self
            .call(base_url, "core/search_items", &params, Some(sid))
            .await?;
        Ok(response.items)
    }
}

/// A non-zero `error` member marks a failed call, whatever the HTTP status.
fn error_code(json: &Value) -> Option<i64> {
    match json.get("error")? {
        Value::Number(n) => n.as_i64().filter(|code| *code != 0),
        Value::Null | Value::Bool(false) => None,
        _ => Some(-1),
    }
}

impl PositionSource for WialonClient {
    type Request = WialonQuery;

    /// Opens a fresh session and returns the last position of every unit that has one.
    fn fetch_positions<'a>(
        &'a self,
        request: &'a WialonQuery,
    ) -> BoxFuture<'a, Vec<ProviderPosition>, ProviderError> {
        Box::pin(async move {
            let sid = self.token_login(&request.base_url, &request.token).await?;
            let units = self
                .search_units_with_last_position(&request.base_url, &sid)
                .await?;
            Ok::<_, ProviderError>(
                units
                    .iter()
                    .filter_map(WialonUnit::to_provider_position)
                    .collect(),
            )
        })
    }
}
