//! HTTP client for the quote server API.
use std::time::Duration;

use serde::de::DeserializeOwned;
use ticker_common::net::{DATA_PATH, REFRESH_SETTINGS_PATH, endpoint};
use ticker_common::{DataResponse, ErrorResponse, RefreshCadence, RefreshSettings, Symbol};

use crate::error::{ClientError, Result};

/// Default server base URL.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
/// Per-request timeout towards the server.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around `reqwest::Client` bound to one server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/data`, optionally for an explicit symbol list.
    pub async fn fetch_data(&self, symbols: Option<&[Symbol]>) -> Result<DataResponse> {
        let mut request = self.http.get(endpoint(&self.base_url, DATA_PATH));
        if let Some(symbols) = symbols.filter(|s| !s.is_empty()) {
            let joined = symbols
                .iter()
                .map(Symbol::as_str)
                .collect::<Vec<_>>()
                .join(",");
            request = request.query(&[("symbols", joined)]);
        }
        let response = request.send().await?;
        decode(response).await
    }

    /// `POST /api/settings/refresh` with `{ "minutes": ... }`.
    pub async fn set_refresh_cadence(&self, cadence: RefreshCadence) -> Result<RefreshSettings> {
        let response = self
            .http
            .post(endpoint(&self.base_url, REFRESH_SETTINGS_PATH))
            .json(&serde_json::json!({ "minutes": cadence.as_minutes() }))
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        return Err(ClientError::Server {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| ClientError::Quote(e.into()))
}
