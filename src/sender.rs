use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, RgbwwError};
use crate::protocol::Endpoint;

const USER_AGENT: &str = concat!("rgbww-controller/", env!("CARGO_PKG_VERSION"));

/// HTTP access to a single controller
#[derive(Debug, Clone)]
pub struct CommandSender {
    host: String,
    base_url: String,
    http: reqwest::Client,
}

impl CommandSender {
    /// Build a sender for `http://{host}:{port}/` with a per-request timeout
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Result<Self> {
        let host = host.into();
        let http = build_client(timeout).map_err(|e| RgbwwError::unavailable(&host, e))?;
        Ok(Self::with_client(host, port, http))
    }

    /// Build a sender around an existing client
    pub fn with_client(host: impl Into<String>, port: u16, http: reqwest::Client) -> Self {
        let host = host.into();
        let base_url = if port == 80 {
            format!("http://{}", host)
        } else {
            format!("http://{}:{}", host, port)
        };
        Self {
            host,
            base_url,
            http,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// `GET` an endpoint and decode its JSON body
    pub async fn get(&self, endpoint: Endpoint) -> Result<Value> {
        let url = self.url(endpoint);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RgbwwError::unavailable(&self.host, e))?;

        response
            .json()
            .await
            .map_err(|e| RgbwwError::unavailable(&self.host, e))
    }

    /// `POST` a JSON body to an endpoint
    pub async fn post<T: Serialize + ?Sized>(&self, endpoint: Endpoint, payload: &T) -> Result<()> {
        let url = self.url(endpoint);
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("POST {}: {}", url, serde_json::to_string(payload)?);
        }

        self.http
            .post(&url)
            .json(payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RgbwwError::unavailable(&self.host, e))?;

        Ok(())
    }
}

/// HTTP client with the controller's default headers and timeout
pub(crate) fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()
}
