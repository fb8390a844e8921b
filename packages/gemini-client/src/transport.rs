//! Outbound HTTP transport.
//!
//! The [`Transport`] trait is the seam between the lifecycle manager and the
//! network. [`HttpTransport`] is the reqwest implementation; tests swap in
//! [`ScriptedTransport`](crate::testing::ScriptedTransport).
//!
//! Transport failures (timeout, connection) come back as [`TransportError`].
//! Non-2xx responses are NOT errors at this layer; they are returned as a
//! [`TransportResponse`] and mapped by the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::secret::ApiKey;

/// Transport-level failures, distinct from HTTP error statuses.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The exchange did not finish within the per-call timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection refused, reset, DNS failure, body read failure
    #[error("connection error: {0}")]
    Connection(String),

    /// The HTTP client or its headers could not be built
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

/// One outbound call, relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Look up a query parameter by name.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw provider response: status plus the unparsed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

const API_KEY_HEADER: &str = "x-goog-api-key";

/// reqwest-backed transport.
///
/// Idle connections are not pooled: every call opens its own connection and
/// releases it once the body is read, so nothing is held while a wait loop
/// sleeps between polls.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        api_key: &ApiKey,
        timeout: Duration,
    ) -> std::result::Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: build_headers(api_key)?,
        })
    }
}

/// Build the default headers. The key value is marked sensitive so it is
/// never printed by reqwest's debug output.
fn build_headers(api_key: &ApiKey) -> std::result::Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut value = HeaderValue::from_str(api_key.expose())
        .map_err(|_| TransportError::Build("API key is not a valid header value".into()))?;
    value.set_sensitive(true);
    headers.insert(API_KEY_HEADER, value);

    Ok(headers)
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Delete => self.client.delete(&url),
        }
        .headers(self.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let start = std::time::Instant::now();
        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        debug!(
            method = ?request.method,
            path = %request.path,
            status,
            duration_ms = start.elapsed().as_millis(),
            "Gemini API call"
        );

        Ok(TransportResponse { status, body })
    }
}
