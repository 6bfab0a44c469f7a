//! HTTP client for gateway probing
//!
//! Thin wrapper over reqwest that owns the per-call timeout and turns
//! reqwest failures into a small transport error taxonomy.

use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// HTTP client errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Connection refused to {0}")]
    ConnectionRefused(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl HttpError {
    /// Map a reqwest failure onto the transport taxonomy
    pub fn classify(err: &reqwest::Error, url: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            HttpError::Timeout(timeout_secs)
        } else if err.is_connect() {
            HttpError::ConnectionRefused(url.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(url.to_string())
        } else {
            HttpError::RequestFailed(err.to_string())
        }
    }
}

/// HTTP client for probing
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: Option<String>,
    timeout_secs: u64,
}

impl HttpClient {
    /// Create client with custom timeout and TLS verification policy
    pub fn build(timeout_secs: u64, accept_invalid_certs: bool) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| HttpError::RequestFailed(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: None,
            timeout_secs,
        })
    }

    /// Set base URL for requests
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Build full URL
    pub fn build_url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => {
                if path.starts_with("http://") || path.starts_with("https://") {
                    path.to_string()
                } else {
                    format!("{}{}", base.trim_end_matches('/'), path)
                }
            }
            None => path.to_string(),
        }
    }

    /// Send HTTP request
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = self.build_url(&request.url);
        debug!("Sending {} request to {}", request.method, url);

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HttpError::RequestFailed(format!("Invalid HTTP method {}", request.method)))?;

        let mut req_builder = self.client.request(method, &url);

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            req_builder = req_builder.body(body.clone());
        }

        let start = Instant::now();

        let response = req_builder
            .send()
            .await
            .map_err(|e| HttpError::classify(&e, &url, self.timeout_secs))?;

        let status = response.status();

        // The timeout also covers reading the body
        let body = response
            .text()
            .await
            .map_err(|e| HttpError::classify(&e, &url, self.timeout_secs))?;

        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Response: {} {} in {}ms",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration_ms
        );

        Ok(HttpResponse {
            status_code: status.as_u16(),
            body,
            duration_ms,
        })
    }

    /// POST a JSON body with a bearer credential
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        bearer: &str,
        payload: &T,
    ) -> Result<HttpResponse, HttpError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| HttpError::RequestFailed(format!("Failed to encode body: {e}")))?;

        self.send(HttpRequest::post(url).bearer(bearer).json_body(body))
            .await
    }
}

/// HTTP request builder
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), format!("Bearer {token}"))
    }

    pub fn json_body(self, body: impl Into<String>) -> Self {
        let mut req = self.header(CONTENT_TYPE.as_str(), "application/json");
        req.body = Some(body.into());
        req
    }
}

/// HTTP response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// Decode the body as JSON
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}
