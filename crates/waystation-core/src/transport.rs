//! Transport seam between the registry client and the wire.
//!
//! [`Transport`] is the only thing the client needs from the network: send a
//! request, get back a status and a body. [`HttpTransport`] does that over
//! reqwest; tests plug in their own implementations.

use crate::config::{ClientConfig, RegistryDefaults};
use crate::{RegistryError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP methods the registry protocol uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// A request against the registry agent, relative to its base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryRequest {
    pub method: Method,
    /// Path and query, starting with `/`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Bytes>,
}

impl RegistryRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: None,
        }
    }

    /// Attach a JSON-encoded body.
    pub fn with_json<T: serde::Serialize>(mut self, value: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(value).map_err(|e| RegistryError::Encode {
            message: format!("{} {}: {}", self.method, self.endpoint(), e),
            source: Some(e),
        })?;
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    /// Path without the query string, for diagnostics.
    pub fn endpoint(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

/// What came back from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RegistryResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The registry protocol signals success with exactly 200.
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

/// Sends registry requests.
///
/// Implementations must be safe to call concurrently; the client shares one
/// transport between all clones.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse>;
}

/// reqwest-backed transport for one registry endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport from a client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .user_agent(RegistryDefaults::USER_AGENT)
            .build()
            .map_err(|e| RegistryError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            token: config.token.clone(),
            timeout: config.request_timeout,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn map_error(&self, request: &RegistryRequest, err: reqwest::Error) -> RegistryError {
        if err.is_timeout() {
            return RegistryError::Timeout(self.timeout);
        }
        RegistryError::Transport {
            message: format!("{} {} failed: {}", request.method, request.endpoint(), err),
            cause: std::error::Error::source(&err).map(|s| s.to_string()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse> {
        let url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| RegistryError::Config {
                message: format!("Invalid request path {}: {}", request.path, e),
            })?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Put => self.client.put(url),
        };
        if let Some(token) = &self.token {
            builder = builder.header(RegistryDefaults::TOKEN_HEADER, token.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json;charset=UTF-8")
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_error(&request, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_error(&request, e))?;

        debug!("{} {} -> {}", request.method, request.endpoint(), status);
        Ok(RegistryResponse { status, body })
    }
}
