//! Centralized configuration for the registry client.
//!
//! `RegistryDefaults` holds the constants applied when a caller does not say
//! otherwise; `ClientConfig` is the per-client transport configuration shared
//! by every operation issued through one `RegistryClient`.

use crate::models::host_port;
use crate::retry::RetryConfig;
use crate::{RegistryError, Result};
use std::time::Duration;
use url::Url;

/// Default values for registrations and requests.
pub struct RegistryDefaults;

impl RegistryDefaults {
    pub const PORT: u16 = 8500;
    pub const SCHEME: &'static str = "http";
    pub const USER_AGENT: &'static str = concat!("waystation/", env!("CARGO_PKG_VERSION"));

    // Health check policy
    pub const CHECK_INTERVAL: Duration = Duration::from_secs(15);
    pub const DEREGISTER_CRITICAL_AFTER: Duration = Duration::from_secs(30);

    // Routing weights
    pub const WEIGHT_PASSING: u32 = 10;
    pub const WEIGHT_WARNING: u32 = 1;

    // Requests
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_RETRY_ATTEMPTS: u32 = 5;
    pub const TOKEN_HEADER: &'static str = "X-Consul-Token";
}

/// Transport configuration for one registry endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `http` or `https`.
    pub scheme: String,
    /// Registry agent host.
    pub host: String,
    /// Registry agent port.
    pub port: u16,
    /// Upper bound for a single request, connect included.
    pub request_timeout: Duration,
    /// ACL token sent with every request.
    pub token: Option<String>,
    /// Datacenter used for discovery queries.
    pub datacenter: Option<String>,
    /// Retry policy. One attempt by default.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Create a configuration for `host:port` with default settings.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: RegistryDefaults::SCHEME.to_string(),
            host: host.into(),
            port,
            request_timeout: RegistryDefaults::REQUEST_TIMEOUT,
            token: None,
            datacenter: None,
            retry: RetryConfig::default(),
        }
    }

    /// Base URL of the registry agent, e.g. `http://127.0.0.1:8500/`.
    ///
    /// The host must be a bare host name or IP literal; anything that would
    /// parse into a path, query, fragment or credentials is rejected.
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("{}://{}/", self.scheme, host_port(&self.host, self.port));
        let url = Url::parse(&raw).map_err(|e| RegistryError::Config {
            message: format!("Invalid registry address {}: {}", raw, e),
        })?;

        let bare = url.port_or_known_default() == Some(self.port)
            && url.path() == "/"
            && url.query().is_none()
            && url.fragment().is_none()
            && url.username().is_empty()
            && url.password().is_none();
        if !bare {
            return Err(RegistryError::Config {
                message: format!("registry host {:?} is not a bare host name", self.host),
            });
        }
        Ok(url)
    }

    /// Check that the configuration can be used to build a client.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RegistryError::Config {
                message: "registry host must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(RegistryError::Config {
                message: "registry port must not be zero".to_string(),
            });
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(RegistryError::Config {
                message: format!("unsupported scheme: {}", self.scheme),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(RegistryError::Config {
                message: "request timeout must be greater than zero".to_string(),
            });
        }
        if self.retry.max_attempts == 0
            || self.retry.max_attempts > RegistryDefaults::MAX_RETRY_ATTEMPTS
        {
            return Err(RegistryError::Config {
                message: format!(
                    "retry attempts must be between 1 and {}",
                    RegistryDefaults::MAX_RETRY_ATTEMPTS
                ),
            });
        }
        self.base_url().map(|_| ())
    }
}
