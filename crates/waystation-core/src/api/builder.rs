//! Builder for configuring a RegistryClient.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::retry::RetryConfig;
use crate::transport::{HttpTransport, Transport};
use crate::RegistryClient;

/// Builder for configuring a [`RegistryClient`].
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use waystation_core::{RegistryClient, RetryConfig};
///
/// let client = RegistryClient::builder("consul.internal", 8500)
///     .request_timeout(Duration::from_secs(3))
///     .token("s3cr3t")
///     .retry(RetryConfig::new().with_max_attempts(3))
///     .build()?;
/// ```
pub struct RegistryClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    cancel_token: Option<CancellationToken>,
}

impl RegistryClientBuilder {
    /// Create a new builder for the registry agent at `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            config: ClientConfig::new(host, port),
            transport: None,
            cancel_token: None,
        }
    }

    /// Talk to the agent over HTTPS.
    ///
    /// Default: `false`
    pub fn https(mut self, enable: bool) -> Self {
        self.config.scheme = if enable { "https" } else { "http" }.to_string();
        self
    }

    /// Upper bound for each request.
    ///
    /// Default: 10 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// ACL token sent with every request.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Datacenter to query during discovery.
    pub fn datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.config.datacenter = Some(datacenter.into());
        self
    }

    /// Retry policy for transient failures.
    ///
    /// Default: a single attempt
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Use a custom transport instead of reqwest.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Token that aborts every call made through the built client.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RegistryClient> {
        self.config.validate()?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };

        Ok(RegistryClient {
            transport,
            config: Arc::new(self.config),
            cancel_token: self.cancel_token.unwrap_or_default(),
        })
    }
}
