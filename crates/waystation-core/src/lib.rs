//! Waystation Core - client for a Consul-style service registry.
//!
//! A running service instance uses this crate to announce itself to the
//! registry, withdraw itself again, and resolve the healthy instances of its
//! peers. The client keeps no state between calls beyond its transport
//! configuration; the registry is the sole source of truth.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use waystation_core::RegistryClient;
//!
//! #[tokio::main]
//! async fn main() -> waystation_core::Result<()> {
//!     let client = RegistryClient::new("127.0.0.1", 8500)?;
//!
//!     let meta = HashMap::from([("version".to_string(), "3".to_string())]);
//!     client
//!         .register_http("orders", "orders-1", "/health", "10.0.0.5", 8080, meta)
//!         .await?;
//!
//!     for instance in client.discover_services("orders").await? {
//!         println!("{} at {}", instance.id, instance.socket_addr_string());
//!     }
//!
//!     client.deregister("orders-1").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod transport;

mod api;

// Re-export commonly used types
pub use api::{DiscoveryQuery, Heartbeat, RegistryClientBuilder};
pub use config::{ClientConfig, RegistryDefaults};
pub use error::{RegistryError, Result};
pub use models::{
    generate_instance_id, DiscoveredInstance, HealthCheck, HealthStatus, Registration, Weights,
};
pub use retry::RetryConfig;
pub use transport::{HttpTransport, Method, RegistryRequest, RegistryResponse, Transport};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

/// Handle to one registry endpoint.
///
/// Cloning is cheap: clones share the transport and configuration, so a
/// single client can be handed to every task that needs to register or
/// discover. Independent clients may point at different registries in the
/// same process.
#[derive(Clone)]
pub struct RegistryClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
    cancel_token: CancellationToken,
}

impl RegistryClient {
    /// Create a client for the registry agent at `host:port` with defaults.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::builder(host, port).build()
    }

    /// Start configuring a client for the registry agent at `host:port`.
    pub fn builder(host: impl Into<String>, port: u16) -> RegistryClientBuilder {
        RegistryClientBuilder::new(host, port)
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config: Arc::new(config),
            cancel_token: CancellationToken::new(),
        })
    }

    /// A clone of this client whose calls abort when `token` is cancelled.
    pub fn with_cancel_token(&self, token: CancellationToken) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            cancel_token: token,
        }
    }

    /// Token observed by every call made through this client.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Transport configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}
