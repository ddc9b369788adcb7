//! Registration and deregistration methods on RegistryClient.

use std::collections::HashMap;

use tracing::{info, warn};

use super::segment;
use crate::error::Result;
use crate::models::{require_path_segment, Registration};
use crate::transport::RegistryRequest;
use crate::RegistryClient;

const REGISTER_PATH: &str = "/v1/agent/service/register";

impl RegistryClient {
    // ========================================
    // Registration
    // ========================================

    /// Register an instance, replacing any descriptor already held under its id.
    ///
    /// `Ok(())` means the registry accepted the descriptor. Every failure is
    /// returned (and logged), never raised.
    pub async fn register(&self, registration: &Registration) -> Result<()> {
        let result = self.submit_registration(registration).await;
        match &result {
            Ok(()) => info!(
                "Registered {} ({}) at {}:{}",
                registration.id, registration.service_name, registration.address, registration.port
            ),
            Err(e) => warn!("Failed to register {}: {}", registration.id, e),
        }
        result
    }

    /// Register an HTTP-probed instance with the default check policy.
    ///
    /// The probe URL is `http://{address}:{port}{health_check_path}`.
    pub async fn register_http(
        &self,
        service_name: &str,
        instance_id: &str,
        health_check_path: &str,
        address: &str,
        port: u16,
        meta: HashMap<String, String>,
    ) -> Result<()> {
        let registration =
            Registration::http(service_name, instance_id, health_check_path, address, port)
                .with_meta(meta);
        self.register(&registration).await
    }

    async fn submit_registration(&self, registration: &Registration) -> Result<()> {
        registration.validate()?;
        let request = RegistryRequest::put(REGISTER_PATH).with_json(&registration.to_definition())?;
        self.execute(request).await.map(|_| ())
    }

    // ========================================
    // Deregistration
    // ========================================

    /// Remove an instance from the registry.
    ///
    /// The registry may answer with a non-success status for an unknown id;
    /// that comes back as [`RegistryError::Status`] for the caller to judge.
    pub async fn deregister(&self, instance_id: &str) -> Result<()> {
        let result = self.submit_deregistration(instance_id).await;
        match &result {
            Ok(()) => info!("Deregistered {}", instance_id),
            Err(e) => warn!("Failed to deregister {}: {}", instance_id, e),
        }
        result
    }

    async fn submit_deregistration(&self, instance_id: &str) -> Result<()> {
        require_path_segment("instance_id", instance_id)?;
        let path = format!("/v1/agent/service/deregister/{}", segment(instance_id));
        self.execute(RegistryRequest::put(path)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{Registration, ServiceDefinition};
    use crate::transport::{Method, RegistryRequest, RegistryResponse, Transport};
    use crate::{ClientConfig, RegistryClient, RegistryError, Result, RetryConfig};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Records every request and answers with a fixed status.
    struct RecordingTransport {
        status: u16,
        requests: Mutex<Vec<RegistryRequest>>,
    }

    impl RecordingTransport {
        fn new(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<RegistryRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: RegistryRequest) -> Result<RegistryResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(RegistryResponse::new(self.status, "boom"))
        }
    }

    fn client(transport: Arc<RecordingTransport>) -> RegistryClient {
        RegistryClient::with_transport(ClientConfig::new("127.0.0.1", 8500), transport).unwrap()
    }

    #[tokio::test]
    async fn test_register_sends_service_definition() {
        let transport = RecordingTransport::new(200);
        let client = client(transport.clone());

        let meta = HashMap::from([("version".to_string(), "3".to_string())]);
        client
            .register_http("orders", "orders-1", "/health", "10.0.0.5", 8080, meta)
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[0].path, "/v1/agent/service/register");

        let body = requests[0].body.as_ref().unwrap();
        let definition: ServiceDefinition = serde_json::from_slice(body).unwrap();
        let decoded = Registration::try_from(definition).unwrap();
        assert_eq!(decoded.id, "orders-1");
        assert_eq!(decoded.service_name, "orders");
        assert_eq!(decoded.address, "10.0.0.5");
        assert_eq!(decoded.port, 8080);
        assert_eq!(decoded.meta.get("version").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_register_failure_status_is_preserved() {
        let transport = RecordingTransport::new(500);
        let client = client(transport);

        let err = client
            .register(&Registration::http("orders", "orders-1", "/health", "10.0.0.5", 8080))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(500));
        match err {
            RegistryError::Status { endpoint, body, .. } => {
                assert_eq!(endpoint, "/v1/agent/service/register");
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_registration_never_hits_the_wire() {
        let transport = RecordingTransport::new(200);
        let client = client(transport.clone());

        let result = client
            .register(&Registration::http("", "orders-1", "/health", "10.0.0.5", 8080))
            .await;

        assert!(matches!(result, Err(RegistryError::Validation { .. })));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_deregister_encodes_instance_id() {
        let transport = RecordingTransport::new(200);
        let client = client(transport.clone());

        client.deregister("orders 1/a").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/v1/agent/service/deregister/orders%201%2Fa");
        assert!(requests[0].body.is_none());
    }

    #[tokio::test]
    async fn test_deregister_rejects_dot_segment_ids() {
        let transport = RecordingTransport::new(200);
        let client = client(transport.clone());

        for id in [".", ".."] {
            let result = client.deregister(id).await;
            assert!(matches!(result, Err(RegistryError::Validation { .. })));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_deregister_unknown_id_reports_status() {
        let transport = RecordingTransport::new(404);
        let client = client(transport);

        let err = client.deregister("ghost").await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_register_retries_transient_status_when_enabled() {
        let transport = RecordingTransport::new(503);
        let mut config = ClientConfig::new("127.0.0.1", 8500);
        config.retry = RetryConfig::new()
            .with_max_attempts(3)
            .with_base_delay(std::time::Duration::from_millis(1))
            .with_jitter(false);
        let client = RegistryClient::with_transport(config, transport.clone()).unwrap();

        let result = client
            .register(&Registration::http("orders", "orders-1", "/health", "10.0.0.5", 8080))
            .await;

        assert!(result.is_err());
        assert_eq!(transport.requests().len(), 3);
    }
}
