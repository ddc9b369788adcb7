//! Instances as returned by health-aware discovery queries.

use super::health::HealthStatus;
use super::registration::{host_port, Weights};
use crate::{RegistryError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Read-only view of one registered instance and its current health verdict.
///
/// Two queries issued moments apart may disagree; the registry is only
/// eventually consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredInstance {
    pub id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: HashMap<String, String>,
    pub weights: Weights,
    /// Whether the registry lets its own tag edits override the instance's.
    pub enable_tag_override: bool,
    pub status: HealthStatus,
    /// Registry node the instance is attached to.
    pub node: Option<String>,
}

impl DiscoveredInstance {
    /// `address:port`, bracketing IPv6 literals.
    pub fn socket_addr_string(&self) -> String {
        host_port(&self.address, self.port)
    }

    pub fn is_passing(&self) -> bool {
        self.status == HealthStatus::Passing
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    #[serde(default)]
    node: Option<NodeEntry>,
    service: ServiceEntry,
    #[serde(default)]
    checks: Option<Vec<CheckEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeEntry {
    #[serde(default)]
    node: Option<String>,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    address: Option<String>,
    port: u16,
    #[serde(default)]
    meta: Option<HashMap<String, String>>,
    #[serde(default)]
    weights: Option<Weights>,
    #[serde(default)]
    enable_tag_override: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CheckEntry {
    #[serde(default)]
    status: String,
}

impl From<HealthEntry> for DiscoveredInstance {
    fn from(entry: HealthEntry) -> Self {
        let HealthEntry {
            node,
            service,
            checks,
        } = entry;
        let (node_name, node_address) = match node {
            Some(node) => (node.node, node.address),
            None => (None, None),
        };

        // An empty service address means "use the node's address".
        let address = service
            .address
            .filter(|a| !a.is_empty())
            .or(node_address)
            .unwrap_or_default();

        let status = HealthStatus::aggregate(
            checks
                .unwrap_or_default()
                .iter()
                .map(|c| HealthStatus::parse_lossy(&c.status)),
        );

        Self {
            id: service.id,
            service_name: service.service.or(service.name).unwrap_or_default(),
            address,
            port: service.port,
            tags: service.tags.unwrap_or_default(),
            meta: service.meta.unwrap_or_default(),
            weights: service.weights.unwrap_or_default(),
            enable_tag_override: service.enable_tag_override,
            status,
            node: node_name,
        }
    }
}

/// Decode the body of `GET /v1/health/service/{name}`.
///
/// `[]` decodes to an empty list. Anything that is not a JSON array of health
/// entries is a [`RegistryError::Decode`].
pub fn decode_health_entries(body: &[u8]) -> Result<Vec<DiscoveredInstance>> {
    let entries: Vec<HealthEntry> =
        serde_json::from_slice(body).map_err(|e| RegistryError::Decode {
            message: format!("health response is not a list of service entries: {}", e),
            source: Some(e),
        })?;
    Ok(entries.into_iter().map(DiscoveredInstance::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS_RESPONSE: &str = r#"[
        {
            "Node": {"Node": "node-a", "Address": "10.0.0.1", "Datacenter": "dc1"},
            "Service": {
                "ID": "orders-1",
                "Service": "orders",
                "Tags": ["v3"],
                "Address": "10.0.0.5",
                "Port": 8080,
                "Meta": {"version": "3"},
                "Weights": {"Passing": 10, "Warning": 1},
                "EnableTagOverride": true
            },
            "Checks": [
                {"CheckID": "serfHealth", "Status": "passing"},
                {"CheckID": "service:orders-1", "Status": "warning"}
            ]
        },
        {
            "Node": {"Node": "node-b", "Address": "10.0.0.2"},
            "Service": {"ID": "orders-2", "Service": "orders", "Tags": null, "Address": "", "Port": 8081, "Meta": null},
            "Checks": []
        }
    ]"#;

    #[test]
    fn test_decode_consul_shape() {
        let instances = decode_health_entries(ORDERS_RESPONSE.as_bytes()).unwrap();
        assert_eq!(instances.len(), 2);

        let first = &instances[0];
        assert_eq!(first.id, "orders-1");
        assert_eq!(first.service_name, "orders");
        assert_eq!(first.address, "10.0.0.5");
        assert_eq!(first.port, 8080);
        assert_eq!(first.meta.get("version").map(String::as_str), Some("3"));
        assert_eq!(first.status, HealthStatus::Warning);
        assert_eq!(first.node.as_deref(), Some("node-a"));
        assert!(first.has_tag("v3"));
        assert!(first.enable_tag_override);

        let second = &instances[1];
        assert_eq!(second.address, "10.0.0.2");
        assert!(second.tags.is_empty());
        assert!(second.is_passing());
        assert_eq!(second.weights, Weights::default());
        assert!(!second.enable_tag_override);
    }

    #[test]
    fn test_decode_empty_array_is_empty_list() {
        assert!(decode_health_entries(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        for body in [&b""[..], b"null", b"{}", b"[{\"Service\": {}}]", b"<html>"] {
            assert!(matches!(
                decode_health_entries(body),
                Err(RegistryError::Decode { .. })
            ));
        }
    }

    #[test]
    fn test_service_name_falls_back_to_name_field() {
        let body = br#"[{"Service": {"ID": "a-1", "Name": "a", "Address": "h", "Port": 1}}]"#;
        let instances = decode_health_entries(body).unwrap();
        assert_eq!(instances[0].service_name, "a");
        assert_eq!(instances[0].socket_addr_string(), "h:1");
    }
}
