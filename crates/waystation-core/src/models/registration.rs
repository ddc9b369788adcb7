//! Instance descriptors submitted to the registry.

use super::health::{CheckDefinition, HealthCheck};
use crate::config::RegistryDefaults;
use crate::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Relative selection weight per health state. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Weights {
    pub passing: u32,
    pub warning: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            passing: RegistryDefaults::WEIGHT_PASSING,
            warning: RegistryDefaults::WEIGHT_WARNING,
        }
    }
}

/// Everything the registry needs to know about one service instance.
///
/// `id` keys the instance for its whole registered lifetime. Registering the
/// same `id` again replaces the previous descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub meta: HashMap<String, String>,
    pub enable_tag_override: bool,
    pub check: HealthCheck,
    /// How long the registry keeps a critical instance before removing it.
    pub deregister_critical_after: Duration,
    pub weights: Weights,
}

impl Registration {
    /// Registration probed over HTTP at `http://{address}:{port}{health_check_path}`.
    pub fn http(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        health_check_path: &str,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        let address = address.into();
        let url = probe_url(&address, port, health_check_path);
        Self::with_check(service_name, instance_id, address, port, HealthCheck::http(url))
    }

    /// Registration kept alive by heartbeats within `ttl`.
    pub fn ttl(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        ttl: Duration,
    ) -> Self {
        Self::with_check(service_name, instance_id, address, port, HealthCheck::ttl(ttl))
    }

    /// Registration with an explicit health check and default policy.
    pub fn with_check(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        check: HealthCheck,
    ) -> Self {
        Self {
            id: instance_id.into(),
            service_name: service_name.into(),
            address: address.into(),
            port,
            tags: Vec::new(),
            meta: HashMap::new(),
            enable_tag_override: false,
            check,
            deregister_critical_after: RegistryDefaults::DEREGISTER_CRITICAL_AFTER,
            weights: Weights::default(),
        }
    }

    pub fn with_meta(mut self, meta: HashMap<String, String>) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_meta_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_tag_override(mut self, enable: bool) -> Self {
        self.enable_tag_override = enable;
        self
    }

    pub fn with_weights(mut self, passing: u32, warning: u32) -> Self {
        self.weights = Weights { passing, warning };
        self
    }

    pub fn with_deregister_critical_after(mut self, after: Duration) -> Self {
        self.deregister_critical_after = after;
        self
    }

    /// Check the descriptor before it is sent anywhere.
    pub fn validate(&self) -> Result<()> {
        require_path_segment("instance_id", &self.id)?;
        require_path_segment("service_name", &self.service_name)?;
        require_non_empty("address", &self.address)?;
        if self.port == 0 {
            return Err(RegistryError::validation("port", "must be between 1 and 65535"));
        }
        if self.deregister_critical_after.is_zero() {
            return Err(RegistryError::validation(
                "deregister_critical_after",
                "must be greater than zero",
            ));
        }
        self.check.validate()
    }

    /// Encode as the registry's service definition.
    pub fn to_definition(&self) -> ServiceDefinition {
        ServiceDefinition {
            id: self.id.clone(),
            name: self.service_name.clone(),
            tags: self.tags.clone(),
            address: self.address.clone(),
            port: self.port,
            meta: self.meta.clone(),
            enable_tag_override: self.enable_tag_override,
            check: self.check.to_wire(self.deregister_critical_after),
            weights: self.weights,
        }
    }
}

impl TryFrom<ServiceDefinition> for Registration {
    type Error = RegistryError;

    fn try_from(definition: ServiceDefinition) -> Result<Self> {
        let (check, deregister_after) = HealthCheck::from_wire(&definition.check)?;
        Ok(Self {
            id: definition.id,
            service_name: definition.name,
            address: definition.address,
            port: definition.port,
            tags: definition.tags,
            meta: definition.meta,
            enable_tag_override: definition.enable_tag_override,
            check,
            deregister_critical_after: deregister_after
                .unwrap_or(RegistryDefaults::DEREGISTER_CRITICAL_AFTER),
            weights: definition.weights,
        })
    }
}

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDefinition {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub address: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub meta: HashMap<String, String>,
    #[serde(default)]
    pub enable_tag_override: bool,
    pub check: CheckDefinition,
    #[serde(default)]
    pub weights: Weights,
}

/// Generate an instance id of the form `{service_name}-{uuid}`.
pub fn generate_instance_id(service_name: &str) -> String {
    format!("{}-{}", service_name, uuid::Uuid::new_v4())
}

/// `host:port` with IPv6 literals bracketed.
pub(crate) fn host_port(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]:{}", address, port)
    } else {
        format!("{}:{}", address, port)
    }
}

fn probe_url(address: &str, port: u16, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("http://{}{}", host_port(address, port), path)
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(RegistryError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}

/// Check a value that is sent as a single URL path segment.
///
/// Percent-encoding leaves `.` and `..` untouched and URL resolution would
/// collapse them, so they can never address the intended resource.
pub(crate) fn require_path_segment(field: &str, value: &str) -> Result<()> {
    require_non_empty(field, value)?;
    if matches!(value, "." | "..") {
        return Err(RegistryError::validation(field, "must not be \".\" or \"..\""));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Registration {
        Registration::http("orders", "orders-1", "/health", "10.0.0.5", 8080)
            .with_meta_entry("version", "3")
    }

    #[test]
    fn test_http_registration_defaults() {
        let registration = orders();
        assert_eq!(
            registration.check,
            HealthCheck::http_with_interval("http://10.0.0.5:8080/health", Duration::from_secs(15))
        );
        assert_eq!(registration.deregister_critical_after, Duration::from_secs(30));
        assert_eq!(registration.weights, Weights { passing: 10, warning: 1 });
        assert!(!registration.enable_tag_override);
    }

    #[test]
    fn test_payload_field_names() {
        let json = serde_json::to_value(orders().to_definition()).unwrap();

        assert_eq!(json["ID"], "orders-1");
        assert_eq!(json["Name"], "orders");
        assert_eq!(json["Address"], "10.0.0.5");
        assert_eq!(json["Port"], 8080);
        assert_eq!(json["Meta"]["version"], "3");
        assert_eq!(json["EnableTagOverride"], false);
        assert_eq!(json["Check"]["HTTP"], "http://10.0.0.5:8080/health");
        assert_eq!(json["Check"]["Interval"], "15s");
        assert_eq!(json["Check"]["DeregisterCriticalServiceAfter"], "30s");
        assert_eq!(json["Weights"]["Passing"], 10);
        assert_eq!(json["Weights"]["Warning"], 1);
    }

    #[test]
    fn test_payload_decodes_to_same_registration() {
        let registrations = [
            orders(),
            Registration::ttl("billing", "billing-7", "billing.internal", 9000, Duration::from_secs(10))
                .with_tags(["v2", "eu-west"])
                .with_weights(5, 0),
            Registration::http("api", "api-0", "status", "::1", 443),
        ];

        for registration in registrations {
            let bytes = serde_json::to_vec(&registration.to_definition()).unwrap();
            let definition: ServiceDefinition = serde_json::from_slice(&bytes).unwrap();
            let decoded = Registration::try_from(definition).unwrap();
            assert_eq!(decoded, registration);
        }
    }

    #[test]
    fn test_probe_path_normalised_and_ipv6_bracketed() {
        let registration = Registration::http("api", "api-0", "status", "::1", 443);
        assert_eq!(registration.check, HealthCheck::http("http://[::1]:443/status"));
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(orders().validate().is_ok());

        let mut registration = orders();
        registration.service_name = String::new();
        assert!(matches!(
            registration.validate(),
            Err(RegistryError::Validation { ref field, .. }) if field == "service_name"
        ));

        let mut registration = orders();
        registration.id = "  ".to_string();
        assert!(registration.validate().is_err());

        let mut registration = orders();
        registration.port = 0;
        assert!(registration.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dot_segments() {
        for dots in [".", ".."] {
            let mut registration = orders();
            registration.id = dots.to_string();
            assert!(matches!(
                registration.validate(),
                Err(RegistryError::Validation { ref field, .. }) if field == "instance_id"
            ));

            let mut registration = orders();
            registration.service_name = dots.to_string();
            assert!(registration.validate().is_err());
        }

        let mut registration = orders();
        registration.id = "orders..1".to_string();
        assert!(registration.validate().is_ok());
    }

    #[test]
    fn test_generate_instance_id() {
        let a = generate_instance_id("orders");
        let b = generate_instance_id("orders");
        assert!(a.starts_with("orders-"));
        assert_ne!(a, b);
    }
}
