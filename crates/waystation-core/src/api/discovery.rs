//! Discovery methods on RegistryClient.

use tracing::{debug, warn};
use url::form_urlencoded;

use super::segment;
use crate::error::Result;
use crate::models::{decode_health_entries, require_path_segment, DiscoveredInstance};
use crate::transport::RegistryRequest;
use crate::RegistryClient;

/// Parameters of a health-aware discovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryQuery {
    pub service_name: String,
    /// Only return instances carrying this tag.
    pub tag: Option<String>,
    /// Only return instances whose checks all pass.
    pub passing_only: bool,
    /// Overrides the client's configured datacenter.
    pub datacenter: Option<String>,
}

impl DiscoveryQuery {
    /// Query the passing instances of `service_name`.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            tag: None,
            passing_only: true,
            datacenter: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Also return warning and critical instances.
    pub fn include_unhealthy(mut self) -> Self {
        self.passing_only = false;
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.datacenter = Some(datacenter.into());
        self
    }

    fn to_path(&self, default_datacenter: Option<&str>) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if self.passing_only {
            query.append_pair("passing", "true");
        }
        if let Some(tag) = &self.tag {
            query.append_pair("tag", tag);
        }
        if let Some(dc) = self.datacenter.as_deref().or(default_datacenter) {
            query.append_pair("dc", dc);
        }
        let query = query.finish();

        let path = format!("/v1/health/service/{}", segment(&self.service_name));
        if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        }
    }
}

impl RegistryClient {
    // ========================================
    // Discovery
    // ========================================

    /// Resolve `service_name` to the instances the registry currently
    /// considers healthy.
    ///
    /// An empty list is a valid answer: nothing healthy is known right now.
    /// Transport, status and decode failures are returned as errors and are
    /// never folded into the empty case.
    pub async fn discover_services(&self, service_name: &str) -> Result<Vec<DiscoveredInstance>> {
        self.discover(&DiscoveryQuery::new(service_name)).await
    }

    /// Run a discovery query with explicit options.
    ///
    /// Results keep the registry's order, which may change between calls.
    pub async fn discover(&self, query: &DiscoveryQuery) -> Result<Vec<DiscoveredInstance>> {
        let result = self.run_discovery(query).await;
        match &result {
            Ok(instances) => debug!(
                "Discovered {} instance(s) of {}",
                instances.len(),
                query.service_name
            ),
            Err(e) => warn!("Discovery of {} failed: {}", query.service_name, e),
        }
        result
    }

    async fn run_discovery(&self, query: &DiscoveryQuery) -> Result<Vec<DiscoveredInstance>> {
        require_path_segment("service_name", &query.service_name)?;

        let path = query.to_path(self.config.datacenter.as_deref());
        let response = self.execute(RegistryRequest::get(path)).await?;
        decode_health_entries(&response.body)
    }
}
