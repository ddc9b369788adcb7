//! Health check declarations and health verdicts.
//!
//! A registered instance is supervised in exactly one of two ways: the
//! registry probes an HTTP endpoint on a fixed interval, or the instance
//! refreshes a TTL itself. [`HealthCheck`] makes that choice a single variant.

use super::duration::{format_duration, parse_duration};
use crate::config::RegistryDefaults;
use crate::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the registry decides whether an instance is alive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthCheck {
    /// Registry polls `url` every `interval`; non-2xx or no answer is unhealthy.
    Http { url: String, interval: Duration },
    /// Instance must report in at least once per `ttl`.
    Ttl { ttl: Duration },
}

impl HealthCheck {
    /// Active probe against `url` with the default interval.
    pub fn http(url: impl Into<String>) -> Self {
        HealthCheck::Http {
            url: url.into(),
            interval: RegistryDefaults::CHECK_INTERVAL,
        }
    }

    /// Active probe against `url` every `interval`.
    pub fn http_with_interval(url: impl Into<String>, interval: Duration) -> Self {
        HealthCheck::Http {
            url: url.into(),
            interval,
        }
    }

    /// Passive heartbeat that must be refreshed within `ttl`.
    pub fn ttl(ttl: Duration) -> Self {
        HealthCheck::Ttl { ttl }
    }

    /// TTL the instance has to beat, if this is a passive check.
    pub fn heartbeat_ttl(&self) -> Option<Duration> {
        match self {
            HealthCheck::Ttl { ttl } => Some(*ttl),
            HealthCheck::Http { .. } => None,
        }
    }

    /// Whether the instance owes the registry periodic refresh calls.
    pub fn requires_heartbeat(&self) -> bool {
        self.heartbeat_ttl().is_some()
    }

    /// Reject checks the registry could never evaluate.
    pub fn validate(&self) -> Result<()> {
        match self {
            HealthCheck::Http { url, interval } => {
                let parsed = url::Url::parse(url).map_err(|e| RegistryError::InvalidHealthCheck {
                    message: format!("probe URL {:?} is not valid: {}", url, e),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(RegistryError::InvalidHealthCheck {
                        message: format!("probe URL must be http or https, got {}", parsed.scheme()),
                    });
                }
                if interval.is_zero() {
                    return Err(RegistryError::InvalidHealthCheck {
                        message: "probe interval must be greater than zero".to_string(),
                    });
                }
            }
            HealthCheck::Ttl { ttl } => {
                if ttl.is_zero() {
                    return Err(RegistryError::InvalidHealthCheck {
                        message: "TTL must be greater than zero".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Encode as the registry's check definition.
    pub fn to_wire(&self, deregister_critical_after: Duration) -> CheckDefinition {
        let mut definition = CheckDefinition {
            deregister_critical_service_after: format_duration(deregister_critical_after),
            ..Default::default()
        };
        match self {
            HealthCheck::Http { url, interval } => {
                definition.http = Some(url.clone());
                definition.interval = Some(format_duration(*interval));
            }
            HealthCheck::Ttl { ttl } => {
                definition.ttl = Some(format_duration(*ttl));
            }
        }
        definition
    }

    /// Decode a check definition, returning the check and its critical-after window.
    ///
    /// A definition naming both an HTTP probe and a TTL is rejected, as is one
    /// naming neither.
    pub fn from_wire(definition: &CheckDefinition) -> Result<(Self, Option<Duration>)> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);

        let check = match (non_empty(&definition.http), non_empty(&definition.ttl)) {
            (Some(_), Some(_)) => {
                return Err(RegistryError::InvalidHealthCheck {
                    message: "HTTP probe and TTL heartbeat are mutually exclusive".to_string(),
                })
            }
            (None, None) => {
                return Err(RegistryError::InvalidHealthCheck {
                    message: "check declares neither an HTTP probe nor a TTL".to_string(),
                })
            }
            (Some(url), None) => {
                let interval = match non_empty(&definition.interval) {
                    Some(raw) => parse_duration(&raw)?,
                    None => RegistryDefaults::CHECK_INTERVAL,
                };
                HealthCheck::Http { url, interval }
            }
            (None, Some(raw)) => HealthCheck::Ttl {
                ttl: parse_duration(&raw)?,
            },
        };

        let deregister_after = if definition.deregister_critical_service_after.is_empty() {
            None
        } else {
            Some(parse_duration(&definition.deregister_critical_service_after)?)
        };

        Ok((check, deregister_after))
    }
}

/// Check definition as sent in the `Check` field of a registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckDefinition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deregister_critical_service_after: String,
    #[serde(rename = "HTTP", default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Health verdict reported by the registry, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Passing,
    Warning,
    Critical,
    Maintenance,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Passing => "passing",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Maintenance => "maintenance",
        }
    }

    /// Parse a status string; anything unrecognised counts as critical.
    pub fn parse_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "passing" => HealthStatus::Passing,
            "warning" => HealthStatus::Warning,
            "maintenance" => HealthStatus::Maintenance,
            _ => HealthStatus::Critical,
        }
    }

    /// Worst status among `statuses`; passing when there are none.
    pub fn aggregate<I: IntoIterator<Item = HealthStatus>>(statuses: I) -> Self {
        statuses
            .into_iter()
            .max()
            .unwrap_or(HealthStatus::Passing)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
