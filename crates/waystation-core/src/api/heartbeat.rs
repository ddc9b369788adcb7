//! Passive (TTL) health reporting.
//!
//! An instance registered with a TTL check must report in before the TTL
//! runs out or the registry marks it critical. The one-shot `*_ttl` methods
//! send a single report; [`Heartbeat`] keeps reporting from a background task.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::models::{require_path_segment, HealthStatus, Registration};
use crate::transport::RegistryRequest;
use crate::RegistryClient;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CheckUpdate<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
}

impl RegistryClient {
    // ========================================
    // TTL Reporting
    // ========================================

    /// Report the instance's TTL check as passing.
    pub async fn pass_ttl(&self, instance_id: &str, note: Option<&str>) -> Result<()> {
        self.update_ttl(instance_id, HealthStatus::Passing, note).await
    }

    /// Report the instance's TTL check as warning.
    pub async fn warn_ttl(&self, instance_id: &str, note: Option<&str>) -> Result<()> {
        self.update_ttl(instance_id, HealthStatus::Warning, note).await
    }

    /// Report the instance's TTL check as critical.
    pub async fn fail_ttl(&self, instance_id: &str, note: Option<&str>) -> Result<()> {
        self.update_ttl(instance_id, HealthStatus::Critical, note).await
    }

    /// Set the status of the TTL check embedded in the instance's registration.
    pub async fn update_ttl(
        &self,
        instance_id: &str,
        status: HealthStatus,
        note: Option<&str>,
    ) -> Result<()> {
        require_path_segment("instance_id", instance_id)?;
        if status == HealthStatus::Maintenance {
            return Err(RegistryError::validation(
                "status",
                "maintenance cannot be reported through a TTL check",
            ));
        }

        let path = format!(
            "/v1/agent/check/update/service:{}",
            super::segment(instance_id)
        );
        let body = CheckUpdate {
            status: status.as_str(),
            output: note,
        };
        let request = RegistryRequest::put(path).with_json(&body)?;
        self.execute(request).await.map(|_| ())
    }
}

/// Background task that keeps an instance's TTL check passing.
///
/// The task stops when [`Heartbeat::stop`] is called, when the handle is
/// dropped, or when the client's cancellation token fires. Failed reports are
/// logged and retried on the next tick.
pub struct Heartbeat {
    instance_id: String,
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Start reporting for `instance_id` every `interval`.
    ///
    /// `interval` must be shorter than `ttl`, otherwise the check would lapse
    /// between reports.
    pub fn spawn(
        client: &RegistryClient,
        instance_id: impl Into<String>,
        ttl: Duration,
        interval: Duration,
    ) -> Result<Self> {
        let instance_id = instance_id.into();
        require_path_segment("instance_id", &instance_id)?;
        if interval.is_zero() || interval >= ttl {
            return Err(RegistryError::validation(
                "interval",
                format!("heartbeat interval {:?} must be shorter than TTL {:?}", interval, ttl),
            ));
        }

        let stop = CancellationToken::new();
        let handle = tokio::spawn(run(
            client.clone(),
            instance_id.clone(),
            interval,
            stop.clone(),
        ));
        info!("Heartbeat for {} started every {:?}", instance_id, interval);

        Ok(Self {
            instance_id,
            stop,
            handle: Some(handle),
        })
    }

    /// Start reporting for a TTL-checked registration, three times per TTL.
    pub fn for_registration(client: &RegistryClient, registration: &Registration) -> Result<Self> {
        let ttl = registration.check.heartbeat_ttl().ok_or_else(|| {
            RegistryError::InvalidHealthCheck {
                message: format!("{} is probed over HTTP and needs no heartbeat", registration.id),
            }
        })?;
        Self::spawn(client, registration.id.clone(), ttl, ttl / 3)
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Whether the background task is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop reporting and wait for the task to exit.
    pub async fn stop(mut self) {
        self.stop.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Heartbeat task for {} ended abnormally: {}", self.instance_id, e);
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn run(client: RegistryClient, instance_id: String, interval: Duration, stop: CancellationToken) {
    let parent = client.cancel_token().clone();
    let reporter = client.with_cancel_token(stop.clone());
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            () = parent.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            () = parent.cancelled() => break,
            outcome = reporter.pass_ttl(&instance_id, None) => outcome,
        };
        match outcome {
            Ok(()) => debug!("Heartbeat sent for {}", instance_id),
            Err(RegistryError::Cancelled) => break,
            Err(e) => warn!("Heartbeat for {} failed: {}", instance_id, e),
        }
    }

    debug!("Heartbeat for {} stopped", instance_id);
}
