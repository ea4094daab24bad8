use super::types::{HealthReport, OverallStatus, ProbeStatus, ServiceHealth};
use crate::app::{LifecycleOrchestrator, ServiceState};
use crate::error::{RegistryError, Result};
use crate::registry::{Criticality, ServiceDescriptor};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Probes enabled services concurrently and folds the results into one status
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    probe_timeout: Duration,
    environment: String,
    started_at: Instant,
}

impl HealthAggregator {
    pub fn new(probe_timeout: Duration, environment: impl Into<String>) -> Self {
        Self {
            probe_timeout,
            environment: environment.into(),
            started_at: Instant::now(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Build a full report for every enabled service.
    ///
    /// Completes within roughly one probe timeout regardless of how many
    /// services hang.
    pub async fn aggregate(&self, lifecycle: &LifecycleOrchestrator) -> Result<HealthReport> {
        let registry = lifecycle.registry();
        if !registry.is_probed() {
            return Err(RegistryError::NotProbed.into());
        }

        let states = lifecycle.service_states().await;
        let services = self
            .probe_services(&registry.enabled_services(), &states)
            .await;

        Ok(HealthReport {
            status: overall_status(&services),
            timestamp: Utc::now(),
            lifecycle: lifecycle.lifecycle_state().await,
            environment: self.environment.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime().as_secs(),
            services,
        })
    }

    /// Probe each service in its own task; output keeps registration order
    pub async fn probe_services(
        &self,
        services: &[Arc<ServiceDescriptor>],
        states: &HashMap<String, ServiceState>,
    ) -> Vec<ServiceHealth> {
        let probes = services.iter().map(|descriptor| {
            let init_failure = match states.get(descriptor.name()) {
                Some(ServiceState::InitFailed(reason)) => Some(reason.clone()),
                _ => None,
            };
            self.probe_one(Arc::clone(descriptor), init_failure)
        });

        join_all(probes).await
    }

    async fn probe_one(
        &self,
        descriptor: Arc<ServiceDescriptor>,
        init_failure: Option<String>,
    ) -> ServiceHealth {
        let mut health = ServiceHealth {
            name: descriptor.name().to_string(),
            criticality: descriptor.criticality(),
            status: ProbeStatus::Unhealthy,
            detail: None,
            latency_ms: 0,
        };

        if let Some(reason) = init_failure {
            health.detail = Some(format!("initialization failed: {}", reason));
            return health;
        }

        let started = Instant::now();
        let service = Arc::clone(descriptor.service());
        let mut handle = tokio::spawn(async move { service.health_check().await });

        match timeout(self.probe_timeout, &mut handle).await {
            Ok(Ok(Ok(detail))) => {
                health.status = ProbeStatus::Healthy;
                health.detail = detail;
            }
            Ok(Ok(Err(e))) => {
                debug!("Health probe for '{}' failed: {}", health.name, e);
                health.detail = Some(e.to_string());
            }
            Ok(Err(join_error)) => {
                warn!("Health probe for '{}' panicked: {}", health.name, join_error);
                health.detail = Some("health probe panicked".to_string());
            }
            Err(_) => {
                handle.abort();
                warn!(
                    "Health probe for '{}' timed out after {:?}",
                    health.name, self.probe_timeout
                );
                health.status = ProbeStatus::UnknownTimeout;
                health.detail = Some(format!(
                    "no response within {}ms",
                    self.probe_timeout.as_millis()
                ));
            }
        }

        health.latency_ms = started.elapsed().as_millis() as u64;
        health
    }
}

/// Unhealthy if a critical service is not healthy, degraded if only optional ones are
pub fn overall_status(services: &[ServiceHealth]) -> OverallStatus {
    let mut status = OverallStatus::Healthy;
    for service in services.iter().filter(|s| !s.is_healthy()) {
        match service.criticality {
            Criticality::Critical => return OverallStatus::Unhealthy,
            Criticality::Optional => status = OverallStatus::Degraded,
        }
    }
    status
}
