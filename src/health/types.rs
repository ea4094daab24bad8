use crate::app::LifecycleState;
use crate::registry::Criticality;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Unified status across all enabled services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Result of probing a single service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    UnknownTimeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub name: String,
    pub criticality: Criticality,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub latency_ms: u64,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == ProbeStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub lifecycle: LifecycleState,
    pub environment: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub services: Vec<ServiceHealth>,
}

impl HealthReport {
    pub fn service(&self, name: &str) -> Option<&ServiceHealth> {
        self.services.iter().find(|s| s.name == name)
    }
}
