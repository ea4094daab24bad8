use crate::app::LifecycleState;
use crate::error::MetricsError;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One resource reading, or the reason it could not be taken
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading<T> {
    Value(T),
    Error { error: String },
}

impl<T> Reading<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Reading::Value(value) => Some(value),
            Reading::Error { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reading::Error { .. })
    }
}

impl<T> From<Result<T, MetricsError>> for Reading<T> {
    fn from(result: Result<T, MetricsError>) -> Self {
        match result {
            Ok(value) => Reading::Value(value),
            Err(e) => Reading::Error {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub used_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskUsage {
    pub mount_point: String,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessUsage {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
    pub cpu_percent: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub cpu_percent: Reading<f32>,
    pub load_average: Reading<LoadAverage>,
    pub memory: Reading<MemoryUsage>,
    pub disk: Reading<DiskUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub resources: Reading<ProcessUsage>,
    pub threads: Reading<usize>,
}

/// Counters owned by the application rather than the host
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationMetrics {
    pub uptime_seconds: u64,
    pub environment: String,
    pub version: String,
    pub lifecycle: LifecycleState,
    pub requests_total: u64,
    pub requests_rejected: u64,
    pub requests_failed: u64,
    pub services_registered: usize,
    pub services_enabled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    pub process: ProcessMetrics,
    pub application: ApplicationMetrics,
}

pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}
