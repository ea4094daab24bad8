use crate::registry::Criticality;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Process-wide lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    NotStarted,
    Initializing,
    Running,
    Degraded,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LifecycleState::NotStarted => "not_started",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Running => "running",
            LifecycleState::Degraded => "degraded",
            LifecycleState::ShuttingDown => "shutting_down",
            LifecycleState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Per-service runtime status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Pending,
    Initializing,
    Running,
    /// Initializer failed, panicked or timed out
    InitFailed(String),
    Skipped(String),
    Stopping,
    Stopped,
    /// Shutdown hook failed or panicked
    ShutdownFailed(String),
}

/// System shutdown reason
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
}

/// Result of one lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ServiceOutcome {
    Success,
    Failed { reason: String },
    SkippedUnavailable { reason: String },
}

impl ServiceOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ServiceOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub service: String,
    pub criticality: Criticality,
    #[serde(flatten)]
    pub outcome: ServiceOutcome,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Startup,
    Shutdown,
}

/// Ordered record of one lifecycle transition; immutable once built
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleReport {
    phase: LifecyclePhase,
    completed_at: DateTime<Utc>,
    entries: Vec<ReportEntry>,
}

pub type StartupReport = LifecycleReport;
pub type ShutdownReport = LifecycleReport;

impl LifecycleReport {
    pub(crate) fn new(phase: LifecyclePhase, entries: Vec<ReportEntry>) -> Self {
        Self {
            phase,
            completed_at: Utc::now(),
            entries,
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn critical_failures(&self) -> usize {
        self.failures()
            .filter(|e| e.criticality == Criticality::Critical)
            .count()
    }
}
