use super::types::{LifecycleState, ServiceState, ShutdownReport, StartupReport};
use crate::error::panic_message;
use crate::registry::{ServiceRegistry, ServiceResult};
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;

/// Drives service hooks through startup and shutdown
pub struct LifecycleOrchestrator {
    pub(super) registry: Arc<ServiceRegistry>,
    pub(super) init_timeout: Duration,

    // Lifecycle management
    pub(super) state: RwLock<LifecycleState>,
    pub(super) service_states: Arc<Mutex<HashMap<String, ServiceState>>>,
    pub(super) startup_report: RwLock<Option<StartupReport>>,
    pub(super) shutdown_report: RwLock<Option<ShutdownReport>>,
}

impl LifecycleOrchestrator {
    /// Create an orchestrator over an already probed registry
    pub fn new(registry: Arc<ServiceRegistry>, init_timeout: Duration) -> Self {
        let states = registry
            .descriptors()
            .iter()
            .map(|d| (d.name().to_string(), ServiceState::Pending))
            .collect();

        Self {
            registry,
            init_timeout,
            state: RwLock::new(LifecycleState::NotStarted),
            service_states: Arc::new(Mutex::new(states)),
            startup_report: RwLock::new(None),
            shutdown_report: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

/// Run one hook so that an error, a panic or an overrun becomes a reason string
pub(super) async fn run_contained<F>(hook: F, limit: Option<Duration>) -> Result<(), String>
where
    F: Future<Output = ServiceResult<()>>,
{
    let guarded = AssertUnwindSafe(hook).catch_unwind();

    let outcome = match limit {
        Some(limit) => match timeout(limit, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => return Err(format!("timed out after {:?}", limit)),
        },
        None => guarded.await,
    };

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}
