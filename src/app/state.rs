use super::types::{LifecycleState, ServiceState, ShutdownReport, StartupReport};
use super::LifecycleOrchestrator;
use crate::error::{AppError, Result};
use std::collections::HashMap;
use tracing::{debug, info};

impl LifecycleOrchestrator {
    /// Current process-wide state
    pub async fn lifecycle_state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Move to `to` only if the current state is one of `from`
    pub(super) async fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> Result<()> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(AppError::InvalidTransition { from: *state, to });
        }
        info!("Lifecycle state {} -> {}", *state, to);
        *state = to;
        Ok(())
    }

    /// Update service state
    pub async fn set_service_state(&self, service: &str, state: ServiceState) {
        let mut states = self.service_states.lock().await;
        debug!("Service '{}' state changed to: {:?}", service, state);
        states.insert(service.to_string(), state);
    }

    /// Get service state
    pub async fn service_state(&self, service: &str) -> Option<ServiceState> {
        let states = self.service_states.lock().await;
        states.get(service).cloned()
    }

    /// Get all service states
    pub async fn service_states(&self) -> HashMap<String, ServiceState> {
        let states = self.service_states.lock().await;
        states.clone()
    }

    pub async fn startup_report(&self) -> Option<StartupReport> {
        self.startup_report.read().await.clone()
    }

    pub async fn shutdown_report(&self) -> Option<ShutdownReport> {
        self.shutdown_report.read().await.clone()
    }
}
