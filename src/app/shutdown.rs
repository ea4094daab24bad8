use super::orchestrator::run_contained;
use super::types::{
    LifecyclePhase, LifecycleReport, LifecycleState, ReportEntry, ServiceOutcome, ServiceState,
    ShutdownReport,
};
use super::LifecycleOrchestrator;
use crate::error::Result;
use std::time::Instant;
use tracing::{error, info};

impl LifecycleOrchestrator {
    /// Perform graceful shutdown of all enabled services.
    ///
    /// Hooks run in reverse registration order, each exactly once, whatever
    /// the service's initialization outcome was. Every hook is attempted even
    /// when an earlier one fails; the process always ends `Stopped`.
    pub async fn shutdown_all(&self) -> Result<ShutdownReport> {
        self.transition(
            &[LifecycleState::Running, LifecycleState::Degraded],
            LifecycleState::ShuttingDown,
        )
        .await?;
        info!("Beginning graceful shutdown");

        let enabled = self.registry.enabled_services();
        let mut entries = Vec::with_capacity(enabled.len());

        // Stop services in reverse dependency order
        for descriptor in enabled.iter().rev() {
            let name = descriptor.name();
            info!("Stopping service '{}'", name);
            self.set_service_state(name, ServiceState::Stopping).await;
            let started = Instant::now();

            let outcome = match run_contained(descriptor.service().shutdown(), None).await {
                Ok(()) => {
                    self.set_service_state(name, ServiceState::Stopped).await;
                    info!("Service '{}' stopped", name);
                    ServiceOutcome::Success
                }
                Err(reason) => {
                    error!("Error stopping service '{}': {}", name, reason);
                    self.set_service_state(name, ServiceState::ShutdownFailed(reason.clone()))
                        .await;
                    ServiceOutcome::Failed { reason }
                }
            };

            entries.push(ReportEntry {
                service: name.to_string(),
                criticality: descriptor.criticality(),
                outcome,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let report = LifecycleReport::new(LifecyclePhase::Shutdown, entries);
        self.transition(&[LifecycleState::ShuttingDown], LifecycleState::Stopped)
            .await?;
        *self.shutdown_report.write().await = Some(report.clone());

        info!(
            "Graceful shutdown completed: {} services stopped, {} failed",
            report.entries().len(),
            report.failures().count()
        );
        Ok(report)
    }
}
