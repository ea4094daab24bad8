use super::orchestrator::run_contained;
use super::types::{
    LifecyclePhase, LifecycleReport, LifecycleState, ReportEntry, ServiceOutcome, ServiceState,
    StartupReport,
};
use super::LifecycleOrchestrator;
use crate::error::{RegistryError, Result};
use crate::registry::Availability;
use std::time::Instant;
use tracing::{error, info, warn};

impl LifecycleOrchestrator {
    /// Initialize every registered service in registration order.
    ///
    /// Unavailable services are skipped without invoking their hook. A failing
    /// hook is recorded and startup moves on to the next service; the process
    /// ends `Degraded` instead of `Running` when a critical service failed.
    /// Only valid from `NotStarted`.
    pub async fn initialize_all(&self) -> Result<StartupReport> {
        if !self.registry.is_probed() {
            return Err(RegistryError::NotProbed.into());
        }

        self.transition(&[LifecycleState::NotStarted], LifecycleState::Initializing)
            .await?;
        info!(
            "Initializing {} registered services",
            self.registry.descriptors().len()
        );

        let mut entries = Vec::with_capacity(self.registry.descriptors().len());

        for descriptor in self.registry.descriptors() {
            let name = descriptor.name();

            if let Some(Availability::Unavailable { reason }) = descriptor.availability() {
                info!("Skipping '{}': {}", name, reason);
                self.set_service_state(name, ServiceState::Skipped(reason.clone()))
                    .await;
                entries.push(ReportEntry {
                    service: name.to_string(),
                    criticality: descriptor.criticality(),
                    outcome: ServiceOutcome::SkippedUnavailable {
                        reason: reason.clone(),
                    },
                    elapsed_ms: 0,
                });
                continue;
            }

            self.set_service_state(name, ServiceState::Initializing)
                .await;
            let started = Instant::now();

            let outcome = match run_contained(
                descriptor.service().initialize(),
                Some(self.init_timeout),
            )
            .await
            {
                Ok(()) => {
                    self.set_service_state(name, ServiceState::Running).await;
                    info!("Service '{}' initialized", name);
                    ServiceOutcome::Success
                }
                Err(reason) => {
                    if descriptor.is_critical() {
                        error!("Failed to initialize critical service '{}': {}", name, reason);
                    } else {
                        warn!("Failed to initialize optional service '{}': {}", name, reason);
                    }
                    self.set_service_state(name, ServiceState::InitFailed(reason.clone()))
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

        let report = LifecycleReport::new(LifecyclePhase::Startup, entries);
        let target = if report.critical_failures() > 0 {
            LifecycleState::Degraded
        } else {
            LifecycleState::Running
        };

        self.transition(&[LifecycleState::Initializing], target)
            .await?;
        *self.startup_report.write().await = Some(report.clone());

        info!(
            "Startup complete: {} services, {} failed, state {}",
            report.entries().len(),
            report.failures().count(),
            target
        );
        Ok(report)
    }
}
