use super::descriptor::{Availability, ServiceDescriptor};
use crate::error::RegistryError;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Holds every service descriptor for the lifetime of the process
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    descriptors: Vec<Arc<ServiceDescriptor>>,
    probed: bool,
}

/// Registered/enabled counts, reported at startup and in metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub registered: usize,
    pub enabled: usize,
    pub unavailable: usize,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; only allowed before capability probing
    pub fn register(&mut self, mut descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        if self.probed {
            return Err(RegistryError::Sealed {
                name: descriptor.name().to_string(),
            });
        }

        if self.get(descriptor.name()).is_some() {
            return Err(RegistryError::DuplicateService {
                name: descriptor.name().to_string(),
            });
        }

        descriptor.assign_order(self.descriptors.len());
        debug!(
            "Registered service '{}' ({:?}) at position {}",
            descriptor.name(),
            descriptor.criticality(),
            descriptor.order()
        );
        self.descriptors.push(Arc::new(descriptor));
        Ok(())
    }

    /// Resolve each descriptor's capability and record its availability.
    ///
    /// An unresolvable capability is not an error: the descriptor is marked
    /// unavailable with the reason. Seals the registry against further
    /// registration. Calling it again is a no-op.
    pub async fn probe_and_enable(&mut self) -> RegistrySummary {
        if self.probed {
            return self.summary();
        }

        info!("Probing {} service capabilities", self.descriptors.len());

        for descriptor in &self.descriptors {
            let outcome = AssertUnwindSafe(descriptor.service().probe())
                .catch_unwind()
                .await;

            let availability = match outcome {
                Ok(Ok(())) => {
                    info!("Service '{}' is available", descriptor.name());
                    Availability::Available
                }
                Ok(Err(unavailable)) => {
                    warn!(
                        "Service '{}' unavailable: {}",
                        descriptor.name(),
                        unavailable.reason
                    );
                    Availability::Unavailable {
                        reason: unavailable.reason,
                    }
                }
                Err(_) => {
                    warn!("Capability probe for '{}' panicked", descriptor.name());
                    Availability::Unavailable {
                        reason: "capability probe panicked".to_string(),
                    }
                }
            };

            descriptor.set_availability(availability);
        }

        self.probed = true;
        let summary = self.summary();
        info!(
            "Capability probing complete: {} registered, {} enabled, {} unavailable",
            summary.registered, summary.enabled, summary.unavailable
        );
        summary
    }

    pub fn is_probed(&self) -> bool {
        self.probed
    }

    /// All descriptors in registration order
    pub fn descriptors(&self) -> &[Arc<ServiceDescriptor>] {
        &self.descriptors
    }

    /// Enabled descriptors in ascending registration order
    pub fn enabled_services(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.descriptors
            .iter()
            .filter(|d| d.is_available())
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.descriptors.iter().find(|d| d.name() == name)
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.get(name).map(|d| d.is_available()).unwrap_or(false)
    }

    pub fn summary(&self) -> RegistrySummary {
        let enabled = self.descriptors.iter().filter(|d| d.is_available()).count();
        let unavailable = self
            .descriptors
            .iter()
            .filter(|d| matches!(d.availability(), Some(Availability::Unavailable { .. })))
            .count();

        RegistrySummary {
            registered: self.descriptors.len(),
            enabled,
            unavailable,
        }
    }
}
