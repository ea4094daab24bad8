use super::service::ManagedService;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Whether a failing service degrades the whole process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Critical,
    Optional,
}

/// Outcome of capability probing for one descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Declarative description of an optional subsystem
pub struct ServiceDescriptor {
    name: String,
    criticality: Criticality,
    order: usize,
    service: Arc<dyn ManagedService>,
    availability: OnceLock<Availability>,
}

impl ServiceDescriptor {
    pub fn new(service: Arc<dyn ManagedService>, criticality: Criticality) -> Self {
        Self {
            name: service.name().to_string(),
            criticality,
            order: 0,
            service,
            availability: OnceLock::new(),
        }
    }

    pub fn critical(service: Arc<dyn ManagedService>) -> Self {
        Self::new(service, Criticality::Critical)
    }

    pub fn optional(service: Arc<dyn ManagedService>) -> Self {
        Self::new(service, Criticality::Optional)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn is_critical(&self) -> bool {
        self.criticality == Criticality::Critical
    }

    /// Position assigned at registration; ascending order is startup order
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn service(&self) -> &Arc<dyn ManagedService> {
        &self.service
    }

    /// `None` until capability probing has run
    pub fn availability(&self) -> Option<&Availability> {
        self.availability.get()
    }

    pub fn is_available(&self) -> bool {
        self.availability
            .get()
            .map(Availability::is_available)
            .unwrap_or(false)
    }

    pub(crate) fn assign_order(&mut self, order: usize) {
        self.order = order;
    }

    /// Record the probe outcome; returns false if it was already recorded
    pub(crate) fn set_availability(&self, availability: Availability) -> bool {
        self.availability.set(availability).is_ok()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name)
            .field("criticality", &self.criticality)
            .field("order", &self.order)
            .field("availability", &self.availability.get())
            .finish()
    }
}
