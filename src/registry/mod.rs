mod store;
mod descriptor;
mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use store::{RegistrySummary, ServiceRegistry};
pub use descriptor::{Availability, Criticality, ServiceDescriptor};
pub use service::{CapabilityUnavailable, ManagedService, ServiceResult};
