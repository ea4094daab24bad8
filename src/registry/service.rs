use crate::error::ServiceError;
use async_trait::async_trait;
use thiserror::Error;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Reason an optional subsystem's prerequisites could not be satisfied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct CapabilityUnavailable {
    pub reason: String,
}

impl CapabilityUnavailable {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Contract every orchestrated subsystem honours.
///
/// The orchestrator never looks inside a subsystem: it asks whether the
/// subsystem can run here (`probe`), starts it, stops it, and asks whether it
/// is healthy. Every hook returns a typed result; errors are recorded in
/// reports rather than propagated.
#[async_trait]
pub trait ManagedService: Send + Sync {
    /// Unique service name used as the registry key
    fn name(&self) -> &str;

    /// Resolve the optional capability this service depends on
    async fn probe(&self) -> Result<(), CapabilityUnavailable> {
        Ok(())
    }

    /// Bring the service up
    async fn initialize(&self) -> ServiceResult<()> {
        Ok(())
    }

    /// Release resources; best-effort
    async fn shutdown(&self) -> ServiceResult<()> {
        Ok(())
    }

    /// Report liveness, optionally with a human-readable detail
    async fn health_check(&self) -> ServiceResult<Option<String>> {
        Ok(None)
    }
}
