use crate::registry::{CapabilityUnavailable, ManagedService, ServiceResult};
use async_trait::async_trait;

/// Per-request HTTP spans; the router installs the trace layer only when enabled
pub struct RequestTracing {
    enabled: bool,
}

impl RequestTracing {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl ManagedService for RequestTracing {
    fn name(&self) -> &str {
        super::REQUEST_TRACING
    }

    async fn probe(&self) -> Result<(), CapabilityUnavailable> {
        if self.enabled {
            Ok(())
        } else {
            Err(CapabilityUnavailable::new("ENABLE_TRACING is disabled"))
        }
    }

    async fn health_check(&self) -> ServiceResult<Option<String>> {
        Ok(Some("request spans enabled".to_string()))
    }
}
