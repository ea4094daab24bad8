//! Scriptable services shared by the unit tests of the registry, the
//! orchestrator, the health aggregator and the HTTP surface.

use super::service::{CapabilityUnavailable, ManagedService, ServiceResult};
use crate::error::ServiceError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBehavior {
    Healthy,
    Failing,
    Hang,
    Panic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookBehavior {
    Succeed,
    Fail,
    Panic,
}

pub struct MockService {
    name: String,
    available: bool,
    init: HookBehavior,
    shutdown: HookBehavior,
    health: HealthBehavior,
    calls: CallLog,
}

impl MockService {
    pub fn new(name: &str, calls: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            init: HookBehavior::Succeed,
            shutdown: HookBehavior::Succeed,
            health: HealthBehavior::Healthy,
            calls: Arc::clone(calls),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn init(mut self, behavior: HookBehavior) -> Self {
        self.init = behavior;
        self
    }

    pub fn shutdown(mut self, behavior: HookBehavior) -> Self {
        self.shutdown = behavior;
        self
    }

    pub fn health(mut self, behavior: HealthBehavior) -> Self {
        self.health = behavior;
        self
    }

    pub fn into_arc(self) -> Arc<dyn ManagedService> {
        Arc::new(self)
    }

    fn record(&self, hook: &str) {
        self.calls.lock().push(format!("{}:{}", hook, self.name));
    }

    fn run_hook(&self, hook: &str, behavior: HookBehavior) -> ServiceResult<()> {
        self.record(hook);
        match behavior {
            HookBehavior::Succeed => Ok(()),
            HookBehavior::Fail => Err(ServiceError::new(format!("{} {} failed", self.name, hook))),
            HookBehavior::Panic => panic!("{} {} panicked", self.name, hook),
        }
    }
}

#[async_trait]
impl ManagedService for MockService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<(), CapabilityUnavailable> {
        self.record("probe");
        if self.available {
            Ok(())
        } else {
            Err(CapabilityUnavailable::new(format!("{} dependency missing", self.name)))
        }
    }

    async fn initialize(&self) -> ServiceResult<()> {
        self.run_hook("init", self.init)
    }

    async fn shutdown(&self) -> ServiceResult<()> {
        self.run_hook("shutdown", self.shutdown)
    }

    async fn health_check(&self) -> ServiceResult<Option<String>> {
        self.record("health");
        match self.health {
            HealthBehavior::Healthy => Ok(Some("ok".to_string())),
            HealthBehavior::Failing => Err(ServiceError::new("connection refused")),
            HealthBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            }
            HealthBehavior::Panic => panic!("{} health probe panicked", self.name),
        }
    }
}

/// Calls recorded for one hook, in order, as service names
pub fn calls_for(calls: &CallLog, hook: &str) -> Vec<String> {
    let prefix = format!("{}:", hook);
    calls
        .lock()
        .iter()
        .filter_map(|c| c.strip_prefix(&prefix).map(str::to_string))
        .collect()
}
