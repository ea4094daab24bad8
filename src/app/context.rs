use super::LifecycleOrchestrator;
use crate::config::AppConfig;
use crate::error::Result;
use crate::health::{HealthAggregator, HealthReport};
use crate::metrics::{
    ApplicationMetrics, MetricsCollector, MetricsSnapshot, RequestCounters, ResourceReader,
};
use crate::middleware::{AdmissionController, RateLimitStore};
use crate::registry::ServiceRegistry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything request handlers and the runtime share, built once at startup
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ServiceRegistry>,
    pub lifecycle: Arc<LifecycleOrchestrator>,
    pub health: Arc<HealthAggregator>,
    pub metrics: Arc<MetricsCollector>,
    pub admission: Arc<AdmissionController>,
    pub counters: Arc<RequestCounters>,
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Build the context around a probed registry
    pub fn new(config: AppConfig, registry: ServiceRegistry) -> Self {
        let registry = Arc::new(registry);
        let lifecycle = Arc::new(LifecycleOrchestrator::new(
            Arc::clone(&registry),
            config.service_init_timeout(),
        ));
        let health = Arc::new(HealthAggregator::new(
            config.health_probe_timeout(),
            config.environment.clone(),
        ));
        let admission = Arc::new(
            AdmissionController::in_memory(config.rate_limit_requests, config.rate_limit_window())
                .with_trusted_proxies(config.trusted_proxy_addrs()),
        );

        Self {
            config: Arc::new(config),
            registry,
            lifecycle,
            health,
            metrics: Arc::new(MetricsCollector::system()),
            admission,
            counters: Arc::new(RequestCounters::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Swap the admission backend
    pub fn with_rate_limit_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.admission = Arc::new(
            AdmissionController::new(
                store,
                self.config.rate_limit_requests,
                self.config.rate_limit_window(),
            )
            .with_trusted_proxies(self.config.trusted_proxy_addrs()),
        );
        self
    }

    /// Swap the source of resource readings
    pub fn with_resource_reader(mut self, reader: Arc<dyn ResourceReader>) -> Self {
        self.metrics = Arc::new(MetricsCollector::new(reader));
        self
    }

    pub async fn health_report(&self) -> Result<HealthReport> {
        self.health.aggregate(&self.lifecycle).await
    }

    pub async fn application_metrics(&self) -> ApplicationMetrics {
        let summary = self.registry.summary();
        ApplicationMetrics {
            uptime_seconds: self.health.uptime().as_secs(),
            environment: self.config.environment.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            lifecycle: self.lifecycle.lifecycle_state().await,
            requests_total: self.counters.total(),
            requests_rejected: self.counters.rejected(),
            requests_failed: self.counters.failed(),
            services_registered: summary.registered,
            services_enabled: summary.enabled,
        }
    }

    pub async fn metrics_snapshot(&self) -> Result<MetricsSnapshot> {
        let application = self.application_metrics().await;
        self.metrics.snapshot(application).await
    }
}
