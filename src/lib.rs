pub mod app;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod metrics;
pub mod middleware;
pub mod registry;
pub mod services;

pub use app::{
    AppContext, LifecycleOrchestrator, LifecycleReport, LifecycleState, ServiceState,
    ShutdownReport, StartupReport,
};
pub use config::{AppConfig, TenantPolicy};
pub use error::{AppError, Result};
pub use health::{HealthAggregator, HealthReport, OverallStatus, ProbeStatus};
pub use http::{build_router, HttpServer};
pub use metrics::{MetricsCollector, MetricsSnapshot, ResourceReader};
pub use middleware::{apply_pipeline, AdmissionController, RateLimitStore, PIPELINE};
pub use registry::{Criticality, ManagedService, ServiceDescriptor, ServiceRegistry};
