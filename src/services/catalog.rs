use super::network::NetworkDependency;
use super::request_tracing::RequestTracing;
use super::static_assets::StaticAssets;
use super::{CACHE, DATABASE};
use crate::config::AppConfig;
use crate::error::RegistryError;
use crate::registry::{ServiceDescriptor, ServiceRegistry};
use std::sync::Arc;

/// Register the built-in services in dependency order
pub fn register_builtin_services(
    registry: &mut ServiceRegistry,
    config: &AppConfig,
) -> Result<(), RegistryError> {
    let connect_timeout = config.health_probe_timeout();

    registry.register(ServiceDescriptor::critical(Arc::new(NetworkDependency::new(
        DATABASE,
        "DATABASE_URL",
        config.database_url.clone(),
        connect_timeout,
    ))))?;

    registry.register(ServiceDescriptor::optional(Arc::new(NetworkDependency::new(
        CACHE,
        "REDIS_URL",
        config.redis_url.clone(),
        connect_timeout,
    ))))?;

    registry.register(ServiceDescriptor::optional(Arc::new(StaticAssets::new(
        config.static_path(),
    ))))?;

    registry.register(ServiceDescriptor::optional(Arc::new(RequestTracing::new(
        config.enable_tracing,
    ))))?;

    Ok(())
}
