//! Built-in subsystems managed by the registry.

mod catalog;
mod network;
mod request_tracing;
mod static_assets;

#[cfg(test)]
mod tests;

pub use catalog::register_builtin_services;
pub use network::NetworkDependency;
pub use request_tracing::RequestTracing;
pub use static_assets::{StaticAssets, INDEX_FILE};

pub const DATABASE: &str = "database";
pub const CACHE: &str = "cache";
pub const STATIC_ASSETS: &str = "static_assets";
pub const REQUEST_TRACING: &str = "request_tracing";
