use super::network::parse_endpoint;
use super::*;
use crate::config::AppConfig;
use crate::registry::{Availability, ManagedService, ServiceRegistry};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

fn dependency(url: Option<&str>) -> NetworkDependency {
    NetworkDependency::new(
        DATABASE,
        "DATABASE_URL",
        url.map(str::to_string),
        Duration::from_millis(500),
    )
}

#[test]
fn test_parse_endpoint() {
    assert_eq!(
        parse_endpoint("postgresql://user:pw@db.internal/chatbot").unwrap(),
        ("db.internal".to_string(), 5432)
    );
    assert_eq!(
        parse_endpoint("redis://localhost:6380/0").unwrap(),
        ("localhost".to_string(), 6380)
    );
    assert!(parse_endpoint("not a url").is_err());
    assert!(parse_endpoint("custom://host-without-port").is_err());
}

#[tokio::test]
async fn test_unconfigured_dependency_is_unavailable() {
    let reason = dependency(None).probe().await.unwrap_err().reason;
    assert_eq!(reason, "DATABASE_URL not configured");

    let reason = dependency(Some("::::")).probe().await.unwrap_err().reason;
    assert!(reason.starts_with("DATABASE_URL: invalid URL"));
}

#[tokio::test]
async fn test_reachable_dependency() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let service = dependency(Some(&format!("postgres://127.0.0.1:{}/chatbot", port)));

    service.probe().await.unwrap();
    assert_eq!(service.endpoint(), Some(("127.0.0.1", port)));
    service.initialize().await.unwrap();
    let detail = service.health_check().await.unwrap().unwrap();
    assert!(detail.starts_with("reachable"));
}

#[tokio::test]
async fn test_unreachable_dependency_fails_init() {
    // Grab a free port, then close it
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let service = dependency(Some(&format!("postgres://127.0.0.1:{}/chatbot", port)));

    service.probe().await.unwrap();
    assert!(service.initialize().await.is_err());
    assert!(service.health_check().await.is_err());
}

#[tokio::test]
async fn test_static_assets_availability() {
    let dir = TempDir::new().unwrap();
    let assets = StaticAssets::new(dir.path());
    assert!(assets.probe().await.is_ok());
    assert_eq!(
        assets.health_check().await.unwrap().as_deref(),
        Some("index missing")
    );

    std::fs::write(dir.path().join(INDEX_FILE), "<html></html>").unwrap();
    assets.initialize().await.unwrap();
    assert_eq!(
        assets.health_check().await.unwrap().as_deref(),
        Some("index present")
    );

    let missing = StaticAssets::new(dir.path().join("missing"));
    assert!(missing.probe().await.is_err());
}

#[tokio::test]
async fn test_request_tracing_follows_flag() {
    assert!(RequestTracing::new(true).probe().await.is_ok());
    let reason = RequestTracing::new(false).probe().await.unwrap_err().reason;
    assert_eq!(reason, "ENABLE_TRACING is disabled");
}

#[tokio::test]
async fn test_builtin_catalog_order_and_availability() {
    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        static_dir: dir.path().display().to_string(),
        enable_tracing: false,
        database_url: None,
        redis_url: None,
        ..AppConfig::default()
    };
    let mut registry = ServiceRegistry::new();

    register_builtin_services(&mut registry, &config).unwrap();
    registry.probe_and_enable().await;

    let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name()).collect();
    assert_eq!(names, vec![DATABASE, CACHE, STATIC_ASSETS, REQUEST_TRACING]);
    assert!(registry.get(DATABASE).unwrap().is_critical());
    assert!(registry.is_available(STATIC_ASSETS));
    assert!(!registry.is_available(REQUEST_TRACING));
    assert!(matches!(
        registry.get(CACHE).unwrap().availability(),
        Some(Availability::Unavailable { reason }) if reason == "REDIS_URL not configured"
    ));
}
