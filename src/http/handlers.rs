use crate::app::AppContext;
use crate::middleware::{CorrelationId, Rejection, PIPELINE};
use crate::registry::{Availability, Criticality};
use crate::services::{CACHE, DATABASE, INDEX_FILE, REQUEST_TRACING, STATIC_ASSETS};
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error};

const API_MESSAGE: &str = "Modern Chatbot Backend API";

const BASE_FEATURES: &[&str] = &[
    "Enhanced RAG System",
    "Document Management",
    "Real-time Chat Monitoring",
    "Advanced Security",
    "Comprehensive Analytics",
    "Multi-provider AI Support",
];

/// Path prefixes that never resolve to the frontend
const NON_SPA_PREFIXES: &[&str] = &["api/", "docs", "redoc"];

/// Handler for `/`: the frontend if one is installed, else API info
pub async fn root(State(context): State<AppContext>) -> Response {
    if let Some(index) = load_index(&context).await {
        return Html(index).into_response();
    }

    Json(json!({
        "message": API_MESSAGE,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "features": features(&context),
    }))
    .into_response()
}

/// Client-side routes of the frontend
pub async fn spa_fallback(
    State(context): State<AppContext>,
    method: Method,
    uri: Uri,
    correlation: Option<Extension<CorrelationId>>,
) -> Response {
    let correlation = correlation.map(|Extension(id)| id);
    let not_found = |message: &str| {
        Rejection::not_found(message)
            .with_correlation(correlation.as_ref())
            .into_response()
    };

    if method != Method::GET && method != Method::HEAD {
        return not_found("Not found");
    }

    let path = uri.path().trim_start_matches('/');
    if path == "api" || NON_SPA_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        debug!("No route for /{}", path);
        return not_found("Not found");
    }

    match load_index(&context).await {
        Some(index) => Html(index).into_response(),
        None => not_found("Frontend not available"),
    }
}

/// Full health report; always 200
pub async fn health(State(context): State<AppContext>) -> Response {
    match context.health_report().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!("Health check failed: {}", e);
            Json(json!({
                "status": "unhealthy",
                "timestamp": Utc::now().to_rfc3339(),
                "error": e.to_string(),
            }))
            .into_response()
        }
    }
}

/// Liveness only; touches no service
pub async fn simple_health(State(context): State<AppContext>) -> Response {
    Json(json!({
        "status": "healthy",
        "environment": context.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

/// Resource snapshot; always 200
pub async fn metrics(State(context): State<AppContext>) -> Response {
    match context.metrics_snapshot().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            error!("Metrics collection failed: {}", e);
            Json(json!({
                "error": "metrics_collection_failed",
                "message": e.to_string(),
                "timestamp": Utc::now().to_rfc3339(),
            }))
            .into_response()
        }
    }
}

/// Route and service catalogue, mounted in debug mode
pub async fn docs(State(context): State<AppContext>) -> Response {
    let services: Vec<_> = context
        .registry
        .descriptors()
        .iter()
        .map(|descriptor| {
            let reason = match descriptor.availability() {
                Some(Availability::Unavailable { reason }) => Some(reason.clone()),
                _ => None,
            };
            json!({
                "name": descriptor.name(),
                "criticality": descriptor.criticality(),
                "order": descriptor.order(),
                "available": descriptor.is_available(),
                "reason": reason,
            })
        })
        .collect();

    Json(json!({
        "title": API_MESSAGE,
        "version": env!("CARGO_PKG_VERSION"),
        "routes": [
            { "method": "GET", "path": "/", "description": "Frontend or API info" },
            { "method": "GET", "path": "/health", "description": "Aggregated service health" },
            { "method": "GET", "path": "/health/simple", "description": "Liveness" },
            { "method": "GET", "path": "/metrics", "description": "Resource snapshot" },
            { "method": "GET", "path": "/docs", "description": "This catalogue" },
            { "method": "GET", "path": "/static/*", "description": "Frontend assets" },
        ],
        "middleware": PIPELINE,
        "services": services,
    }))
    .into_response()
}

async fn load_index(context: &AppContext) -> Option<String> {
    if !context.registry.is_available(STATIC_ASSETS) {
        return None;
    }
    tokio::fs::read_to_string(context.config.static_path().join(INDEX_FILE))
        .await
        .ok()
}

/// Base features plus one entry per enabled optional service
pub(crate) fn features(context: &AppContext) -> Vec<String> {
    let mut features: Vec<String> = BASE_FEATURES.iter().map(|f| f.to_string()).collect();
    features.extend(
        context
            .registry
            .enabled_services()
            .iter()
            .filter(|d| d.criticality() == Criticality::Optional)
            .map(|d| feature_label(d.name())),
    );
    features
}

fn feature_label(service: &str) -> String {
    match service {
        DATABASE => "Persistent Storage".to_string(),
        CACHE => "Response Caching".to_string(),
        STATIC_ASSETS => "Web Frontend".to_string(),
        REQUEST_TRACING => "Request Tracing".to_string(),
        other => other.to_string(),
    }
}
