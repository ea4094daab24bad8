use super::handlers;
use crate::app::AppContext;
use crate::config::AppConfig;
use crate::middleware::{self, REQUEST_ID_HEADER, TENANT_HEADER};
use crate::services::{REQUEST_TRACING, STATIC_ASSETS};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Assemble routes, the request pipeline and transport layers
pub fn build_router(context: AppContext) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/health/simple", get(handlers::simple_health))
        .route("/metrics", get(handlers::metrics));

    if context.config.debug {
        router = router.route("/docs", get(handlers::docs));
    }

    if context.registry.is_available(STATIC_ASSETS) {
        let dir = context.config.static_path();
        info!("Serving static assets from {} at /static", dir.display());
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    let router = router
        .fallback(handlers::spa_fallback)
        .with_state(context.clone());

    let router = middleware::apply_pipeline(router, &context).layer(cors_layer(&context.config));

    if context.registry.is_available(REQUEST_TRACING) {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// CORS from ALLOWED_ORIGINS; credentials only with an explicit origin list
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let exposed = [
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderName::from_static(TENANT_HEADER),
    ];

    if config.allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers(exposed)
}
