//! # Request Middleware Pipeline
//!
//! Fixed chain wrapped around every route, outermost first:
//! 1. Error boundary (correlation id, failure containment)
//! 2. Security (request validation, response headers)
//! 3. Tenant resolution
//! 4. Admission control (rate limiting)
//!
//! Each stage is an axum `from_fn` middleware. `Next` is consumed by
//! `run`, so a stage can call the rest of the chain at most once.

mod admission;
mod error_boundary;
mod rate_limiter;
mod rejection;
mod security;
mod tenant;

#[cfg(test)]
mod tests;

pub use admission::{admission_keys, AdmissionController, AdmissionDecision};
pub use error_boundary::{CorrelationId, REQUEST_ID_HEADER};
pub use rate_limiter::{InMemoryRateLimitStore, RateLimitStore, WindowState};
pub use rejection::Rejection;
pub use security::{apply_security_headers, Violation};
pub use tenant::{TenantContext, TenantSource, TENANT_HEADER};

use crate::app::AppContext;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::debug;

/// One entry of the pipeline, as reported by `/docs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineStage {
    pub name: &'static str,
    pub order: usize,
}

/// Canonical stage order, outermost first
pub const PIPELINE: [PipelineStage; 4] = [
    PipelineStage {
        name: "error_boundary",
        order: 0,
    },
    PipelineStage {
        name: "security",
        order: 1,
    },
    PipelineStage {
        name: "tenant",
        order: 2,
    },
    PipelineStage {
        name: "admission",
        order: 3,
    },
];

/// Wrap every route (and the fallback) of `router` in the pipeline
pub fn apply_pipeline(router: Router, context: &AppContext) -> Router {
    for stage in &PIPELINE {
        debug!("Installing middleware stage {} ({})", stage.order, stage.name);
    }

    // Bodies without Content-Length are capped while they stream in
    let body_limit = usize::try_from(context.config.max_request_size).unwrap_or(usize::MAX);
    let router = router
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable());

    // ServiceBuilder runs layers top to bottom, so the first one is outermost
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn_with_state(
                context.clone(),
                error_boundary::catch_failures,
            ))
            .layer(from_fn_with_state(context.clone(), security::enforce))
            .layer(from_fn_with_state(context.clone(), tenant::resolve))
            .layer(from_fn_with_state(context.clone(), admission::admit)),
    )
}
