use super::rejection::Rejection;
use crate::app::AppContext;
use crate::error::{panic_message, UnhandledError};
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request id, logged with every failure and returned as `error_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outermost stage: converts any escaped failure into a generic 500.
///
/// Panics and responses flagged with [`UnhandledError`] are logged with full
/// detail; the client only sees the correlation id.
pub async fn catch_failures(
    State(context): State<AppContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let correlation_id = CorrelationId::new();
    request.extensions_mut().insert(correlation_id.clone());
    context.counters.record_request();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user_agent = request
        .headers()
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let span = info_span!("request", request_id = %correlation_id, %method, %path);
    let outcome = AssertUnwindSafe(next.run(request))
        .catch_unwind()
        .instrument(span)
        .await;

    let mut response = match outcome {
        Ok(response) => match response.extensions().get::<UnhandledError>() {
            Some(unhandled) => {
                error!(
                    request_id = %correlation_id,
                    %method,
                    %path,
                    user_agent = %user_agent,
                    detail = %unhandled.detail,
                    "Unhandled request error"
                );
                internal_error(&correlation_id)
            }
            None => response,
        },
        Err(panic) => {
            error!(
                request_id = %correlation_id,
                %method,
                %path,
                user_agent = %user_agent,
                panic = %panic_message(panic.as_ref()),
                "Request handler panicked"
            );
            internal_error(&correlation_id)
        }
    };

    if response.status().is_server_error() {
        context.counters.record_failure();
    }
    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn internal_error(correlation_id: &CorrelationId) -> Response {
    Rejection::internal()
        .with_correlation(Some(correlation_id))
        .into_response()
}
