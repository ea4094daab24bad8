//! Structured error bodies shared by every pipeline stage and handler.

use super::error_boundary::CorrelationId;
use axum::http::header::{HeaderName, RETRY_AFTER};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

/// A request refused before (or instead of) reaching a handler
#[derive(Debug, Clone)]
pub struct Rejection {
    status: StatusCode,
    kind: &'static str,
    message: String,
    error_id: Option<String>,
    retry_after_secs: Option<u64>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl Rejection {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            error_id: None,
            retry_after_secs: None,
            headers: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BadRequest", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFound", message)
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            "An internal server error occurred",
        )
    }

    /// Tie the body to the request's correlation id when one is known
    pub fn with_correlation(mut self, correlation: Option<&CorrelationId>) -> Self {
        self.error_id = correlation.map(|id| id.as_str().to_string());
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut error = json!({
            "message": self.message,
            "type": self.kind,
            "status_code": self.status.as_u16(),
            "timestamp": Utc::now().to_rfc3339(),
        });
        if let Some(error_id) = &self.error_id {
            error["error_id"] = json!(error_id);
        }
        if let Some(secs) = self.retry_after_secs {
            error["retry_after"] = json!(secs);
        }

        let mut response = (self.status, Json(json!({ "error": error }))).into_response();
        let headers = response.headers_mut();
        if let Some(secs) = self.retry_after_secs {
            headers.insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        for (name, value) in self.headers {
            headers.insert(name, value);
        }
        response
    }
}
