use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::app::LifecycleState;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("HTTP server error: {0}")]
    Server(#[from] ServerError),

    #[error("Invalid lifecycle transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("System error: {message}")]
    System { message: String },
}

impl AppError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Service registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Service '{name}' is already registered")]
    DuplicateService { name: String },

    #[error("Cannot register '{name}': capability probing has already completed")]
    Sealed { name: String },

    #[error("Capability probing has not run yet")]
    NotProbed,
}

/// HTTP listener errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server failed: {details}")]
    ServeFailed { details: String },
}

/// Error raised by a managed subsystem from one of its lifecycle hooks or probes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub message: String,
}

impl ServiceError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Admission control backend errors
#[derive(Error, Debug, Clone)]
pub enum AdmissionError {
    #[error("Rate limit backend unavailable: {details}")]
    BackendUnavailable { details: String },
}

/// Resource reading errors, reported per metrics field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("{resource} reading unavailable: {details}")]
    Unavailable {
        resource: &'static str,
        details: String,
    },
}

impl MetricsError {
    pub fn unavailable<S: Into<String>>(resource: &'static str, details: S) -> Self {
        Self::Unavailable {
            resource,
            details: details.into(),
        }
    }
}

/// Marker attached to responses that carry an internal failure.
///
/// The error boundary replaces the body of any response carrying this
/// extension and logs `detail` against the request's correlation id.
#[derive(Debug, Clone)]
pub struct UnhandledError {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(UnhandledError {
            detail: self.to_string(),
        });
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_is_flagged_unhandled() {
        let response = AppError::system("database pool poisoned").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let marker = response.extensions().get::<UnhandledError>().unwrap();
        assert!(marker.detail.contains("database pool poisoned"));
    }

    #[test]
    fn test_registry_error_messages() {
        let err = RegistryError::DuplicateService {
            name: "cache".to_string(),
        };
        assert_eq!(err.to_string(), "Service 'cache' is already registered");

        let err: AppError = RegistryError::NotProbed.into();
        assert!(err.to_string().starts_with("Registry error"));
    }
}
