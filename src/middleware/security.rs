use super::error_boundary::CorrelationId;
use super::rejection::Rejection;
use crate::app::AppContext;
use crate::config::AppConfig;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, HOST};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::{debug, warn};

const QUERY_MARKERS: &[&str] = &[
    "<script",
    "javascript:",
    "<iframe",
    "<object",
    "onerror=",
    "onload=",
    "union select",
    "drop table",
    "' or '1'='1",
    "\" or \"1\"=\"1",
];

/// Proxy override headers dropped before routing
const STRIPPED_HEADERS: &[&str] = &["x-original-url", "x-rewrite-url"];

const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    (
        "strict-transport-security",
        "max-age=31536000; includeSubDomains",
    ),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data: https:",
    ),
    (
        "permissions-policy",
        "geolocation=(), microphone=(), camera=()",
    ),
];

/// Reasons a request is refused before reaching tenancy or admission
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Path traversal attempt detected")]
    PathTraversal,

    #[error("Suspicious query parameter detected")]
    SuspiciousQuery { marker: &'static str },

    #[error("Request body of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Invalid Content-Length header")]
    InvalidContentLength,

    #[error("Host header missing")]
    MissingHost,

    #[error("Host '{host}' is not allowed")]
    UntrustedHost { host: String },
}

impl Violation {
    fn into_rejection(self, correlation: Option<&CorrelationId>) -> Rejection {
        let (status, kind) = match &self {
            Violation::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "PayloadTooLarge"),
            Violation::PathTraversal | Violation::SuspiciousQuery { .. } => {
                (StatusCode::BAD_REQUEST, "SecurityError")
            }
            _ => (StatusCode::BAD_REQUEST, "BadRequest"),
        };
        Rejection::new(status, kind, self.to_string()).with_correlation(correlation)
    }
}

/// Validate and normalize the request, then stamp security headers on the response
pub async fn enforce(
    State(context): State<AppContext>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Err(violation) = inspect(&request, &context.config) {
        let correlation = request.extensions().get::<CorrelationId>();
        warn!(
            request_id = %correlation.map(CorrelationId::as_str).unwrap_or("-"),
            path = %request.uri().path(),
            "Security violation: {}",
            violation
        );
        return violation.into_rejection(correlation).into_response();
    }

    normalize_headers(request.headers_mut());

    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}

/// Checks in order: path, query, body size, host
pub fn inspect(request: &Request, config: &AppConfig) -> Result<(), Violation> {
    let uri = request.uri();
    if is_traversal(uri.path()) {
        return Err(Violation::PathTraversal);
    }

    if let Some(query) = uri.query() {
        check_query(query)?;
    }

    check_content_length(request.headers(), config.max_request_size)?;

    if config.enforces_trusted_hosts() {
        check_host(request, &config.allowed_hosts)?;
    }

    Ok(())
}

fn check_query(query: &str) -> Result<(), Violation> {
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        for text in [key.to_lowercase(), value.to_lowercase()] {
            if is_traversal(&text) {
                return Err(Violation::PathTraversal);
            }
            if let Some(marker) = QUERY_MARKERS.iter().copied().find(|m| text.contains(m)) {
                return Err(Violation::SuspiciousQuery { marker });
            }
        }
    }
    Ok(())
}

/// A `..` segment after undoing up to two rounds of percent-encoding,
/// with a backslash treated as a separator
fn is_traversal(raw: &str) -> bool {
    let once = percent_decode_str(raw).decode_utf8_lossy();
    let twice = percent_decode_str(&once).decode_utf8_lossy();

    [raw, once.as_ref(), twice.as_ref()]
        .iter()
        .any(|text| text.split(['/', '\\']).any(|segment| segment == ".."))
}

fn check_content_length(headers: &HeaderMap, limit: u64) -> Result<(), Violation> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(());
    };
    let size = value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or(Violation::InvalidContentLength)?;

    if size > limit {
        return Err(Violation::PayloadTooLarge { size, limit });
    }
    Ok(())
}

fn check_host(request: &Request, allowed: &[String]) -> Result<(), Violation> {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().host())
        .ok_or(Violation::MissingHost)?;

    let hostname = strip_port(host).to_ascii_lowercase();
    if allowed.iter().any(|pattern| host_matches(pattern, &hostname)) {
        Ok(())
    } else {
        Err(Violation::UntrustedHost {
            host: hostname,
        })
    }
}

pub(crate) fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal
        return rest.split(']').next().unwrap_or(rest);
    }
    host.rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map(|(name, _)| name)
        .unwrap_or(host)
}

/// `*` matches anything, `*.example.com` matches any subdomain of example.com
fn host_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    if pattern == "*" {
        return true;
    }
    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .strip_suffix(suffix)
            .is_some_and(|prefix| prefix.ends_with('.')),
        None => pattern == host,
    }
}

fn normalize_headers(headers: &mut HeaderMap) {
    for name in STRIPPED_HEADERS {
        if headers.remove(*name).is_some() {
            debug!("Dropped proxy override header {}", name);
        }
    }
}

pub fn apply_security_headers(headers: &mut HeaderMap) {
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, host: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header(HOST, host)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_path_traversal_is_rejected() {
        let config = AppConfig::default();
        for uri in [
            "/static/../etc/passwd",
            "/static/%2E%2E%2Fsecret",
            "/a/%2e%2e/b",
            "/static/..%2fetc/passwd",
            "/static/..%5cwindows",
            "/static/%2e%2e%5cwindows",
            "/static/%252e%252e%252fsecret",
            "/static/..",
        ] {
            assert_eq!(
                inspect(&request(uri, "localhost"), &config),
                Err(Violation::PathTraversal),
                "{}",
                uri
            );
        }
    }

    #[test]
    fn test_dotted_names_are_not_traversal() {
        let config = AppConfig::default();
        for uri in ["/static/app..js", "/docs/v1.2/index", "/static/...", "/a/%2e/b"] {
            assert!(inspect(&request(uri, "localhost"), &config).is_ok(), "{}", uri);
        }
        let req = request("/search?path=..%2Fetc%2Fpasswd", "localhost");
        assert_eq!(inspect(&req, &config), Err(Violation::PathTraversal));
    }

    #[test]
    fn test_suspicious_query_is_rejected() {
        let config = AppConfig::default();
        let req = request("/search?q=%3Cscript%3Ealert(1)%3C%2Fscript%3E", "localhost");

        assert!(matches!(
            inspect(&req, &config),
            Err(Violation::SuspiciousQuery { marker: "<script" })
        ));

        let clean = request("/search?q=hello+world&page=2", "localhost");
        assert!(inspect(&clean, &config).is_ok());
    }

    #[test]
    fn test_oversized_body_is_rejected() {
        let config = AppConfig {
            max_request_size: 10,
            ..AppConfig::default()
        };
        let req = Request::builder()
            .uri("/upload")
            .header(CONTENT_LENGTH, "11")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            inspect(&req, &config),
            Err(Violation::PayloadTooLarge { size: 11, limit: 10 })
        );
        assert_eq!(
            Violation::PayloadTooLarge { size: 11, limit: 10 }
                .into_rejection(None)
                .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_trusted_hosts() {
        let config = AppConfig {
            debug: false,
            allowed_hosts: vec!["api.example.com".to_string(), "*.example.org".to_string()],
            ..AppConfig::default()
        };

        assert!(inspect(&request("/", "api.example.com:8000"), &config).is_ok());
        assert!(inspect(&request("/", "tenant.example.org"), &config).is_ok());
        assert!(matches!(
            inspect(&request("/", "example.org"), &config),
            Err(Violation::UntrustedHost { .. })
        ));
        assert!(matches!(
            inspect(&request("/", "evil.com"), &config),
            Err(Violation::UntrustedHost { .. })
        ));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8000"), "::1");
    }

    #[test]
    fn test_security_headers_applied() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers);

        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.len(), SECURITY_HEADERS.len());
    }
}
