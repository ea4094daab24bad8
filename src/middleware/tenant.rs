use super::error_boundary::CorrelationId;
use super::rejection::Rejection;
use super::security::strip_port;
use crate::app::AppContext;
use crate::config::TenantPolicy;
use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::IpAddr;
use tracing::{debug, warn};

pub const TENANT_HEADER: &str = "x-tenant-id";

const SKIP_PREFIXES: &[&str] = &[
    "/docs",
    "/redoc",
    "/openapi.json",
    "/health",
    "/metrics",
    "/static",
];

const MAX_TENANT_LEN: usize = 63;

/// Where the tenant id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantSource {
    Subdomain,
    Header,
    Path,
    Default,
}

/// Tenant attached to the request for downstream stages and handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub id: String,
    pub source: TenantSource,
}

impl TenantContext {
    pub fn is_default(&self) -> bool {
        self.source == TenantSource::Default
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(TenantContext),
    Missing,
    Invalid(String),
}

/// Attach a [`TenantContext`] or refuse the request per the configured policy
pub async fn resolve(
    State(context): State<AppContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if SKIP_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(request).await;
    }

    let tenant = match resolve_tenant(&request) {
        Resolution::Resolved(tenant) => tenant,
        Resolution::Invalid(raw) => {
            warn!("Rejecting request with invalid tenant id '{}'", raw);
            return reject(&request, "Invalid tenant identifier");
        }
        Resolution::Missing => match context.config.tenant_policy {
            TenantPolicy::Fallback => TenantContext {
                id: context.config.default_tenant.clone(),
                source: TenantSource::Default,
            },
            TenantPolicy::Reject => {
                debug!("No tenant context on {}", path);
                return reject(&request, "Tenant context required");
            }
        },
    };

    debug!("Resolved tenant '{}' from {:?}", tenant.id, tenant.source);
    let header = HeaderValue::from_str(&tenant.id).ok();
    request.extensions_mut().insert(tenant);

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(TENANT_HEADER, value);
    }
    response
}

fn reject(request: &Request, message: &str) -> Response {
    Rejection::bad_request(message)
        .with_correlation(request.extensions().get::<CorrelationId>())
        .into_response()
}

/// Subdomain first, then the tenant header, then `/chat/{tenant}/...`
pub fn resolve_tenant(request: &Request) -> Resolution {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(strip_port);
    if let Some(subdomain) = host.and_then(subdomain_of) {
        return validated(subdomain, TenantSource::Subdomain);
    }

    if let Some(value) = request.headers().get(TENANT_HEADER) {
        return match value.to_str() {
            Ok(raw) => validated(raw.trim(), TenantSource::Header),
            Err(_) => Resolution::Invalid("<non-ascii>".to_string()),
        };
    }

    let mut segments = request.uri().path().trim_start_matches('/').split('/');
    if let (Some("chat"), Some(tenant), Some(_)) = (segments.next(), segments.next(), segments.next()) {
        if !tenant.is_empty() {
            return validated(tenant, TenantSource::Path);
        }
    }

    Resolution::Missing
}

/// Leftmost label of a host with at least three labels, excluding `www` and IPs
fn subdomain_of(host: &str) -> Option<&str> {
    if host.parse::<IpAddr>().is_ok() {
        return None;
    }
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 3 {
        return None;
    }
    match labels[0] {
        "" | "www" => None,
        label => Some(label),
    }
}

fn validated(raw: &str, source: TenantSource) -> Resolution {
    let valid = !raw.is_empty()
        && raw.len() <= MAX_TENANT_LEN
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Resolution::Resolved(TenantContext {
            id: raw.to_string(),
            source,
        })
    } else {
        Resolution::Invalid(raw.chars().take(MAX_TENANT_LEN).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, host: &str, tenant: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri).header(HOST, host);
        if let Some(tenant) = tenant {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn resolved(resolution: Resolution) -> TenantContext {
        match resolution {
            Resolution::Resolved(tenant) => tenant,
            other => panic!("expected a tenant, got {:?}", other),
        }
    }

    #[test]
    fn test_subdomain_takes_precedence() {
        let req = request("/api/chat", "acme.chat.example.com", Some("other"));

        let tenant = resolved(resolve_tenant(&req));
        assert_eq!(tenant.id, "acme");
        assert_eq!(tenant.source, TenantSource::Subdomain);
    }

    #[test]
    fn test_header_tenant() {
        let req = request("/api/chat", "localhost:8000", Some("globex"));

        let tenant = resolved(resolve_tenant(&req));
        assert_eq!(tenant.id, "globex");
        assert_eq!(tenant.source, TenantSource::Header);
    }

    #[test]
    fn test_path_tenant() {
        let req = request("/chat/initech/widget", "127.0.0.1:8000", None);

        let tenant = resolved(resolve_tenant(&req));
        assert_eq!(tenant.id, "initech");
        assert_eq!(tenant.source, TenantSource::Path);

        // `/chat/{tenant}` alone is not enough
        let req = request("/chat/initech", "localhost", None);
        assert_eq!(resolve_tenant(&req), Resolution::Missing);
    }

    #[test]
    fn test_plain_hosts_have_no_subdomain() {
        for host in ["localhost", "example.com", "www.example.com", "10.0.0.12"] {
            assert_eq!(subdomain_of(host), None, "{}", host);
        }
    }

    #[test]
    fn test_invalid_tenant_ids() {
        let req = request("/api/chat", "localhost", Some("acme;drop"));
        assert!(matches!(
            resolve_tenant(&req),
            Resolution::Invalid(_)
        ));

        let long = "a".repeat(MAX_TENANT_LEN + 1);
        let req = request("/api/chat", "localhost", Some(&long));
        assert!(matches!(
            resolve_tenant(&req),
            Resolution::Invalid(_)
        ));
    }
}
