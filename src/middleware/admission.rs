use super::error_boundary::CorrelationId;
use super::rate_limiter::{InMemoryRateLimitStore, RateLimitStore};
use super::rejection::Rejection;
use super::tenant::TenantContext;
use crate::app::AppContext;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Paths never counted against a limit
const EXEMPT_PREFIXES: &[&str] = &["/health"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted {
        limit: u32,
        remaining: u32,
    },
    Rejected {
        limit: u32,
        retry_after: Duration,
    },
    /// The store failed; the request goes through unlimited
    Bypassed,
}

/// Applies the configured request limit through a [`RateLimitStore`]
pub struct AdmissionController {
    store: Arc<dyn RateLimitStore>,
    limit: u32,
    window: Duration,
    trusted_proxies: Vec<IpAddr>,
}

impl AdmissionController {
    pub fn new(store: Arc<dyn RateLimitStore>, limit: u32, window: Duration) -> Self {
        Self {
            store,
            limit,
            window,
            trusted_proxies: Vec::new(),
        }
    }

    pub fn in_memory(limit: u32, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryRateLimitStore::new()), limit, window)
    }

    /// Peers whose forwarding headers name the real client
    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Fails open: a store error admits the request
    pub async fn check(&self, key: &str) -> AdmissionDecision {
        match self.store.hit(key, self.limit, self.window).await {
            Ok(state) if state.admitted => AdmissionDecision::Admitted {
                limit: self.limit,
                remaining: self.limit.saturating_sub(state.count),
            },
            Ok(state) => AdmissionDecision::Rejected {
                limit: self.limit,
                retry_after: state.reset_after,
            },
            Err(e) => {
                warn!(key = %key, "Admission control bypassed: {}", e);
                AdmissionDecision::Bypassed
            }
        }
    }

    /// Count the request against every window it belongs to.
    ///
    /// Rejected as soon as one window is full. Windows whose store failed are
    /// skipped, so the request is only `Bypassed` when every store failed.
    pub fn check_request(
        &self,
        request: &Request,
    ) -> impl std::future::Future<Output = AdmissionDecision> + Send + '_ {
        // Keys are computed up front so the future does not borrow the
        // (non-`Sync`) request across await points
        let keys = admission_keys(request, &self.trusted_proxies);
        async move {
            let mut remaining: Option<u32> = None;

            for key in keys {
                match self.check(&key).await {
                    AdmissionDecision::Admitted {
                        remaining: left, ..
                    } => {
                        remaining = Some(remaining.map_or(left, |r| r.min(left)));
                    }
                    rejected @ AdmissionDecision::Rejected { .. } => {
                        debug!(key = %key, "Window full");
                        return rejected;
                    }
                    AdmissionDecision::Bypassed => {}
                }
            }

            match remaining {
                Some(remaining) => AdmissionDecision::Admitted {
                    limit: self.limit,
                    remaining,
                },
                None => AdmissionDecision::Bypassed,
            }
        }
    }
}

/// Count the request against its client and tenant windows and refuse it with 429 when over limit
pub async fn admit(State(context): State<AppContext>, request: Request, next: Next) -> Response {
    let exempt = EXEMPT_PREFIXES
        .iter()
        .any(|prefix| request.uri().path().starts_with(prefix));
    if exempt {
        return next.run(request).await;
    }

    match context.admission.check_request(&request).await {
        AdmissionDecision::Admitted { limit, remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
        AdmissionDecision::Rejected { limit, retry_after } => {
            context.counters.record_rejection();
            let retry_secs = retry_after_secs(retry_after);
            debug!(path = %request.uri().path(), "Rate limit exceeded, retry in {}s", retry_secs);

            Rejection::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded",
            )
            .with_correlation(request.extensions().get::<CorrelationId>())
            .with_retry_after(retry_secs)
            .with_header(LIMIT_HEADER, HeaderValue::from(limit))
            .with_header(REMAINING_HEADER, HeaderValue::from(0u32))
            .with_header(RESET_HEADER, HeaderValue::from(retry_secs))
            .into_response()
        }
        AdmissionDecision::Bypassed => next.run(request).await,
    }
}

/// Windows a request counts against: always its client, plus its tenant when
/// one other than the default was resolved
pub fn admission_keys(request: &Request, trusted_proxies: &[IpAddr]) -> Vec<String> {
    let mut keys = vec![format!("client:{}", client_ip(request, trusted_proxies))];
    if let Some(tenant) = request.extensions().get::<TenantContext>() {
        if !tenant.is_default() {
            keys.push(format!("tenant:{}", tenant.id));
        }
    }
    keys
}

/// Peer address, or the forwarded client when the peer is a trusted proxy
fn client_ip(request: &Request, trusted_proxies: &[IpAddr]) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    let Some(peer) = peer else {
        return "unknown".to_string();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
        .to_string()
}

/// Whole seconds, rounded up, never zero
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
