use super::*;
use crate::config::{AppConfig, TenantPolicy};
use crate::error::AppError;
use crate::registry::ServiceRegistry;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::extract::ConnectInfo;
use axum::{Extension, Router};
use serde_json::Value;
use std::net::SocketAddr;
use tower::ServiceExt;

fn context_with(config: AppConfig) -> AppContext {
    AppContext::new(config, ServiceRegistry::new())
}

async fn ok() -> &'static str {
    "ok"
}

async fn explode() -> &'static str {
    panic!("database password is hunter2")
}

async fn fail() -> Result<&'static str, AppError> {
    Err(AppError::system("connection string postgres://admin:secret@db"))
}

async fn echo(body: Bytes) -> String {
    body.len().to_string()
}

async fn tenant(Extension(tenant): Extension<TenantContext>) -> String {
    tenant.id
}

fn app(context: &AppContext) -> Router {
    let router = Router::new()
        .route("/ok", get(ok))
        .route("/panic", get(explode))
        .route("/fail", get(fail))
        .route("/tenant", get(tenant))
        .route("/echo", post(echo))
        .route("/health", get(ok));
    apply_pipeline(router, context)
}

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request_id(response: &Response) -> String {
    response
        .headers()
        .get(REQUEST_ID_HEADER)
        .expect("x-request-id header")
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_pipeline_order() {
    let names: Vec<_> = PIPELINE.iter().map(|s| s.name).collect();
    assert_eq!(names, ["error_boundary", "security", "tenant", "admission"]);
    assert!(PIPELINE.windows(2).all(|w| w[0].order < w[1].order));
}

#[tokio::test]
async fn test_successful_request_passes_every_stage() {
    let context = context_with(AppConfig::default());
    let response = send(app(&context), get_request("/ok")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key(REQUEST_ID_HEADER));
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers[TENANT_HEADER], "default");
    assert_eq!(headers["x-ratelimit-limit"], "60");
    assert_eq!(headers["x-ratelimit-remaining"], "59");
    assert_eq!(context.counters.total(), 1);
}

#[tokio::test]
async fn test_panicking_handler_becomes_generic_500() {
    let context = context_with(AppConfig::default());
    let response = send(app(&context), get_request("/panic")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let id = request_id(&response);
    let body = json_body(response).await;

    assert_eq!(body["error"]["type"], "InternalServerError");
    assert_eq!(body["error"]["status_code"], 500);
    assert_eq!(body["error"]["error_id"], id.as_str());
    assert!(!body.to_string().contains("hunter2"));
    assert_eq!(context.counters.failed(), 1);
}

#[tokio::test]
async fn test_handler_error_is_sanitized() {
    let context = context_with(AppConfig::default());
    let response = send(app(&context), get_request("/fail")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let id = request_id(&response);
    let body = json_body(response).await;

    assert_eq!(body["error"]["message"], "An internal server error occurred");
    assert_eq!(body["error"]["error_id"], id.as_str());
    assert!(!body.to_string().contains("secret"));
}

#[tokio::test]
async fn test_security_rejection_keeps_correlation_id() {
    let context = context_with(AppConfig::default());
    let response = send(app(&context), get_request("/ok?q=%3Cscript%3Ealert(1)")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let id = request_id(&response);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "SecurityError");
    assert_eq!(body["error"]["error_id"], id.as_str());
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let config = AppConfig {
        max_request_size: 16,
        ..AppConfig::default()
    };
    let context = context_with(config);
    let request = Request::builder()
        .uri("/ok")
        .header(header::CONTENT_LENGTH, "1024")
        .body(Body::empty())
        .unwrap();

    let response = send(app(&context), request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

fn streamed_post(len: usize) -> Request<Body> {
    let chunks = vec![
        Ok::<_, std::io::Error>(vec![b'a'; len / 2]),
        Ok::<_, std::io::Error>(vec![b'a'; len / 2]),
    ];
    Request::builder()
        .method("POST")
        .uri("/echo")
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap()
}

#[tokio::test]
async fn test_streamed_body_is_capped_without_content_length() {
    let config = AppConfig {
        max_request_size: 16,
        ..AppConfig::default()
    };
    let context = context_with(config);

    let request = streamed_post(64);
    assert!(request.headers().get(header::CONTENT_LENGTH).is_none());
    let response = send(app(&context), request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = send(app(&context), streamed_post(8)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"8");
}

#[tokio::test]
async fn test_untrusted_host_is_refused() {
    let config = AppConfig {
        allowed_hosts: vec!["api.example.com".to_string()],
        ..AppConfig::default()
    };
    let context = context_with(config);

    let request = Request::builder()
        .uri("/ok")
        .header(header::HOST, "evil.example.org")
        .body(Body::empty())
        .unwrap();
    let response = send(app(&context), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .uri("/ok")
        .header(header::HOST, "api.example.com:8000")
        .body(Body::empty())
        .unwrap();
    let response = send(app(&context), request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tenant_reaches_handler() {
    let context = context_with(AppConfig::default());
    let request = Request::builder()
        .uri("/tenant")
        .header(TENANT_HEADER, "acme")
        .body(Body::empty())
        .unwrap();

    let response = send(app(&context), request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[TENANT_HEADER], "acme");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"acme");
}

#[tokio::test]
async fn test_reject_policy_requires_tenant() {
    let config = AppConfig {
        tenant_policy: TenantPolicy::Reject,
        ..AppConfig::default()
    };
    let context = context_with(config);

    let response = send(app(&context), get_request("/ok")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));

    // Health checks are outside tenancy
    let response = send(app(&context), get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_tenant_is_refused() {
    let context = context_with(AppConfig::default());
    let request = Request::builder()
        .uri("/ok")
        .header(TENANT_HEADER, "../etc")
        .body(Body::empty())
        .unwrap();

    let response = send(app(&context), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_rejects_after_limit() {
    let config = AppConfig {
        rate_limit_requests: 2,
        ..AppConfig::default()
    };
    let context = context_with(config);
    let router = app(&context);

    for _ in 0..2 {
        let response = send(router.clone(), get_request("/ok")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(router.clone(), get_request("/ok")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    assert_eq!(context.counters.rejected(), 1);

    // Health stays reachable
    let response = send(router, get_request("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn from_peer(peer: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri("/ok");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    let addr: SocketAddr = format!("{}:50000", peer).parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn limited_to_one(trusted_proxies: Vec<String>) -> AppContext {
    context_with(AppConfig {
        rate_limit_requests: 1,
        trusted_proxies,
        ..AppConfig::default()
    })
}

#[tokio::test]
async fn test_tenants_share_their_window_across_clients() {
    let context = limited_to_one(Vec::new());
    let router = app(&context);

    let acme = |peer| from_peer(peer, &[(TENANT_HEADER, "acme")]);
    assert_eq!(send(router.clone(), acme("192.0.2.1")).await.status(), StatusCode::OK);
    assert_eq!(
        send(router.clone(), acme("192.0.2.2")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    let globex = from_peer("192.0.2.3", &[(TENANT_HEADER, "globex")]);
    assert_eq!(send(router, globex).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_headers_do_not_reset_the_window() {
    let context = limited_to_one(Vec::new());
    let router = app(&context);

    let first = from_peer("192.0.2.7", &[]);
    assert_eq!(send(router.clone(), first).await.status(), StatusCode::OK);

    let mut admitted = 0;
    for n in 0..20 {
        let forwarded = format!("203.0.113.{}", n);
        let tenant = format!("tenant-{}", n);
        let rotated = [
            ("x-forwarded-for", forwarded.as_str()),
            ("x-real-ip", forwarded.as_str()),
            (TENANT_HEADER, tenant.as_str()),
        ];
        let response = send(router.clone(), from_peer("192.0.2.7", &rotated)).await;
        if response.status() == StatusCode::OK {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 0);
    assert_eq!(context.counters.rejected(), 20);
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_identity() {
    let context = limited_to_one(vec!["10.0.0.1".to_string()]);
    let router = app(&context);

    let via_proxy = |client: &str| from_peer("10.0.0.1", &[("x-forwarded-for", client)]);
    assert_eq!(
        send(router.clone(), via_proxy("203.0.113.1")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(router.clone(), via_proxy("203.0.113.2")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(router, via_proxy("203.0.113.1")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}
