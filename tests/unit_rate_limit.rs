mod common;

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use common::{lazy_pool, test_state};
use registrar::registrar_config::RateLimitConfig;
use registrar::router::init_router;
use tower::ServiceExt;

fn limited_app(trust_forwarded_headers: bool) -> axum::Router {
    let config = RateLimitConfig {
        enabled: true,
        public_per_second: 1,
        public_burst_size: 1,
        trust_forwarded_headers,
    };
    init_router(test_state(lazy_pool(), config))
}

fn strict_app() -> axum::Router {
    limited_app(false)
}

/// Attaches the peer address `axum::serve` would record for the connection.
fn from_peer(mut request: Request<Body>, peer_ip: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{}:40000", peer_ip).parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

/// An invalid body is rejected by validation, so no query ever runs.
fn login_request(peer_ip: &str) -> Request<Body> {
    login_request_forwarded(peer_ip, "192.0.2.200")
}

fn login_request_forwarded(peer_ip: &str, forwarded_for: &str) -> Request<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(r#"{"email":"not-an-email","password":"x"}"#))
        .unwrap();
    from_peer(request, peer_ip)
}

fn admission_request(peer_ip: &str) -> Request<Body> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/admissions")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    from_peer(request, peer_ip)
}

#[tokio::test]
async fn test_login_is_limited_per_client() {
    let app = strict_app();

    let first = app.clone().oneshot(login_request("198.51.100.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let second = app.clone().oneshot(login_request("198.51.100.1")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = app.oneshot(login_request("198.51.100.2")).await.unwrap();
    assert_eq!(other_client.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_escape_the_limit() {
    let app = strict_app();

    let mut statuses = Vec::new();
    for i in 0..20 {
        let response = app
            .clone()
            .oneshot(login_request_forwarded("198.51.100.50", &format!("10.9.9.{}", i)))
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(statuses[0], StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        statuses[1..]
            .iter()
            .all(|s| *s == StatusCode::TOO_MANY_REQUESTS)
    );
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_forwarded_client() {
    let app = limited_app(true);
    let proxy = "10.0.0.1";

    let first = app
        .clone()
        .oneshot(login_request_forwarded(proxy, "198.51.100.60"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let repeat = app
        .clone()
        .oneshot(login_request_forwarded(proxy, "198.51.100.60"))
        .await
        .unwrap();
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = app
        .oneshot(login_request_forwarded(proxy, "198.51.100.61"))
        .await
        .unwrap();
    assert_eq!(other_client.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_public_admission_intake_shares_the_limiter() {
    let app = strict_app();

    let first = app.clone().oneshot(admission_request("198.51.100.9")).await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = app.clone().oneshot(login_request("198.51.100.9")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_authenticated_routes_are_not_limited() {
    let app = strict_app();

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(
                from_peer(
                    Request::builder()
                        .uri("/api/admissions")
                        .body(Body::empty())
                        .unwrap(),
                    "198.51.100.20",
                ),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_disabled_limiter_lets_bursts_through() {
    let app = init_router(test_state(lazy_pool(), RateLimitConfig::disabled()));

    for _ in 0..5 {
        let response = app.clone().oneshot(login_request("198.51.100.30")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
