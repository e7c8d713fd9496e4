//! Per-IP rate limiting for unauthenticated endpoints.
//!
//! The client key is the socket address the server saw. `X-Forwarded-For`
//! (first hop) and `X-Real-IP` are only consulted when
//! `RATE_LIMIT_TRUST_PROXY` is set, since clients can put anything there.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use registrar_core::AppError;

use crate::state::{AppState, PublicRateLimiter};

pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded: bool,
) -> String {
    if trust_forwarded {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded.or(real_ip) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_else(|| "unknown".to_string())
}

pub async fn public_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.rate_limit_config.enabled {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(
        req.headers(),
        peer,
        state.rate_limit_config.trust_forwarded_headers,
    );

    if state.public_limiter.check_key(&key).is_err() {
        warn!(client = %key, path = %req.uri().path(), "Rate limit exceeded");
        crate::metrics::track_rate_limited();
        return AppError::too_many_requests("Too many requests, please slow down".to_string())
            .into_response();
    }

    next.run(req).await
}

/// Periodically drops buckets that have refilled, keeping the keyed map bounded.
pub fn spawn_limiter_cleanup(
    limiter: Arc<PublicRateLimiter>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(tracked_clients = limiter.len(), "Rate limiter cleaned up");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        headers
    }

    #[test]
    fn test_untrusted_headers_are_ignored() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(client_key(&forwarded_headers(), Some(peer), false), "192.0.2.1");
        assert_eq!(client_key(&forwarded_headers(), None, false), "unknown");
    }

    #[test]
    fn test_trusted_proxy_uses_first_forwarded_hop() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(client_key(&forwarded_headers(), Some(peer), true), "203.0.113.7");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(client_key(&headers, Some(peer), true), "198.51.100.4");

        assert_eq!(client_key(&HeaderMap::new(), Some(peer), true), "192.0.2.1");
    }

    #[tokio::test]
    async fn test_cleanup_drops_refilled_buckets() {
        use governor::Quota;
        use std::num::NonZeroU32;

        let quota = Quota::with_period(Duration::from_millis(10))
            .unwrap()
            .allow_burst(NonZeroU32::MIN);
        let limiter = Arc::new(PublicRateLimiter::keyed(quota));
        for i in 0..5 {
            let _ = limiter.check_key(&format!("10.0.0.{}", i));
        }
        assert_eq!(limiter.len(), 5);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let handle = spawn_limiter_cleanup(limiter.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.abort();

        assert_eq!(limiter.len(), 0);
    }
}
