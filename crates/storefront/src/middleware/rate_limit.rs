//! Per-client rate limits for the routes that call Shopify on every request.
//!
//! | Layer                          | Routes                                  | Refill   | Burst |
//! |--------------------------------|-----------------------------------------|----------|-------|
//! | [`auth_rate_limiter`]          | `POST /account/login`, `/register`      | 1 per 6s | 5     |
//! | [`cart_rate_limiter`]          | `POST /cart/*`                          | 1 per 1s | 50    |
//! | [`consultation_rate_limiter`]  | `POST /consultation/*`                  | 1 per 1s | 30    |

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Headers carrying the client address, most trusted first. Cloudflare sits
/// in front of Fly.io, so its header wins.
const CLIENT_IP_HEADERS: [&str; 4] = [
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-real-ip",
    "fly-client-ip",
];

/// The client address from proxy headers. `X-Forwarded-For` contributes its
/// first hop only.
fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
    })
}

/// Keys requests by the client address the edge proxies report, or by the
/// socket peer when no proxy is in front (local development).
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req.headers())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(peer)| peer.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// # Panics
///
/// Panics if `refill_seconds` or `burst` is zero; every caller passes constants.
#[allow(clippy::expect_used)]
fn limiter(refill_seconds: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(refill_seconds)
        .burst_size(burst)
        .finish()
        .expect("rate limiter periods and bursts are non-zero constants");
    GovernorLayer::new(Arc::new(config))
}

/// Login and registration: about ten attempts a minute.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(6, 5)
}

/// Cart mutations. Quantity steppers fire in bursts.
#[must_use]
pub fn cart_rate_limiter() -> RateLimiterLayer {
    limiter(1, 50)
}

/// Consultation posts. Choice cards save on every click.
#[must_use]
pub fn consultation_rate_limiter() -> RateLimiterLayer {
    limiter(1, 30)
}
