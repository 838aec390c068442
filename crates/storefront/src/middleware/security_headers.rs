//! Response hardening headers, including a per-request Content Security Policy.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;

/// Origins the GA4 and Meta pixel snippets load from and report to.
const ANALYTICS_SCRIPT_SRC: &str = "https://www.googletagmanager.com https://connect.facebook.net";
const ANALYTICS_CONNECT_SRC: &str =
    "https://www.google-analytics.com https://*.google-analytics.com https://www.facebook.com";

/// Same on every response. `credentialless` because the Shopify CDN sends no
/// `Cross-Origin-Resource-Policy`.
const STATIC_HEADERS: [(&str, &str); 6] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "accelerometer=(), autoplay=(self), camera=(), display-capture=(), geolocation=(), \
         gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=()",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-embedder-policy", "credentialless"),
];

/// The policy for one response.
///
/// Product images and the hero video come from `cdn.shopify.com`; checkout
/// forms post to the shop's `myshopify.com` domain.
#[must_use]
pub fn content_security_policy(nonce: Option<&CspNonce>) -> String {
    let script_src = match nonce {
        Some(nonce) => format!("'self' {} {ANALYTICS_SCRIPT_SRC}", nonce.source()),
        None => format!("'self' {ANALYTICS_SCRIPT_SRC}"),
    };

    [
        "default-src 'none'".to_string(),
        format!("script-src {script_src}"),
        "style-src 'self'".to_string(),
        "font-src 'self'".to_string(),
        "img-src 'self' data: https://cdn.shopify.com https://www.facebook.com".to_string(),
        "media-src 'self' https://cdn.shopify.com".to_string(),
        format!("connect-src 'self' {ANALYTICS_CONNECT_SRC}"),
        "frame-src 'none'".to_string(),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self' https://*.myshopify.com".to_string(),
        "frame-ancestors 'none'".to_string(),
        "upgrade-insecure-requests".to_string(),
    ]
    .join("; ")
}

/// Stamp [`STATIC_HEADERS`] and the nonce-bearing CSP onto every response.
///
/// Must run inside `csp_nonce_middleware`.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let policy = content_security_policy(request.extensions().get::<CspNonce>());

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in STATIC_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    match HeaderValue::from_str(&policy) {
        Ok(value) => {
            headers.insert(header::CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Content-Security-Policy is not a valid header"),
    }

    response
}
