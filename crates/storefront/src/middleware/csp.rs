//! Per-request nonce for the few inline scripts the storefront serves.
//!
//! The only inline scripts are the GA4 and Meta pixel bootstraps in
//! `base.html`. Everything else (HTMX, cart drawer, wizard gating) lives in
//! `/static/js`, so the policy never needs `'unsafe-inline'`.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;

/// Base64 of 16 random bytes, as `<script nonce="…">` expects.
#[derive(Clone, Debug)]
pub struct CspNonce(pub String);

impl CspNonce {
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// `'nonce-…'` for the `script-src` directive.
    #[must_use]
    pub fn source(&self) -> String {
        format!("'nonce-{}'", self.0)
    }
}

/// Attach a fresh [`CspNonce`] to the request.
///
/// Sits outside `security_headers_middleware`, which reads the nonce back
/// when it writes the policy.
pub async fn csp_nonce_middleware(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(CspNonce::generate());
    next.run(request).await
}

/// Handlers take the nonce as an argument and pass it to their template.
///
/// Without the middleware the nonce is empty, so the analytics scripts are
/// blocked while the page still renders.
impl<S> FromRequestParts<S> for CspNonce
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(nonce) = parts.extensions.get::<Self>() {
            return Ok(nonce.clone());
        }
        tracing::warn!("No CSP nonce on request; is csp_nonce_middleware installed?");
        Ok(Self(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_fresh_and_16_bytes() {
        let first = CspNonce::generate();
        let second = CspNonce::generate();
        assert_ne!(first.0, second.0);
        assert_eq!(STANDARD.decode(&first.0).map(|b| b.len()).ok(), Some(16));
    }

    #[test]
    fn test_source_expression() {
        let nonce = CspNonce("abc=".to_string());
        assert_eq!(nonce.source(), "'nonce-abc='");
    }

    #[tokio::test]
    async fn test_missing_middleware_yields_empty_nonce() {
        let (mut parts, ()) = axum::http::Request::new(()).into_parts();
        let nonce = CspNonce::from_request_parts(&mut parts, &()).await;
        assert!(nonce.is_ok_and(|n| n.0.is_empty()));
    }
}
