//! Request correlation ids.
//!
//! Cloudflare and Fly.io may already send an `x-request-id`; it is reused when
//! it looks sane, otherwise a UUID v4 is minted. The id is written back into
//! the request headers so the trace span (built inside this layer) can pick
//! it up, tagged on the Sentry scope, and echoed on the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream id that is reused verbatim.
const MAX_UPSTREAM_LEN: usize = 128;

fn upstream_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_UPSTREAM_LEN)
        .filter(|id| id.chars().all(|c| c.is_ascii_graphic()))
        .map(String::from)
}

/// The id of a request that already passed through [`request_id_middleware`].
#[must_use]
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = upstream_id(request.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    let Ok(value) = HeaderValue::from_str(&id) else {
        return next.run(request).await;
    };

    request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &id));

    let mut response = next.run(request).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, value);
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|headers: HeaderMap| async move { request_id(&headers).to_string() }),
            )
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    async fn call(id: Option<&str>) -> (String, String) {
        let mut builder = Request::builder().uri("/");
        if let Some(id) = id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let echoed = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (echoed, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_upstream_id_reaches_handler_and_response() {
        let (echoed, seen) = call(Some("cf-1234")).await;
        assert_eq!(echoed, "cf-1234");
        assert_eq!(seen, "cf-1234");
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let (echoed, seen) = call(None).await;
        assert!(Uuid::parse_str(&echoed).is_ok());
        assert_eq!(echoed, seen);
    }

    #[tokio::test]
    async fn test_oversized_upstream_id_is_replaced() {
        let long = "x".repeat(MAX_UPSTREAM_LEN + 1);
        let (echoed, _) = call(Some(&long)).await;
        assert!(Uuid::parse_str(&echoed).is_ok());
    }
}
