//! Handler errors and their HTTP rendering.
//!
//! Handlers return [`Result`]. Upstream and session failures are reported to
//! Sentry once, here, and reach the visitor as a short plain-text message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::CartSyncError;
use crate::shopify::ShopifyError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("Cart error: {0}")]
    CartSync(#[from] CartSyncError),

    /// Shown to the visitor verbatim with a 422.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Failures on our side or Shopify's, as opposed to bad input.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Session(_) | Self::Shopify(_) => true,
            Self::CartSync(err) => !err.is_not_found() && !matches!(err, CartSyncError::Invalid(_)),
            Self::Validation(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Shopify(ShopifyError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Shopify(ShopifyError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::CartSync(CartSyncError::Invalid(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::CartSync(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::CartSync(CartSyncError::Settle(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CartSync(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Body text. Session internals never leave the server.
    fn public_message(&self) -> String {
        match self {
            Self::Session(_) => "Internal server error".to_string(),
            Self::Shopify(err) => err.display_message(),
            Self::CartSync(CartSyncError::Invalid(err)) => err.to_string(),
            Self::CartSync(err) if err.is_not_found() => "Cart not found".to_string(),
            Self::CartSync(_) => "The store is not responding. Please try again.".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (self.status(), self.public_message()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Tag later Sentry events with the signed-in customer.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record a storefront action (cart change, wizard step) as a Sentry
/// breadcrumb, e.g. `add_breadcrumb("cart", "Lines added", Some(&[("count", "2")]))`.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wellspring_core::cart::{CartError, MutationKind};

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AppError::NotFound("product ember-serum".to_string()).to_string(),
            "Not found: product ember-serum"
        );
        assert_eq!(
            AppError::BadRequest("quantity must be at least 1".to_string()).to_string(),
            "Bad request: quantity must be at least 1"
        );
    }

    #[test]
    fn test_input_errors() {
        assert_eq!(
            status_of(AppError::NotFound("collection".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("quantity".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Validation("Please fill in: Goal".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_shopify_errors() {
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::NotFound("cart".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::RateLimited(2))),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(AppError::Shopify(ShopifyError::UserError("bad".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_cart_errors_map_by_cause() {
        let invalid = CartSyncError::Invalid(CartError::Empty(MutationKind::AddLines));
        assert_eq!(status_of(AppError::CartSync(invalid)), StatusCode::BAD_REQUEST);

        let missing = CartSyncError::Load(Arc::new(ShopifyError::NotFound("cart".to_string())));
        assert_eq!(status_of(AppError::CartSync(missing)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = AppError::Validation("Please fill in: Gender".to_string());
        assert_eq!(err.public_message(), "Please fill in: Gender");
    }
}
