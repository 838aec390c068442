//! Customer login extractor and session helpers.
//!
//! The Shopify customer access token lives in the session next to the cart
//! and the consultation answers. Only `/account` requires it; the shop and
//! the consultation work for guests.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::models::{CurrentCustomer, session_keys};

const LOGIN_PATH: &str = "/account/login";

/// Extractor for handlers that need a signed-in customer with a live token.
///
/// ```rust,ignore
/// async fn account(RequireAuth(customer): RequireAuth) -> impl IntoResponse {
///     format!("Welcome back, {}", customer.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentCustomer);

/// Why a request was turned away from a customer-only page.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Plain navigation: send the browser to the login page.
    Login { expired: bool },
    /// HTMX cannot swap a full login page into a fragment.
    Unauthorized,
}

impl AuthRejection {
    fn for_request(parts: &Parts, expired: bool) -> Self {
        if parts.headers.contains_key("hx-request") {
            Self::Unauthorized
        } else {
            Self::Login { expired }
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Login { expired: true } => {
                Redirect::to(&format!("{LOGIN_PATH}?error=expired")).into_response()
            }
            Self::Login { expired: false } => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            tracing::error!("Session layer missing in front of a customer-only route");
            return Err(AuthRejection::Unauthorized);
        };

        let customer = session
            .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AuthRejection::for_request(parts, false))?;

        if customer.is_expired(Utc::now()) {
            tracing::info!(customer_id = %customer.id, "Customer access token expired");
            if let Err(e) = clear_current_customer(&session).await {
                tracing::error!("Failed to clear expired customer: {e}");
            }
            return Err(AuthRejection::for_request(parts, true));
        }

        Ok(Self(customer))
    }
}

/// Store the signed-in customer in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_customer(
    session: &Session,
    customer: &CurrentCustomer,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CURRENT_CUSTOMER, customer)
        .await
}

/// Forget the signed-in customer. The cart and consultation answers stay.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_customer(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await?;
    Ok(())
}
