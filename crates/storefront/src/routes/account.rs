//! Customer account route handlers.
//!
//! Login, registration and logout go through the Shopify Storefront API
//! customer mutations. The access token is kept in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use wellspring_core::Email;

use crate::config::AnalyticsConfig;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth, clear_current_customer, set_current_customer};
use crate::models::{CurrentCustomer, session_keys};
use crate::shopify::{CustomerCreateInput, ShopifyError};
use crate::state::AppState;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Form and Query Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub accepts_marketing: Option<String>,
}

/// Error and notice codes carried through redirects.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Human-readable text for a redirect error code.
fn error_message(code: &str) -> String {
    match code {
        "credentials" => "Invalid email or password.".to_string(),
        "session" => "We couldn't sign you in. Please try again.".to_string(),
        "expired" => "Your session has expired. Please sign in again.".to_string(),
        "password_mismatch" => "Passwords do not match.".to_string(),
        "password_too_short" => {
            format!("Password must be at least {MIN_PASSWORD_LEN} characters.")
        }
        "email_taken" => "An account with this email already exists.".to_string(),
        "email_invalid" => "Please enter a valid email address.".to_string(),
        _ => "Something went wrong. Please try again.".to_string(),
    }
}

fn success_message(code: &str) -> Option<&'static str> {
    match code {
        "registered" => Some("Account created. You can sign in now."),
        "logged_out" => Some("You have been signed out."),
        _ => None,
    }
}

fn redirect_with_error(path: &str, code: &str) -> Response {
    Redirect::to(&format!("{path}?error={}", urlencoding::encode(code))).into_response()
}

// =============================================================================
// Templates
// =============================================================================

/// Profile fields shown on the account page.
#[derive(Clone)]
pub struct ProfileView {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub profile: ProfileView,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<&'static str>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub min_password_len: usize,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

// =============================================================================
// Account Overview
// =============================================================================

/// Display the account overview.
///
/// An expired token signs the customer out and sends them to the login page.
#[instrument(skip(state, session, customer, nonce))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(customer): RequireAuth,
    nonce: CspNonce,
) -> Result<Response> {
    let Some(profile) = state.storefront().get_customer(customer.access_token()).await? else {
        tracing::info!(customer_id = %customer.id, "Customer token expired");
        clear_current_customer(&session).await?;
        clear_sentry_user();
        return Ok(Redirect::to("/account/login").into_response());
    };

    let name = if profile.display_name.is_empty() {
        customer.display_name().to_string()
    } else {
        profile.display_name
    };

    Ok(AccountIndexTemplate {
        profile: ProfileView {
            name,
            email: profile.email.unwrap_or(customer.email),
            phone: profile.phone,
        },
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
    .into_response())
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().and_then(success_message),
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return redirect_with_error("/account/login", "credentials");
    };

    let token = match state
        .storefront()
        .create_customer_access_token(email.as_str(), &form.password)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            return redirect_with_error("/account/login", "credentials");
        }
    };

    let customer = match state.storefront().get_customer(&token.access_token).await {
        Ok(Some(customer)) => customer,
        Ok(None) => {
            tracing::warn!("Fresh access token did not resolve to a customer");
            return redirect_with_error("/account/login", "session");
        }
        Err(e) => {
            tracing::warn!("Failed to fetch customer after login: {e}");
            return redirect_with_error("/account/login", "session");
        }
    };

    let current = CurrentCustomer::new(customer, token);
    if let Err(e) = session.cycle_id().await {
        tracing::error!("Failed to rotate session id: {e}");
    }
    if let Err(e) = set_current_customer(&session, &current).await {
        tracing::error!("Failed to set session: {e}");
        return redirect_with_error("/account/login", "session");
    }

    set_sentry_user(&current.id, Some(&current.email));
    Redirect::to("/account").into_response()
}

// =============================================================================
// Registration
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    RegisterTemplate {
        error: query.error.as_deref().map(error_message),
        min_password_len: MIN_PASSWORD_LEN,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
}

/// Check the registration form before calling Shopify and return the
/// normalised email.
fn validate_registration(form: &RegisterForm) -> std::result::Result<Email, &'static str> {
    let email = Email::parse(&form.email).map_err(|_| "email_invalid")?;
    if form.password != form.password_confirm {
        return Err("password_mismatch");
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err("password_too_short");
    }
    Ok(email)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Handle registration form submission.
#[instrument(skip(state, form), fields(email = %form.email))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let email = match validate_registration(&form) {
        Ok(email) => email,
        Err(code) => return redirect_with_error("/account/register", code),
    };

    let input = CustomerCreateInput {
        email: email.into(),
        password: form.password,
        first_name: non_empty(form.first_name),
        last_name: non_empty(form.last_name),
        accepts_marketing: form.accepts_marketing.is_some(),
    };

    match state.storefront().create_customer(input).await {
        Ok(id) => {
            tracing::info!(customer_id = %id, "Customer registered");
            Redirect::to("/account/login?success=registered").into_response()
        }
        Err(ShopifyError::UserError(message)) => {
            tracing::info!("Registration rejected: {message}");
            let lowered = message.to_lowercase();
            if lowered.contains("taken") || lowered.contains("already") {
                redirect_with_error("/account/register", "email_taken")
            } else {
                redirect_with_error("/account/register", "failed")
            }
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            redirect_with_error("/account/register", "failed")
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Revokes the Shopify access token (best effort) and destroys the session,
/// which also drops the cart and consultation answers.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Ok(Some(customer)) = session
        .get::<CurrentCustomer>(session_keys::CURRENT_CUSTOMER)
        .await
        && let Err(e) = state
            .storefront()
            .delete_customer_access_token(customer.access_token())
            .await
    {
        tracing::warn!("Failed to delete Shopify access token: {e}");
    }

    if let Err(e) = clear_current_customer(&session).await {
        tracing::error!("Failed to clear session: {e}");
    }
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }
    clear_sentry_user();

    Redirect::to("/account/login?success=logged_out").into_response()
}
