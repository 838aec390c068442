//! Visitor sessions.
//!
//! One cookie-keyed session per visitor holds everything the storefront
//! remembers between requests: the Shopify cart id, typed gift card codes,
//! the consultation answers and, after login, the customer access token.
//! Production keeps them in `PostgreSQL`; the cookie carries only the
//! signed session id.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Key, KeyError, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

pub const SESSION_COOKIE_NAME: &str = "ws_session";

/// Idle time after which a session (and the cart and answers in it) lapses.
const IDLE_DAYS: i64 = 14;

/// Open the `PostgreSQL` session store, creating its table on first run.
///
/// # Errors
///
/// Returns `sqlx::Error` if the session table cannot be created.
pub async fn create_session_store(pool: &PgPool) -> Result<PostgresStore, sqlx::Error> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

/// Session layer over any store, signing the cookie with `secret`.
/// `secure` marks the cookie HTTPS-only.
///
/// # Errors
///
/// Returns `KeyError` if `secret` is shorter than 64 bytes.
pub fn create_session_layer<S>(
    store: S,
    secret: &SecretString,
    secure: bool,
) -> Result<SessionManagerLayer<S, SignedCookie>, KeyError>
where
    S: SessionStore + Clone,
{
    let key = Key::try_from(secret.expose_secret().as_bytes())?;
    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(IDLE_DAYS)))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
