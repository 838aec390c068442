//! Storefront configuration, read once at startup from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! | Variable                           | Required | Default      |
//! |------------------------------------|----------|--------------|
//! | `STOREFRONT_DATABASE_URL`          | yes\*    |              |
//! | `STOREFRONT_BASE_URL`              | yes      |              |
//! | `STOREFRONT_SESSION_SECRET`        | yes      |              |
//! | `SHOPIFY_STORE`                    | yes      |              |
//! | `SHOPIFY_STOREFRONT_PRIVATE_TOKEN` | yes      |              |
//! | `STOREFRONT_HOST`                  | no       | `127.0.0.1`  |
//! | `STOREFRONT_PORT`                  | no       | `3000`       |
//! | `SHOPIFY_API_VERSION`              | no       | `2026-01`    |
//! | `GA4_MEASUREMENT_ID`               | no       |              |
//! | `META_PIXEL_ID`                    | no       |              |
//! | `SENTRY_DSN`                       | no       |              |
//! | `SENTRY_ENVIRONMENT`               | no       |              |
//! | `SENTRY_SAMPLE_RATE`               | no       | `1.0`        |
//! | `SENTRY_TRACES_SAMPLE_RATE`        | no       | `0.0`        |
//!
//! \* `DATABASE_URL` (set by `fly postgres attach`) is accepted instead.
//!
//! Secrets are rejected when they look like placeholders or have too little
//! entropy, so a copied `.env.example` fails fast instead of running with a
//! guessable session key.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// The session secret is used directly as the 64-byte cookie signing key.
pub const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Fragments that give away a placeholder value (matched case-insensitively).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Session database; the URL carries the password.
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public origin, e.g. `https://wellspring.health`.
    pub base_url: String,
    /// Signs the session cookie.
    pub session_secret: SecretString,
    pub shopify: ShopifyStorefrontConfig,
    pub analytics: AnalyticsConfig,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry.
    pub sentry_sample_rate: f32,
    /// Fraction of requests traced as Sentry transactions.
    pub sentry_traces_sample_rate: f32,
}

/// Shopify Storefront API access. Every call is made server-side with the
/// private token, so the public token is never needed.
#[derive(Clone)]
pub struct ShopifyStorefrontConfig {
    /// Shop domain, e.g. `wellspring.myshopify.com`.
    pub store: String,
    pub api_version: String,
    pub storefront_private_token: SecretString,
}

impl std::fmt::Debug for ShopifyStorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyStorefrontConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_private_token", &"[REDACTED]")
            .finish()
    }
}

/// Tracking pixels rendered by `base.html`. Both are optional.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    pub ga4_measurement_id: Option<String>,
    pub meta_pixel_id: Option<String>,
}

impl StorefrontConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for missing or unparsable variables and for
    /// secrets that fail the placeholder, entropy or length checks.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let session_secret = secret("STOREFRONT_SESSION_SECRET")?;
        check_session_secret_length(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        Ok(Self {
            database_url: database_url()?,
            host: parsed("STOREFRONT_HOST", "127.0.0.1")?,
            port: parsed("STOREFRONT_PORT", "3000")?,
            base_url: required("STOREFRONT_BASE_URL")?,
            session_secret,
            shopify: ShopifyStorefrontConfig {
                store: required("SHOPIFY_STORE")?,
                api_version: optional("SHOPIFY_API_VERSION")
                    .unwrap_or_else(|| "2026-01".to_string()),
                storefront_private_token: secret("SHOPIFY_STOREFRONT_PRIVATE_TOKEN")?,
            },
            analytics: AnalyticsConfig {
                ga4_measurement_id: optional("GA4_MEASUREMENT_ID"),
                meta_pixel_id: optional("META_PIXEL_ID"),
            },
            sentry_dsn: optional("SENTRY_DSN"),
            sentry_environment: optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should be marked `Secure`.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ShopifyStorefrontConfig {
    /// GraphQL endpoint of the Storefront API.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

// =============================================================================
// Environment readers
// =============================================================================

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Unset and empty read the same.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parsed<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(key)
        .as_deref()
        .unwrap_or(default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn database_url() -> Result<SecretString, ConfigError> {
    optional("STOREFRONT_DATABASE_URL")
        .or_else(|| optional("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))
}

fn sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    optional(key).map_or(Ok(default), |raw| {
        parse_sample_rate(&raw).map_err(|reason| ConfigError::InvalidEnvVar(key.to_string(), reason))
    })
}

fn parse_sample_rate(raw: &str) -> Result<f32, String> {
    let rate = raw.trim().parse::<f32>().map_err(|e| e.to_string())?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("must be between 0.0 and 1.0 (got {rate})"))
    }
}

// =============================================================================
// Secret checks
// =============================================================================

fn secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = required(key)?;
    check_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

fn check_session_secret_length(secret: &SecretString, key: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} bytes (got {len})"),
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    counts
        .values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn check_secret_strength(secret: &str, key: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate it with `openssl rand -base64 48`"
            ),
        ));
    }
    Ok(())
}
