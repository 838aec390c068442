//! Session-related types.
//!
//! Types stored in the session for the logged-in customer and the cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shopify::{Customer, CustomerAccessToken};

/// Session-stored customer identity.
///
/// Minimal data kept in the session to identify the logged-in Shopify
/// customer and call the Storefront API on their behalf.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Shopify customer GID.
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    access_token: String,
    /// ISO 8601 expiry of the access token.
    pub expires_at: String,
}

impl CurrentCustomer {
    #[must_use]
    pub fn new(customer: Customer, token: CustomerAccessToken) -> Self {
        Self {
            id: customer.id,
            email: customer.email.unwrap_or_default(),
            first_name: customer.first_name,
            last_name: customer.last_name,
            access_token: token.access_token,
            expires_at: token.expires_at,
        }
    }

    /// Name to greet the customer with, falling back to their email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Whether the access token has expired at `now`.
    ///
    /// An unreadable expiry counts as live; Shopify rejects the token on the
    /// next customer query in that case.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        DateTime::parse_from_rfc3339(&self.expires_at).is_ok_and(|expires_at| expires_at <= now)
    }
}

impl std::fmt::Debug for CurrentCustomer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentCustomer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for storing the Shopify cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for gift card codes the shopper entered, as typed.
    ///
    /// Shopify only reports the last characters of an applied card, so the
    /// full codes are remembered here to resend them on later updates.
    pub const GIFT_CARD_CODES: &str = "gift_card_codes";
}
