//! Shopify Storefront API access.
//!
//! Shopify is the system of record for products, carts and customers; the
//! storefront keeps no copy beyond a short `moka` cache of catalog reads.
//! Cart operations return [`wellspring_core::cart::Cart`] so the optimistic
//! adapter can reconcile them without another conversion.
//!
//! ```rust,ignore
//! let client = StorefrontClient::new(&config.shopify);
//! let product = client.get_product_by_handle("semaglutide").await?;
//! let cart = client.create_cart(&[line], Vec::new(), Vec::new()).await?;
//! ```

mod storefront;
pub mod types;

pub use storefront::StorefrontClient;
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL errors: {}", join_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Shopify answered 429; seconds from `Retry-After`.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// First `userErrors` message of a mutation, e.g. an unknown discount
    /// code. Safe to show the shopper.
    #[error("User error: {0}")]
    UserError(String),
}

impl ShopifyError {
    /// Text for the inline error slot in the cart and account forms.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::UserError(message) => message.clone(),
            Self::RateLimited(_) => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            Self::NotFound(_) => "This item is no longer available.".to_string(),
            Self::Http(_) | Self::GraphQL(_) | Self::Parse(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLError {
    pub message: String,
    /// Dotted response path, e.g. `cartLinesUpdate.cart`.
    pub path: Option<String>,
}

impl GraphQLError {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(error: graphql_client::Error) -> Self {
        let path = error.path.filter(|p| !p.is_empty()).map(|fragments| {
            fragments
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".")
        });
        Self {
            message: error.message,
            path,
        }
    }
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.path, self.message.is_empty()) {
            (Some(path), true) => write!(f, "at {path}"),
            (Some(path), false) => write!(f, "{} (at {path})", self.message),
            (None, true) => f.write_str("(no details)"),
            (None, false) => f.write_str(&self.message),
        }
    }
}

fn join_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(none reported)".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
