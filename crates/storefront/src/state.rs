//! Shared handler state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::CartSync;
use crate::shopify::StorefrontClient;

/// Everything a handler can reach besides the request and its session.
///
/// Clones share one allocation. The Shopify client and the cart registry are
/// built once at startup so the product cache and the per-cart optimistic
/// state survive across requests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Shared>,
}

struct Shared {
    config: StorefrontConfig,
    /// Backs the session store only.
    pool: PgPool,
    storefront: StorefrontClient,
    carts: CartSync,
}

impl AppState {
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let storefront = StorefrontClient::new(&config.shopify);
        let carts = CartSync::new(storefront.clone());

        Self {
            inner: Arc::new(Shared {
                config,
                pool,
                storefront,
                carts,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Shopify Storefront API client (catalog, customers, raw cart calls).
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }

    /// Optimistic cart state per cart id. Cart mutations go through here,
    /// never straight to [`Self::storefront`].
    #[must_use]
    pub fn cart_sync(&self) -> &CartSync {
        &self.inner.carts
    }
}
