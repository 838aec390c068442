//! Integration tests for Wellspring.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wellspring-integration-tests
//! ```
//!
//! The storefront is served in-process on an ephemeral port with an
//! in-memory session store, so no database or Shopify credentials are
//! needed. The `PostgreSQL` pool is created lazily and never connects for
//! the routes exercised here.
//!
//! # Test Categories
//!
//! - `cart_adapter` - optimistic cart scenarios against a simulated server
//! - `consultation` - the wizard driven over HTTP with a cookie session

use std::net::SocketAddr;

use axum::{Router, middleware::from_fn};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower_sessions::MemoryStore;
use wellspring_storefront::config::{AnalyticsConfig, ShopifyStorefrontConfig, StorefrontConfig};
use wellspring_storefront::middleware::{
    create_session_layer, csp_nonce_middleware, security_headers_middleware,
};
use wellspring_storefront::routes;
use wellspring_storefront::state::AppState;

/// A storefront listening on localhost for the duration of a test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serve the Shopify-free part of the storefront and return a client that
    /// keeps cookies and does not follow redirects.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the client cannot be built.
    pub async fn spawn() -> Self {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/wellspring_test")
            .expect("lazy pool");
        let config = test_config();
        let sessions =
            create_session_layer(MemoryStore::default(), &config.session_secret, false)
                .expect("signing key");
        let state = AppState::new(config, pool);

        let app = Router::new()
            .merge(routes::pages::router())
            .nest("/consultation", routes::consultation_routes())
            .layer(sessions)
            .layer(from_fn(security_headers_middleware))
            .layer(from_fn(csp_nonce_middleware))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build client");

        Self { addr, client }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A second visitor with its own cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn new_visitor(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build client")
    }
}

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/wellspring_test"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from(
            "Zq8vN2xR4kLm7Tb1Wc9Hs3Jd6Fg0Ye5Ua2Pi8Ko4Mn7Bv1Cx3Lz9Qw6Er0Ty5Ui2Op",
        ),
        shopify: ShopifyStorefrontConfig {
            store: "wellspring-test.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("private"),
        },
        analytics: AnalyticsConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}
