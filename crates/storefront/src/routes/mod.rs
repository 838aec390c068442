//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                            - Home page
//! GET  /faq                         - FAQ
//! GET  /how-it-works                - How it works
//! GET  /treatments                  - Treatment categories
//!
//! # Catalog
//! GET  /products                    - Product listing (?after=, ?sort=)
//! GET  /products/{handle}           - Product detail (?variant=)
//! GET  /collections                 - Collection listing
//! GET  /collections/all             - Every product
//! GET  /collections/{handle}        - Collection detail
//!
//! # Cart (HTMX fragments)
//! GET  /cart                        - Cart page
//! GET  /cart/items                  - Cart items fragment, refetched
//! GET  /cart/count                  - Cart count badge
//! POST /cart/add                    - Add line (creates the cart if needed)
//! POST /cart/buy-now                - Add line, then go to checkout
//! POST /cart/update                 - Set line quantity
//! POST /cart/remove                 - Remove line
//! POST /cart/discount               - Apply or remove a discount code
//! POST /cart/gift-card              - Apply a gift card
//! POST /cart/gift-card/remove       - Remove a gift card
//! GET  /checkout                    - Redirect to Shopify checkout
//!
//! # Consultation
//! GET  /consultation?step=N         - Wizard step N
//! POST /consultation/step/{n}       - Continue from step n
//! POST /consultation/back/{n}       - Go back to step n
//! POST /consultation/answer         - Save one answer
//!
//! # Account
//! GET  /account                     - Account overview (requires login)
//! GET  /account/login               - Login page
//! POST /account/login               - Login action
//! GET  /account/register            - Register page
//! POST /account/register            - Register action
//! POST /account/logout              - Logout action
//! ```

pub mod account;
pub mod cart;
pub mod collections;
pub mod consultation;
pub mod home;
pub mod pages;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, cart_rate_limiter, consultation_rate_limiter};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
}

/// Create the collection routes router.
pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(collections::index))
        .route("/all", get(collections::all))
        .route("/{handle}", get(collections::show))
}

/// Create the cart routes router. Mutations are rate limited.
pub fn cart_routes() -> Router<AppState> {
    let mutations = Router::new()
        .route("/add", post(cart::add))
        .route("/buy-now", post(cart::buy_now))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/discount", post(cart::discount))
        .route("/gift-card", post(cart::add_gift_card))
        .route("/gift-card/remove", post(cart::remove_gift_card))
        .layer(cart_rate_limiter());

    Router::new()
        .route("/", get(cart::show))
        .route("/items", get(cart::items))
        .route("/count", get(cart::count))
        .merge(mutations)
}

/// Create the consultation routes router. Posts are rate limited.
pub fn consultation_routes() -> Router<AppState> {
    let posts = Router::new()
        .route("/step/{n}", post(consultation::commit))
        .route("/back/{n}", post(consultation::back))
        .route("/answer", post(consultation::answer))
        .layer(consultation_rate_limiter());

    Router::new()
        .route("/", get(consultation::show))
        .merge(posts)
}

/// Create the account routes router. Credential posts are rate limited.
pub fn account_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/login", post(account::login))
        .route("/register", post(account::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/", get(account::index))
        .route("/login", get(account::login_page))
        .route("/register", get(account::register_page))
        .route("/logout", post(account::logout))
        .merge(credentials)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(pages::router())
        .nest("/products", product_routes())
        .nest("/collections", collection_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(cart::checkout))
        .nest("/consultation", consultation_routes())
        .nest("/account", account_routes())
}
