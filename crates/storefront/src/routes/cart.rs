//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart ID lives in the session; every change goes through
//! [`CartSync`](crate::services::CartSync) so the response already shows the
//! optimistic result while Shopify catches up.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use wellspring_core::cart::{Cart, CartLine, CartMutation, LineAdd, LineControls, LineUpdate};
use wellspring_core::{CartId, CartLineId, GiftCardId, MerchandiseId, format_optional};

use crate::config::AnalyticsConfig;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session_keys;
use crate::services::CartSyncError;
use crate::state::AppState;

use super::products::ImageView;

/// Shown when the stored cart no longer exists upstream.
const EXPIRED_CART_MESSAGE: &str = "Your cart expired, so we started a new one.";

// =============================================================================
// View Types
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: String,
    pub handle: Option<String>,
    pub title: String,
    pub variant_title: Option<String>,
    pub price: String,
    pub line_price: String,
    pub image: Option<ImageView>,
    pub controls: LineControls,
    pub pending: bool,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let merchandise = line.merchandise.as_ref();
        let title = merchandise.map_or_else(
            || "Loading…".to_string(),
            |m| m.product_title.clone(),
        );

        Self {
            id: line.id.to_string(),
            handle: merchandise.map(|m| m.product_handle.clone()),
            variant_title: merchandise
                .map(|m| m.title.clone())
                .filter(|t| t != "Default Title"),
            price: format_optional(line.cost.as_ref().map(|c| &c.amount_per_quantity)),
            line_price: format_optional(line.cost.as_ref().map(|c| &c.total_amount)),
            image: merchandise
                .and_then(|m| m.image.as_ref())
                .map(|img| ImageView {
                    url: img.url.clone(),
                    alt: img.alt_text.clone().unwrap_or_else(|| title.clone()),
                }),
            controls: LineControls::for_line(line),
            pending: line.is_optimistic,
            title,
        }
    }
}

/// Discount code display data.
#[derive(Clone)]
pub struct DiscountView {
    pub code: String,
    pub applicable: bool,
}

/// Applied gift card display data.
#[derive(Clone)]
pub struct GiftCardView {
    pub id: String,
    pub last_characters: String,
    pub pending: bool,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub total: String,
    pub item_count: u32,
    pub discount_codes: Vec<DiscountView>,
    pub gift_cards: Vec<GiftCardView>,
    /// Some change is still waiting for Shopify.
    pub pending: bool,
    pub can_checkout: bool,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            lines: Vec::new(),
            subtotal: "$0.00".to_string(),
            total: "$0.00".to_string(),
            item_count: 0,
            discount_codes: Vec::new(),
            gift_cards: Vec::new(),
            pending: false,
            can_checkout: false,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines.iter().map(CartLineView::from).collect(),
            subtotal: format_optional(cart.cost.subtotal.as_ref()),
            total: format_optional(cart.cost.total.as_ref()),
            item_count: cart.total_quantity,
            discount_codes: cart
                .discount_codes
                .iter()
                .map(|d| DiscountView {
                    code: d.code.clone(),
                    applicable: d.applicable,
                })
                .collect(),
            gift_cards: cart
                .applied_gift_cards
                .iter()
                .map(|g| GiftCardView {
                    id: g.id.to_string(),
                    last_characters: g.last_characters.clone(),
                    pending: g.id.is_placeholder(),
                })
                .collect(),
            pending: cart.is_optimistic,
            can_checkout: cart.has_items() && !cart.is_optimistic && cart.checkout_url.is_some(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart ID from the session.
async fn get_cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<String>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
        .map(CartId::from)
}

/// Set the cart ID in the session.
async fn set_cart_id(
    session: &Session,
    cart_id: &CartId,
) -> std::result::Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART_ID, cart_id.as_str()).await
}

/// Gift card codes the shopper entered on this cart.
async fn gift_card_codes(session: &Session) -> Vec<String> {
    session
        .get::<Vec<String>>(session_keys::GIFT_CARD_CODES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Drop an expired cart from the session and the sync registry.
async fn discard_cart(
    state: &AppState,
    session: &Session,
    cart_id: &CartId,
) -> std::result::Result<(), tower_sessions::session::Error> {
    tracing::info!(cart_id = %cart_id, "Discarding expired cart");
    state.cart_sync().forget(cart_id).await;
    session.remove::<String>(session_keys::CART_ID).await?;
    session
        .remove::<Vec<String>>(session_keys::GIFT_CARD_CODES)
        .await?;
    Ok(())
}

/// The current projection, or `None` when the session has no live cart.
async fn current_cart(state: &AppState, session: &Session) -> Result<Option<Cart>> {
    let Some(cart_id) = get_cart_id(session).await else {
        return Ok(None);
    };

    match state.cart_sync().projection(&cart_id).await {
        Ok(cart) => Ok(Some(cart)),
        Err(e) if e.is_not_found() => {
            discard_cart(state, session, &cart_id).await?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: String,
    pub quantity: Option<u32>,
}

impl AddToCartForm {
    fn line(&self) -> LineAdd {
        LineAdd {
            merchandise_id: MerchandiseId::new(self.variant_id.trim()),
            quantity: self.quantity.unwrap_or(1),
        }
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

/// Discount form: either a code to apply or one to remove.
#[derive(Debug, Deserialize)]
pub struct DiscountForm {
    pub code: Option<String>,
    pub remove: Option<String>,
}

/// Gift card form data.
#[derive(Debug, Deserialize)]
pub struct GiftCardForm {
    pub code: String,
}

/// Remove gift card form data.
#[derive(Debug, Deserialize)]
pub struct RemoveGiftCardForm {
    pub gift_card_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub error: Option<String>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Render the cart fragment and tell the page the cart changed.
fn items_response(cart: CartView, error: Option<String>) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate { cart, error },
    )
        .into_response()
}

// =============================================================================
// Pages and Fragments
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Result<impl IntoResponse> {
    let had_cart = get_cart_id(&session).await.is_some();
    let cart = current_cart(&state, &session).await?;

    Ok(CartShowTemplate {
        error: (had_cart && cart.is_none()).then(|| EXPIRED_CART_MESSAGE.to_string()),
        cart: cart.as_ref().map_or_else(CartView::empty, CartView::from),
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    })
}

/// Cart items fragment (HTMX), refetched from Shopify when idle.
#[instrument(skip(state, session))]
pub async fn items(State(state): State<AppState>, session: Session) -> Result<Response> {
    let Some(cart_id) = get_cart_id(&session).await else {
        return Ok(CartItemsTemplate {
            cart: CartView::empty(),
            error: None,
        }
        .into_response());
    };

    match state.cart_sync().refresh(&cart_id).await {
        Ok(cart) => Ok(CartItemsTemplate {
            cart: CartView::from(&cart),
            error: None,
        }
        .into_response()),
        Err(e) if e.is_not_found() => {
            discard_cart(&state, &session, &cart_id).await?;
            Ok(CartItemsTemplate {
                cart: CartView::empty(),
                error: Some(EXPIRED_CART_MESSAGE.to_string()),
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let count = match current_cart(&state, &session).await {
        Ok(cart) => cart.map_or(0, |c| c.total_quantity),
        Err(e) => {
            tracing::warn!("Failed to load cart for badge: {e}");
            0
        }
    };

    CartCountTemplate { count }
}

// =============================================================================
// Mutations
// =============================================================================

/// Submit `mutation` against the session's cart and render the outcome.
async fn submit(state: &AppState, session: &Session, mutation: CartMutation) -> Result<Response> {
    let Some(cart_id) = get_cart_id(session).await else {
        return Ok(items_response(CartView::empty(), None));
    };

    match state.cart_sync().submit(&cart_id, mutation).await {
        Ok(outcome) => Ok(items_response(CartView::from(&outcome.cart), outcome.error)),
        Err(e) if e.is_not_found() => {
            discard_cart(state, session, &cart_id).await?;
            Ok(items_response(
                CartView::empty(),
                Some(EXPIRED_CART_MESSAGE.to_string()),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Create a cart holding `line` and remember it in the session.
async fn create_cart(state: &AppState, session: &Session, line: LineAdd) -> Result<Cart> {
    let cart = state
        .storefront()
        .create_cart(&[line], Vec::new(), Vec::new())
        .await?;
    set_cart_id(session, &cart.id).await?;
    add_breadcrumb("cart", "Cart created", Some(&[("cart_id", cart.id.as_str())]));
    Ok(state.cart_sync().adopt(cart).await)
}

/// Add item to cart (HTMX).
///
/// Creates a new cart if the session has none (or its cart expired).
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let line = form.line();
    if line.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    if current_cart(&state, &session).await?.is_none() {
        let cart = create_cart(&state, &session, line).await?;
        return Ok(items_response(CartView::from(&cart), None));
    }

    submit(&state, &session, CartMutation::AddLines(vec![line])).await
}

/// Add item and go straight to checkout.
#[instrument(skip(state, session))]
pub async fn buy_now(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let line = form.line();
    if line.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    let cart = match current_cart(&state, &session).await? {
        None => create_cart(&state, &session, line).await?,
        Some(cart) => {
            let outcome = state
                .cart_sync()
                .submit(&cart.id, CartMutation::AddLines(vec![line]))
                .await?;
            if let Some(error) = outcome.error {
                return Ok(items_response(CartView::from(&outcome.cart), Some(error)));
            }
            outcome.cart
        }
    };

    match cart.checkout_url {
        Some(url) => Ok(AppendHeaders([("HX-Redirect", url)]).into_response()),
        None => Ok(AppendHeaders([("HX-Redirect", "/cart".to_string())]).into_response()),
    }
}

/// Set a line's quantity (HTMX). Zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let mutation = CartMutation::UpdateLines(vec![LineUpdate {
        id: CartLineId::new(form.line_id),
        quantity: form.quantity,
    }]);
    submit(&state, &session, mutation).await
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let mutation = CartMutation::RemoveLines(vec![CartLineId::new(form.line_id)]);
    submit(&state, &session, mutation).await
}

/// The discount code list after applying `form` to `current`.
fn next_discount_codes(current: &[String], form: &DiscountForm) -> Vec<String> {
    let mut codes: Vec<String> = current.to_vec();

    if let Some(removed) = form.remove.as_deref().map(str::trim) {
        codes.retain(|code| !code.eq_ignore_ascii_case(removed));
    }

    if let Some(added) = form.code.as_deref().map(str::trim).filter(|c| !c.is_empty())
        && !codes.iter().any(|code| code.eq_ignore_ascii_case(added))
    {
        codes.push(added.to_string());
    }

    codes
}

/// Apply or remove a discount code (HTMX).
#[instrument(skip(state, session))]
pub async fn discount(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<DiscountForm>,
) -> Result<Response> {
    let Some(cart) = current_cart(&state, &session).await? else {
        return Ok(items_response(CartView::empty(), None));
    };

    let current: Vec<String> = cart.discount_codes.iter().map(|d| d.code.clone()).collect();
    let codes = next_discount_codes(&current, &form);
    submit(&state, &session, CartMutation::DiscountCodesUpdate(codes)).await
}

/// The gift card code list with `code` appended unless already present.
fn with_gift_card_code(mut codes: Vec<String>, code: &str) -> Vec<String> {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if !code.is_empty() && !codes.iter().any(|c| c.eq_ignore_ascii_case(&code)) {
        codes.push(code);
    }
    codes
}

/// Apply a gift card (HTMX).
///
/// Shopify replaces the whole gift card list on update, so every code the
/// shopper entered is resent.
#[instrument(skip(state, session, form))]
pub async fn add_gift_card(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<GiftCardForm>,
) -> Result<Response> {
    let Some(cart) = current_cart(&state, &session).await? else {
        return Ok(items_response(CartView::empty(), None));
    };

    let codes = with_gift_card_code(gift_card_codes(&session).await, &form.code);
    let outcome = state
        .cart_sync()
        .submit(&cart.id, CartMutation::GiftCardCodesUpdate(codes.clone()))
        .await?;

    if outcome.error.is_none() {
        session.insert(session_keys::GIFT_CARD_CODES, &codes).await?;
    }
    Ok(items_response(CartView::from(&outcome.cart), outcome.error))
}

/// Remove an applied gift card (HTMX).
#[instrument(skip(state, session))]
pub async fn remove_gift_card(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveGiftCardForm>,
) -> Result<Response> {
    let Some(cart) = current_cart(&state, &session).await? else {
        return Ok(items_response(CartView::empty(), None));
    };

    let id = GiftCardId::new(form.gift_card_id);
    let suffix = cart
        .applied_gift_cards
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.last_characters.to_lowercase());

    let outcome = state
        .cart_sync()
        .submit(&cart.id, CartMutation::GiftCardCodesRemove(vec![id]))
        .await
        .map_err(|e| match e {
            CartSyncError::Invalid(err) => AppError::BadRequest(err.to_string()),
            other => other.into(),
        })?;

    if outcome.error.is_none()
        && let Some(suffix) = suffix
    {
        let mut codes = gift_card_codes(&session).await;
        codes.retain(|code| !code.to_lowercase().ends_with(&suffix));
        session.insert(session_keys::GIFT_CARD_CODES, &codes).await?;
    }
    Ok(items_response(CartView::from(&outcome.cart), outcome.error))
}

// =============================================================================
// Checkout
// =============================================================================

/// Redirect to Shopify checkout.
///
/// The checkout URL is used exactly as Shopify returned it.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Response {
    let Some(cart_id) = get_cart_id(&session).await else {
        return Redirect::to("/cart").into_response();
    };

    match state.cart_sync().refresh(&cart_id).await {
        Ok(cart) => match cart.checkout_url {
            Some(url) if cart.has_items() => {
                add_breadcrumb("cart", "Checkout", Some(&[("cart_id", cart_id.as_str())]));
                Redirect::to(&url).into_response()
            }
            _ => Redirect::to("/cart").into_response(),
        },
        Err(e) => {
            tracing::error!("Failed to get cart for checkout: {e}");
            Redirect::to("/cart").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wellspring_core::Money;
    use wellspring_core::cart::{AppliedGiftCard, DiscountCode, LineCost, LineMerchandise};

    use super::*;

    fn confirmed_line() -> CartLine {
        CartLine {
            id: CartLineId::new("gid://shopify/CartLine/1"),
            merchandise_id: MerchandiseId::new("gid://shopify/ProductVariant/1"),
            quantity: 2,
            is_optimistic: false,
            merchandise: Some(LineMerchandise {
                title: "Default Title".to_string(),
                product_title: "Semaglutide".to_string(),
                product_handle: "semaglutide".to_string(),
                product_type: None,
                image: None,
                selected_options: Vec::new(),
            }),
            cost: Some(LineCost {
                amount_per_quantity: Money::parse("99.00", "USD").unwrap(),
                total_amount: Money::parse("198.00", "USD").unwrap(),
            }),
        }
    }

    #[test]
    fn test_line_view_hides_default_variant() {
        let view = CartLineView::from(&confirmed_line());
        assert_eq!(view.title, "Semaglutide");
        assert_eq!(view.variant_title, None);
        assert_eq!(view.line_price, "$198.00");
        assert!(view.controls.can_decrement);
        assert!(!view.pending);
    }

    #[test]
    fn test_placeholder_line_renders_dashes() {
        let line = CartLine::placeholder(MerchandiseId::new("gid://shopify/ProductVariant/9"), 1);
        let view = CartLineView::from(&line);
        assert_eq!(view.price, "-");
        assert!(view.pending);
        assert!(!view.controls.can_remove);
    }

    #[test]
    fn test_optimistic_cart_blocks_checkout() {
        let mut cart = Cart::empty(CartId::new("gid://shopify/Cart/1"));
        cart.lines.push(confirmed_line());
        cart.total_quantity = 2;
        cart.checkout_url = Some("https://shop.example/checkouts/1".to_string());
        assert!(CartView::from(&cart).can_checkout);

        cart.is_optimistic = true;
        assert!(!CartView::from(&cart).can_checkout);
    }

    #[test]
    fn test_cart_view_lists_codes_and_cards() {
        let mut cart = Cart::empty(CartId::new("gid://shopify/Cart/1"));
        cart.discount_codes.push(DiscountCode {
            code: "WELCOME10".to_string(),
            applicable: false,
        });
        cart.applied_gift_cards.push(AppliedGiftCard {
            id: GiftCardId::new("gid://shopify/AppliedGiftCard/1"),
            last_characters: "abcd".to_string(),
        });

        let view = CartView::from(&cart);
        assert_eq!(view.discount_codes.len(), 1);
        assert!(!view.discount_codes[0].applicable);
        assert_eq!(view.gift_cards[0].last_characters, "abcd");
        assert!(view.is_empty());
    }

    #[test]
    fn test_discount_codes_add_and_remove() {
        let current = vec!["WELCOME10".to_string()];

        let added = next_discount_codes(
            &current,
            &DiscountForm {
                code: Some(" spring ".to_string()),
                remove: None,
            },
        );
        assert_eq!(added, vec!["WELCOME10", "spring"]);

        let duplicate = next_discount_codes(
            &current,
            &DiscountForm {
                code: Some("welcome10".to_string()),
                remove: None,
            },
        );
        assert_eq!(duplicate, vec!["WELCOME10"]);

        let removed = next_discount_codes(
            &current,
            &DiscountForm {
                code: None,
                remove: Some("welcome10".to_string()),
            },
        );
        assert!(removed.is_empty());
    }

    #[test]
    fn test_gift_card_codes_strip_whitespace_and_dedup() {
        let codes = with_gift_card_code(Vec::new(), "ABCD EFGH 1234");
        assert_eq!(codes, vec!["ABCDEFGH1234"]);

        let codes = with_gift_card_code(codes, "abcdefgh1234");
        assert_eq!(codes.len(), 1);

        let codes = with_gift_card_code(codes, "   ");
        assert_eq!(codes.len(), 1);
    }
}
