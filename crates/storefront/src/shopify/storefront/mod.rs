//! Shopify Storefront API client implementation.
//!
//! Operations are hand-written [`graphql_client::GraphQLQuery`] impls sent with
//! `reqwest` 0.13. Products and collections are cached using `moka`
//! (5-minute TTL); carts and customers always go to Shopify.

mod cache;
mod conversions;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, Response};
use moka::future::Cache;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};
use wellspring_core::cart::{Cart, CartMutation, LineAdd, LineUpdate};
use wellspring_core::{CartId, CartLineId, GiftCardId};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{
    Collection, CollectionConnection, Customer, CustomerAccessToken, CustomerCreateInput, Product,
    ProductConnection, ProductSortKey,
};
use crate::shopify::{GraphQLError, ShopifyError};

use cache::{CacheValue, collection_key, collections_key, product_key, products_key};
use conversions::{
    convert_access_token, convert_cart, convert_collection, convert_collection_connection,
    convert_customer, convert_product, convert_product_connection, first_user_error,
};
use queries::{
    CartCreate, CartDiscountCodesUpdate, CartGiftCardCodesRemove, CartGiftCardCodesUpdate,
    CartLinesAdd, CartLinesRemove, CartLinesUpdate, CustomerAccessTokenCreate,
    CustomerAccessTokenDelete, CustomerCreate, GetCart, GetCollectionByHandle, GetCollections,
    GetCustomer, GetProductByHandle, GetProducts, cart_create, cart_discount_codes_update,
    cart_gift_card_codes_remove, cart_gift_card_codes_update, cart_lines_add, cart_lines_remove,
    cart_lines_update, customer_access_token_create, customer_access_token_delete,
    customer_create, get_cart, get_collection_by_handle, get_collections, get_customer,
    get_product_by_handle, get_products, wire,
};

/// Images requested for a product detail page.
const PRODUCT_IMAGE_COUNT: i64 = 10;

/// Variants requested for a product detail page.
const PRODUCT_VARIANT_COUNT: i64 = 50;

/// Upper bound on one Storefront API round trip. A cart mutation that times
/// out is rejected and its optimistic effect reverted.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides typed access to products, collections, carts and customers.
/// Products and collections are cached for 5 minutes.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    cache: Cache<String, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::builder()
                    .timeout(REQUEST_TIMEOUT)
                    .build()
                    .unwrap_or_else(|e| {
                        tracing::warn!("Falling back to a default HTTP client: {e}");
                        reqwest::Client::new()
                    }),
                endpoint: config.endpoint(),
                access_token: config.storefront_private_token.expose_secret().to_string(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = request_body.operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = request_body.operation_name,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(errors = ?errors, "GraphQL errors in response");

            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = request_body.operation_name,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = product_key(handle);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let variables = get_product_by_handle::Variables {
            handle: handle.to_string(),
            image_count: PRODUCT_IMAGE_COUNT,
            variant_count: PRODUCT_VARIANT_COUNT,
        };

        let data = self.execute::<GetProductByHandle>(variables).await?;

        let product = data
            .product
            .map(convert_product)
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a page of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        first: i64,
        after: Option<String>,
        sort: Option<(ProductSortKey, bool)>,
    ) -> Result<ProductConnection, ShopifyError> {
        let sort_label = sort.map(|(key, reverse)| format!("{key:?}:{reverse}"));
        let cache_key = products_key(first, after.as_deref(), sort_label.as_deref());

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let variables = get_products::Variables {
            first,
            after,
            query: None,
            sort_key: sort.map(|(key, _)| key),
            reverse: sort.map(|(_, reverse)| reverse),
        };

        let data = self.execute::<GetProducts>(variables).await?;
        let connection = convert_product_connection(data.products);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(connection.clone()))
            .await;

        Ok(connection)
    }

    // =========================================================================
    // Collection Methods
    // =========================================================================

    /// Get a collection and one page of its products.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_collection_by_handle(
        &self,
        handle: &str,
        product_count: i64,
        after: Option<String>,
    ) -> Result<Collection, ShopifyError> {
        let cache_key = collection_key(handle, after.as_deref());

        if let Some(CacheValue::Collection(collection)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let variables = get_collection_by_handle::Variables {
            handle: handle.to_string(),
            product_count,
            after,
        };

        let data = self.execute::<GetCollectionByHandle>(variables).await?;

        let collection = data
            .collection
            .map(convert_collection)
            .ok_or_else(|| ShopifyError::NotFound(format!("Collection not found: {handle}")))?;

        self.inner
            .cache
            .insert(
                cache_key,
                CacheValue::Collection(Box::new(collection.clone())),
            )
            .await;

        Ok(collection)
    }

    /// Get a page of collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_collections(
        &self,
        first: i64,
        after: Option<String>,
    ) -> Result<CollectionConnection, ShopifyError> {
        let cache_key = collections_key(after.as_deref());

        if let Some(CacheValue::Collections(collections)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let variables = get_collections::Variables { first, after };

        let data = self.execute::<GetCollections>(variables).await?;
        let connection = convert_collection_connection(data.collections);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Collections(connection.clone()))
            .await;

        Ok(connection)
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Create a new cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart creation fails or user errors are returned.
    #[instrument(skip(self, lines))]
    pub async fn create_cart(
        &self,
        lines: &[LineAdd],
        discount_codes: Vec<String>,
        gift_card_codes: Vec<String>,
    ) -> Result<Cart, ShopifyError> {
        let variables = cart_create::Variables {
            input: cart_create::CartInput {
                lines: line_inputs(lines),
                discount_codes,
                gift_card_codes,
            },
        };

        let data = self.execute::<CartCreate>(variables).await?;
        cart_from_payload(data.cart_create, "create cart")
    }

    /// Get an existing cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the cart no longer exists (e.g. it expired or
    /// was checked out), or an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
        let variables = get_cart::Variables {
            cart_id: cart_id.to_string(),
        };

        let data = self.execute::<GetCart>(variables).await?;

        data.cart
            .map(convert_cart)
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    pub async fn add_lines(&self, cart_id: &CartId, lines: &[LineAdd]) -> Result<Cart, ShopifyError> {
        let variables = cart_lines_add::Variables {
            cart_id: cart_id.to_string(),
            lines: line_inputs(lines),
        };

        let data = self.execute::<CartLinesAdd>(variables).await?;
        cart_from_payload(data.cart_lines_add, "add to cart")
    }

    /// Set absolute quantities on existing lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    pub async fn update_lines(
        &self,
        cart_id: &CartId,
        lines: &[LineUpdate],
    ) -> Result<Cart, ShopifyError> {
        let variables = cart_lines_update::Variables {
            cart_id: cart_id.to_string(),
            lines: lines
                .iter()
                .map(|line| wire::CartLineUpdateInput {
                    id: line.id.to_string(),
                    quantity: i64::from(line.quantity),
                })
                .collect(),
        };

        let data = self.execute::<CartLinesUpdate>(variables).await?;
        cart_from_payload(data.cart_lines_update, "update cart")
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    pub async fn remove_lines(
        &self,
        cart_id: &CartId,
        line_ids: &[CartLineId],
    ) -> Result<Cart, ShopifyError> {
        let variables = cart_lines_remove::Variables {
            cart_id: cart_id.to_string(),
            line_ids: line_ids.iter().map(ToString::to_string).collect(),
        };

        let data = self.execute::<CartLinesRemove>(variables).await?;
        cart_from_payload(data.cart_lines_remove, "remove from cart")
    }

    /// Replace the discount codes on a cart. An empty list clears them.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn update_discount_codes(
        &self,
        cart_id: &CartId,
        discount_codes: &[String],
    ) -> Result<Cart, ShopifyError> {
        let variables = cart_discount_codes_update::Variables {
            cart_id: cart_id.to_string(),
            discount_codes: discount_codes.to_vec(),
        };

        let data = self.execute::<CartDiscountCodesUpdate>(variables).await?;
        cart_from_payload(data.cart_discount_codes_update, "update discount codes")
    }

    /// Apply gift card codes to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, gift_card_codes), fields(cart_id = %cart_id))]
    pub async fn update_gift_card_codes(
        &self,
        cart_id: &CartId,
        gift_card_codes: &[String],
    ) -> Result<Cart, ShopifyError> {
        let variables = cart_gift_card_codes_update::Variables {
            cart_id: cart_id.to_string(),
            gift_card_codes: gift_card_codes.to_vec(),
        };

        let data = self.execute::<CartGiftCardCodesUpdate>(variables).await?;
        cart_from_payload(data.cart_gift_card_codes_update, "apply gift card")
    }

    /// Remove applied gift cards from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn remove_gift_cards(
        &self,
        cart_id: &CartId,
        gift_card_ids: &[GiftCardId],
    ) -> Result<Cart, ShopifyError> {
        let variables = cart_gift_card_codes_remove::Variables {
            cart_id: cart_id.to_string(),
            applied_gift_card_ids: gift_card_ids.iter().map(ToString::to_string).collect(),
        };

        let data = self.execute::<CartGiftCardCodesRemove>(variables).await?;
        cart_from_payload(data.cart_gift_card_codes_remove, "remove gift card")
    }

    /// Send a cart mutation to the matching Storefront API operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    pub async fn apply_cart_mutation(
        &self,
        cart_id: &CartId,
        mutation: &CartMutation,
    ) -> Result<Cart, ShopifyError> {
        match mutation {
            CartMutation::AddLines(lines) => self.add_lines(cart_id, lines).await,
            CartMutation::UpdateLines(lines) => self.update_lines(cart_id, lines).await,
            CartMutation::RemoveLines(ids) => self.remove_lines(cart_id, ids).await,
            CartMutation::DiscountCodesUpdate(codes) => {
                self.update_discount_codes(cart_id, codes).await
            }
            CartMutation::GiftCardCodesUpdate(codes) => {
                self.update_gift_card_codes(cart_id, codes).await
            }
            CartMutation::GiftCardCodesRemove(ids) => self.remove_gift_cards(cart_id, ids).await,
        }
    }

    // =========================================================================
    // Customer Methods (not cached)
    // =========================================================================

    /// Log a customer in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `UserError` for bad credentials, or an error if the API
    /// request fails.
    #[instrument(skip(self, password))]
    pub async fn create_customer_access_token(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CustomerAccessToken, ShopifyError> {
        let variables = customer_access_token_create::Variables {
            input: customer_access_token_create::Input {
                email: email.to_string(),
                password: password.to_string(),
            },
        };

        let data = self.execute::<CustomerAccessTokenCreate>(variables).await?;
        let payload = data
            .customer_access_token_create
            .ok_or_else(|| missing_payload("log in"))?;

        if let Some(message) = first_user_error(&payload.customer_user_errors) {
            return Err(ShopifyError::UserError(message));
        }

        payload
            .customer_access_token
            .map(convert_access_token)
            .ok_or_else(|| ShopifyError::UserError("Invalid email or password".to_string()))
    }

    /// Register a new customer. Returns the new customer's ID.
    ///
    /// # Errors
    ///
    /// Returns `UserError` when Shopify rejects the input (e.g. the email is
    /// taken), or an error if the API request fails.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_customer(&self, input: CustomerCreateInput) -> Result<String, ShopifyError> {
        let variables = customer_create::Variables {
            input: customer_create::Input {
                email: input.email,
                password: input.password,
                first_name: input.first_name,
                last_name: input.last_name,
                accepts_marketing: input.accepts_marketing,
            },
        };

        let data = self.execute::<CustomerCreate>(variables).await?;
        let payload = data
            .customer_create
            .ok_or_else(|| missing_payload("create customer"))?;

        if let Some(message) = first_user_error(&payload.customer_user_errors) {
            return Err(ShopifyError::UserError(message));
        }

        payload
            .customer
            .map(|c| c.id)
            .ok_or_else(|| missing_payload("create customer"))
    }

    /// Fetch the customer behind an access token.
    ///
    /// Returns `None` when the token is expired or revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, access_token))]
    pub async fn get_customer(&self, access_token: &str) -> Result<Option<Customer>, ShopifyError> {
        let variables = get_customer::Variables {
            customer_access_token: access_token.to_string(),
        };

        let data = self.execute::<GetCustomer>(variables).await?;
        Ok(data.customer.map(convert_customer))
    }

    /// Revoke a customer access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, access_token))]
    pub async fn delete_customer_access_token(&self, access_token: &str) -> Result<(), ShopifyError> {
        let variables = customer_access_token_delete::Variables {
            customer_access_token: access_token.to_string(),
        };

        let data = self.execute::<CustomerAccessTokenDelete>(variables).await?;
        if let Some(message) = data
            .customer_access_token_delete
            .and_then(|p| first_user_error(&p.user_errors))
        {
            return Err(ShopifyError::UserError(message));
        }
        Ok(())
    }
}

fn line_inputs(lines: &[LineAdd]) -> Vec<wire::CartLineInput> {
    lines
        .iter()
        .map(|line| wire::CartLineInput {
            merchandise_id: line.merchandise_id.to_string(),
            quantity: i64::from(line.quantity),
        })
        .collect()
}

fn missing_payload(action: &str) -> ShopifyError {
    ShopifyError::GraphQL(vec![GraphQLError::message(format!("Failed to {action}"))])
}

/// Unwrap a cart mutation payload: user errors first, then the cart.
fn cart_from_payload(
    payload: Option<wire::CartPayload>,
    action: &str,
) -> Result<Cart, ShopifyError> {
    let payload = payload.ok_or_else(|| missing_payload(action))?;

    if let Some(message) = first_user_error(&payload.user_errors) {
        return Err(ShopifyError::UserError(message));
    }

    payload
        .cart
        .map(convert_cart)
        .ok_or_else(|| missing_payload(action))
}
