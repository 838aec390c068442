//! GraphQL operations for the Storefront API.
//!
//! Each operation is a unit struct implementing [`GraphQLQuery`], with its
//! `Variables` and `ResponseData` in a snake-case module of the same name.
//! Wire types mirror the JSON shape only; conversion into domain types
//! happens in `conversions`.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

// =============================================================================
// Fragments
// =============================================================================

macro_rules! money_fields {
    () => {
        "{ amount currencyCode }"
    };
}

macro_rules! image_fields {
    () => {
        "{ url altText width height }"
    };
}

macro_rules! page_info_fields {
    () => {
        "pageInfo { hasNextPage hasPreviousPage startCursor endCursor }"
    };
}

macro_rules! product_card_fragment {
    () => {
        concat!(
            "fragment ProductCard on Product { id handle title description productType vendor tags availableForSale featuredImage ",
            image_fields!(),
            " priceRange { minVariantPrice ",
            money_fields!(),
            " maxVariantPrice ",
            money_fields!(),
            " } }"
        )
    };
}

macro_rules! cart_fragment {
    () => {
        concat!(
            "fragment CartFields on Cart { id checkoutUrl totalQuantity cost { subtotalAmount ",
            money_fields!(),
            " totalAmount ",
            money_fields!(),
            " } discountCodes { code applicable } appliedGiftCards { id lastCharacters } ",
            "lines(first: 100) { nodes { id quantity cost { amountPerQuantity ",
            money_fields!(),
            " totalAmount ",
            money_fields!(),
            " } merchandise { ... on ProductVariant { id title image ",
            image_fields!(),
            " selectedOptions { name value } product { title handle productType } } } } } }"
        )
    };
}

macro_rules! cart_payload {
    () => {
        "{ cart { ...CartFields } userErrors { field message } }"
    };
}

/// Implement [`GraphQLQuery`] for a hand-written operation.
macro_rules! operation {
    ($name:ident, $module:ident, $document:expr) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $document,
                    operation_name: stringify!($name),
                }
            }
        }
    };
}

// =============================================================================
// Shared Wire Types
// =============================================================================

/// Wire types shared across operations.
pub mod wire {
    use super::{Deserialize, Serialize};

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Money {
        pub amount: String,
        pub currency_code: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Image {
        pub url: String,
        pub alt_text: Option<String>,
        pub width: Option<i64>,
        pub height: Option<i64>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PageInfo {
        pub has_next_page: bool,
        pub has_previous_page: bool,
        pub start_cursor: Option<String>,
        pub end_cursor: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct Nodes<T> {
        #[serde(default = "Vec::new")]
        pub nodes: Vec<T>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Page<T> {
        #[serde(default = "Vec::new")]
        pub nodes: Vec<T>,
        #[serde(default)]
        pub page_info: PageInfo,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct SelectedOption {
        pub name: String,
        pub value: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct UserError {
        #[serde(default)]
        pub field: Option<Vec<String>>,
        pub message: String,
    }

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PriceRange {
        pub min_variant_price: Option<Money>,
        pub max_variant_price: Option<Money>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductCard {
        pub id: String,
        pub handle: String,
        pub title: String,
        #[serde(default)]
        pub description: String,
        pub product_type: Option<String>,
        pub vendor: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
        #[serde(default)]
        pub available_for_sale: bool,
        pub featured_image: Option<Image>,
        pub price_range: Option<PriceRange>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct ProductOption {
        pub name: String,
        #[serde(default)]
        pub values: Vec<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductVariant {
        pub id: String,
        pub title: String,
        #[serde(default)]
        pub available_for_sale: bool,
        pub price: Option<Money>,
        pub compare_at_price: Option<Money>,
        #[serde(default)]
        pub selected_options: Vec<SelectedOption>,
        pub image: Option<Image>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductDetail {
        #[serde(flatten)]
        pub card: ProductCard,
        #[serde(default)]
        pub description_html: String,
        pub images: Option<Nodes<Image>>,
        #[serde(default)]
        pub options: Vec<ProductOption>,
        pub variants: Option<Nodes<ProductVariant>>,
    }

    // -------------------------------------------------------------------------
    // Collections
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CollectionCard {
        pub id: String,
        pub handle: String,
        pub title: String,
        #[serde(default)]
        pub description: String,
        pub image: Option<Image>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CollectionDetail {
        #[serde(flatten)]
        pub card: CollectionCard,
        #[serde(default)]
        pub description_html: String,
        pub products: Option<Page<ProductCard>>,
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartCost {
        pub subtotal_amount: Option<Money>,
        pub total_amount: Option<Money>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartDiscountCode {
        pub code: String,
        #[serde(default)]
        pub applicable: bool,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AppliedGiftCard {
        pub id: String,
        #[serde(default)]
        pub last_characters: String,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartLineCost {
        pub amount_per_quantity: Option<Money>,
        pub total_amount: Option<Money>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MerchandiseProduct {
        pub title: String,
        pub handle: String,
        pub product_type: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Merchandise {
        pub id: String,
        #[serde(default)]
        pub title: Option<String>,
        pub image: Option<Image>,
        #[serde(default)]
        pub selected_options: Vec<SelectedOption>,
        pub product: Option<MerchandiseProduct>,
    }

    #[derive(Debug, Clone, Deserialize)]
    pub struct CartLine {
        pub id: String,
        pub quantity: i64,
        pub cost: Option<CartLineCost>,
        pub merchandise: Merchandise,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Cart {
        pub id: String,
        pub checkout_url: Option<String>,
        #[serde(default)]
        pub total_quantity: i64,
        pub cost: Option<CartCost>,
        #[serde(default)]
        pub discount_codes: Vec<CartDiscountCode>,
        #[serde(default)]
        pub applied_gift_cards: Vec<AppliedGiftCard>,
        pub lines: Nodes<CartLine>,
    }

    /// Payload shared by every cart mutation.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartPayload {
        pub cart: Option<Cart>,
        #[serde(default)]
        pub user_errors: Vec<UserError>,
    }

    /// Line input for `cartCreate` and `cartLinesAdd`.
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartLineInput {
        pub merchandise_id: String,
        pub quantity: i64,
    }

    /// Line input for `cartLinesUpdate`.
    #[derive(Debug, Clone, Serialize)]
    pub struct CartLineUpdateInput {
        pub id: String,
        pub quantity: i64,
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Customer {
        pub id: String,
        pub email: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        #[serde(default)]
        pub display_name: String,
        pub phone: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CustomerAccessToken {
        pub access_token: String,
        pub expires_at: String,
    }
}

// =============================================================================
// Products
// =============================================================================

operation!(
    GetProductByHandle,
    get_product_by_handle,
    concat!(
        "query GetProductByHandle($handle: String!, $imageCount: Int!, $variantCount: Int!) { ",
        "product(handle: $handle) { ...ProductCard descriptionHtml ",
        "images(first: $imageCount) { nodes ",
        image_fields!(),
        " } options { name values } variants(first: $variantCount) { nodes { id title availableForSale price ",
        money_fields!(),
        " compareAtPrice ",
        money_fields!(),
        " selectedOptions { name value } image ",
        image_fields!(),
        " } } } } ",
        product_card_fragment!()
    )
);

pub mod get_product_by_handle {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub handle: String,
        pub image_count: i64,
        pub variant_count: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub product: Option<wire::ProductDetail>,
    }
}

operation!(
    GetProducts,
    get_products,
    concat!(
        "query GetProducts($first: Int!, $after: String, $query: String, $sortKey: ProductSortKeys, $reverse: Boolean) { ",
        "products(first: $first, after: $after, query: $query, sortKey: $sortKey, reverse: $reverse) { nodes { ...ProductCard } ",
        page_info_fields!(),
        " } } ",
        product_card_fragment!()
    )
);

pub mod get_products {
    use super::{Deserialize, Serialize, wire};
    use crate::shopify::types::ProductSortKey;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub first: i64,
        pub after: Option<String>,
        pub query: Option<String>,
        pub sort_key: Option<ProductSortKey>,
        pub reverse: Option<bool>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub products: wire::Page<wire::ProductCard>,
    }
}

// =============================================================================
// Collections
// =============================================================================

operation!(
    GetCollectionByHandle,
    get_collection_by_handle,
    concat!(
        "query GetCollectionByHandle($handle: String!, $productCount: Int!, $after: String) { ",
        "collection(handle: $handle) { id handle title description descriptionHtml image ",
        image_fields!(),
        " products(first: $productCount, after: $after) { nodes { ...ProductCard } ",
        page_info_fields!(),
        " } } } ",
        product_card_fragment!()
    )
);

pub mod get_collection_by_handle {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub handle: String,
        pub product_count: i64,
        pub after: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub collection: Option<wire::CollectionDetail>,
    }
}

operation!(
    GetCollections,
    get_collections,
    concat!(
        "query GetCollections($first: Int!, $after: String) { ",
        "collections(first: $first, after: $after) { nodes { id handle title description image ",
        image_fields!(),
        " } ",
        page_info_fields!(),
        " } }"
    )
);

pub mod get_collections {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub first: i64,
        pub after: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub collections: wire::Page<wire::CollectionCard>,
    }
}

// =============================================================================
// Cart
// =============================================================================

operation!(
    GetCart,
    get_cart,
    concat!(
        "query GetCart($cartId: ID!) { cart(id: $cartId) { ...CartFields } } ",
        cart_fragment!()
    )
);

pub mod get_cart {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub cart: Option<wire::Cart>,
    }
}

operation!(
    CartCreate,
    cart_create,
    concat!(
        "mutation CartCreate($input: CartInput!) { cartCreate(input: $input) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_create {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CartInput {
        pub lines: Vec<wire::CartLineInput>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub discount_codes: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub gift_card_codes: Vec<String>,
    }

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: CartInput,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_create: Option<wire::CartPayload>,
    }
}

operation!(
    CartLinesAdd,
    cart_lines_add,
    concat!(
        "mutation CartLinesAdd($cartId: ID!, $lines: [CartLineInput!]!) { ",
        "cartLinesAdd(cartId: $cartId, lines: $lines) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_lines_add {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub lines: Vec<wire::CartLineInput>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_add: Option<wire::CartPayload>,
    }
}

operation!(
    CartLinesUpdate,
    cart_lines_update,
    concat!(
        "mutation CartLinesUpdate($cartId: ID!, $lines: [CartLineUpdateInput!]!) { ",
        "cartLinesUpdate(cartId: $cartId, lines: $lines) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_lines_update {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub lines: Vec<wire::CartLineUpdateInput>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_update: Option<wire::CartPayload>,
    }
}

operation!(
    CartLinesRemove,
    cart_lines_remove,
    concat!(
        "mutation CartLinesRemove($cartId: ID!, $lineIds: [ID!]!) { ",
        "cartLinesRemove(cartId: $cartId, lineIds: $lineIds) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_lines_remove {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub line_ids: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_lines_remove: Option<wire::CartPayload>,
    }
}

operation!(
    CartDiscountCodesUpdate,
    cart_discount_codes_update,
    concat!(
        "mutation CartDiscountCodesUpdate($cartId: ID!, $discountCodes: [String!]!) { ",
        "cartDiscountCodesUpdate(cartId: $cartId, discountCodes: $discountCodes) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_discount_codes_update {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub discount_codes: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_discount_codes_update: Option<wire::CartPayload>,
    }
}

operation!(
    CartGiftCardCodesUpdate,
    cart_gift_card_codes_update,
    concat!(
        "mutation CartGiftCardCodesUpdate($cartId: ID!, $giftCardCodes: [String!]!) { ",
        "cartGiftCardCodesUpdate(cartId: $cartId, giftCardCodes: $giftCardCodes) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_gift_card_codes_update {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub gift_card_codes: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_gift_card_codes_update: Option<wire::CartPayload>,
    }
}

operation!(
    CartGiftCardCodesRemove,
    cart_gift_card_codes_remove,
    concat!(
        "mutation CartGiftCardCodesRemove($cartId: ID!, $appliedGiftCardIds: [ID!]!) { ",
        "cartGiftCardCodesRemove(cartId: $cartId, appliedGiftCardIds: $appliedGiftCardIds) ",
        cart_payload!(),
        " } ",
        cart_fragment!()
    )
);

pub mod cart_gift_card_codes_remove {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub cart_id: String,
        pub applied_gift_card_ids: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub cart_gift_card_codes_remove: Option<wire::CartPayload>,
    }
}

// =============================================================================
// Customers
// =============================================================================

operation!(
    CustomerAccessTokenCreate,
    customer_access_token_create,
    "mutation CustomerAccessTokenCreate($input: CustomerAccessTokenCreateInput!) { \
     customerAccessTokenCreate(input: $input) { customerAccessToken { accessToken expiresAt } \
     customerUserErrors { field message } } }"
);

pub mod customer_access_token_create {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    pub struct Input {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: Input,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub customer_access_token: Option<wire::CustomerAccessToken>,
        #[serde(default)]
        pub customer_user_errors: Vec<wire::UserError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub customer_access_token_create: Option<Payload>,
    }
}

operation!(
    CustomerAccessTokenDelete,
    customer_access_token_delete,
    "mutation CustomerAccessTokenDelete($customerAccessToken: String!) { \
     customerAccessTokenDelete(customerAccessToken: $customerAccessToken) { \
     userErrors { field message } } }"
);

pub mod customer_access_token_delete {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub customer_access_token: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        #[serde(default)]
        pub user_errors: Vec<wire::UserError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub customer_access_token_delete: Option<Payload>,
    }
}

operation!(
    CustomerCreate,
    customer_create,
    "mutation CustomerCreate($input: CustomerCreateInput!) { customerCreate(input: $input) { \
     customer { id } customerUserErrors { field message } } }"
);

pub mod customer_create {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Input {
        pub email: String,
        pub password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub first_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub last_name: Option<String>,
        pub accepts_marketing: bool,
    }

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: Input,
    }

    #[derive(Debug, Deserialize)]
    pub struct CreatedCustomer {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub customer: Option<CreatedCustomer>,
        #[serde(default)]
        pub customer_user_errors: Vec<wire::UserError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub customer_create: Option<Payload>,
    }
}

operation!(
    GetCustomer,
    get_customer,
    "query GetCustomer($customerAccessToken: String!) { \
     customer(customerAccessToken: $customerAccessToken) { id email firstName lastName displayName phone } }"
);

pub mod get_customer {
    use super::{Deserialize, Serialize, wire};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub customer_access_token: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub customer: Option<wire::Customer>,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_sets_operation_name() {
        let body = GetCart::build_query(get_cart::Variables {
            cart_id: "gid://shopify/Cart/1".to_string(),
        });
        assert_eq!(body.operation_name, "GetCart");
        assert!(body.query.contains("fragment CartFields on Cart"));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["variables"]["cartId"], "gid://shopify/Cart/1");
        assert_eq!(json["operationName"], "GetCart");
    }

    #[test]
    fn test_cart_documents_include_fragment() {
        for document in [
            CartLinesAdd::build_query(cart_lines_add::Variables {
                cart_id: String::new(),
                lines: Vec::new(),
            })
            .query,
            CartGiftCardCodesRemove::build_query(cart_gift_card_codes_remove::Variables {
                cart_id: String::new(),
                applied_gift_card_ids: Vec::new(),
            })
            .query,
        ] {
            assert!(document.contains("...CartFields"));
            assert!(document.contains("appliedGiftCards { id lastCharacters }"));
            assert!(document.contains("userErrors { field message }"));
        }
    }

    #[test]
    fn test_token_delete_selects_only_user_errors() {
        let body = CustomerAccessTokenDelete::build_query(customer_access_token_delete::Variables {
            customer_access_token: "token".to_string(),
        });
        assert!(!body.query.contains("deletedAccessToken"));

        let data: customer_access_token_delete::ResponseData = serde_json::from_value(
            serde_json::json!({
                "customerAccessTokenDelete": {
                    "deletedAccessToken": "token",
                    "userErrors": [{"field": null, "message": "Token expired", "code": "TOKEN_INVALID"}]
                }
            }),
        )
        .unwrap();
        let payload = data.customer_access_token_delete.unwrap();
        assert_eq!(payload.user_errors.first().unwrap().message, "Token expired");
    }

    #[test]
    fn test_cart_create_skips_empty_codes() {
        let variables = cart_create::Variables {
            input: cart_create::CartInput {
                lines: vec![wire::CartLineInput {
                    merchandise_id: "gid://shopify/ProductVariant/1".to_string(),
                    quantity: 2,
                }],
                discount_codes: Vec::new(),
                gift_card_codes: Vec::new(),
            },
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["input"]["lines"][0]["merchandiseId"], "gid://shopify/ProductVariant/1");
        assert!(json["input"].get("discountCodes").is_none());
    }

    #[test]
    fn test_sort_key_serializes_as_enum() {
        let variables = get_products::Variables {
            first: 8,
            after: None,
            query: None,
            sort_key: Some(crate::shopify::types::ProductSortKey::BestSelling),
            reverse: None,
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["sortKey"], "BEST_SELLING");
    }

    #[test]
    fn test_product_detail_flattens_card() {
        let json = serde_json::json!({
            "product": {
                "id": "gid://shopify/Product/1",
                "handle": "semaglutide",
                "title": "Semaglutide",
                "descriptionHtml": "<p>Weekly</p>",
                "availableForSale": true,
                "priceRange": {
                    "minVariantPrice": {"amount": "199.0", "currencyCode": "USD"},
                    "maxVariantPrice": {"amount": "299.0", "currencyCode": "USD"}
                },
                "variants": {"nodes": [{"id": "v1", "title": "Default Title", "availableForSale": true}]}
            }
        });
        let data: get_product_by_handle::ResponseData = serde_json::from_value(json).unwrap();
        let product = data.product.unwrap();
        assert_eq!(product.card.handle, "semaglutide");
        assert_eq!(product.description_html, "<p>Weekly</p>");
        assert_eq!(product.variants.unwrap().nodes.len(), 1);
    }
}
