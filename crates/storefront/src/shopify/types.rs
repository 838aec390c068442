//! Domain types for the Shopify Storefront API.
//!
//! These are what handlers and templates see. The raw wire shapes live next
//! to their GraphQL documents in `storefront::queries`. Carts use the
//! `wellspring_core::cart` model directly.

use serde::{Deserialize, Serialize};
use wellspring_core::cart::{Image, SelectedOption};
use wellspring_core::{MerchandiseId, Money, ProductId, format_optional};

/// Shopify's title for the only variant of a product without options.
pub const DEFAULT_VARIANT_TITLE: &str = "Default Title";

// =============================================================================
// Money Types
// =============================================================================

/// Price range for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    /// Minimum price among all variants.
    pub min_variant_price: Option<Money>,
    /// Maximum price among all variants.
    pub max_variant_price: Option<Money>,
}

// =============================================================================
// Product Types
// =============================================================================

/// Product option definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    /// Option name (e.g., "Dosage").
    pub name: String,
    /// Available values.
    pub values: Vec<String>,
}

/// A product variant (specific combination of options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: MerchandiseId,
    /// Variant title (combination of option values).
    pub title: String,
    pub available_for_sale: bool,
    /// Missing when the API returned an unparseable amount.
    pub price: Option<Money>,
    /// Compare-at price (original price if on sale).
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<SelectedOption>,
    pub image: Option<Image>,
}

impl ProductVariant {
    /// Whether this is the implicit variant of an option-less product.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.title == DEFAULT_VARIANT_TITLE
    }
}

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// URL handle.
    pub handle: String,
    pub title: String,
    /// Plain text description.
    pub description: String,
    /// HTML description. Empty for card-sized queries.
    pub description_html: String,
    /// Whether any variant is available.
    pub available_for_sale: bool,
    /// Product type/category (e.g. "Weight Loss").
    pub product_type: Option<String>,
    pub vendor: Option<String>,
    pub tags: Vec<String>,
    pub price_range: PriceRange,
    pub featured_image: Option<Image>,
    pub images: Vec<Image>,
    pub options: Vec<ProductOption>,
    /// Empty for card-sized queries.
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Variant preselected on the product page: the first one available for
    /// sale, else the first one.
    #[must_use]
    pub fn selected_variant(&self) -> Option<&ProductVariant> {
        self.variants
            .iter()
            .find(|v| v.available_for_sale)
            .or_else(|| self.variants.first())
    }

    /// Starting price, `-` when unknown.
    #[must_use]
    pub fn price_display(&self) -> String {
        format_optional(self.price_range.min_variant_price.as_ref())
    }

    /// Whether the variants span more than one price.
    #[must_use]
    pub fn has_price_range(&self) -> bool {
        match (
            &self.price_range.min_variant_price,
            &self.price_range.max_variant_price,
        ) {
            (Some(min), Some(max)) => min != max,
            _ => false,
        }
    }
}

// =============================================================================
// Collection Types
// =============================================================================

/// A collection of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub image: Option<Image>,
    /// One page of products; empty for listing queries.
    pub products: Vec<Product>,
    /// Pagination of `products`.
    pub page_info: PageInfo,
}

// =============================================================================
// Pagination Types
// =============================================================================

/// Pagination information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether there are items before this page.
    pub has_previous_page: bool,
    /// Cursor for the first item.
    pub start_cursor: Option<String>,
    /// Cursor for the last item.
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor to request the following page, if there is one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

/// Paginated list of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductConnection {
    pub products: Vec<Product>,
    pub page_info: PageInfo,
}

/// Paginated list of collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConnection {
    pub collections: Vec<Collection>,
    pub page_info: PageInfo,
}

// =============================================================================
// Customer Types
// =============================================================================

/// Storefront customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
    pub phone: Option<String>,
}

/// Token returned by a successful customer login.
///
/// Deliberately not `Debug`-printed anywhere; it grants account access.
#[derive(Clone, Serialize, Deserialize)]
pub struct CustomerAccessToken {
    pub access_token: String,
    /// ISO 8601 expiry as returned by Shopify.
    pub expires_at: String,
}

impl std::fmt::Debug for CustomerAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerAccessToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Input for customer registration.
#[derive(Debug, Clone)]
pub struct CustomerCreateInput {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub accepts_marketing: bool,
}

// =============================================================================
// Sort Keys
// =============================================================================

/// Sort keys for product queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductSortKey {
    Title,
    ProductType,
    UpdatedAt,
    CreatedAt,
    BestSelling,
    Price,
    Relevance,
}

impl ProductSortKey {
    /// Parse the `?sort=` query value used by the listing pages.
    #[must_use]
    pub fn from_query(value: &str) -> Option<(Self, bool)> {
        match value {
            "title" => Some((Self::Title, false)),
            "title-desc" => Some((Self::Title, true)),
            "price" => Some((Self::Price, false)),
            "price-desc" => Some((Self::Price, true)),
            "newest" => Some((Self::CreatedAt, true)),
            "best-selling" => Some((Self::BestSelling, false)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(amount: &str) -> Option<Money> {
        Money::parse(amount, "USD")
    }

    fn variant(id: &str, available: bool) -> ProductVariant {
        ProductVariant {
            id: MerchandiseId::new(id),
            title: DEFAULT_VARIANT_TITLE.to_string(),
            available_for_sale: available,
            price: money("10.00"),
            compare_at_price: None,
            selected_options: Vec::new(),
            image: None,
        }
    }

    fn product(variants: Vec<ProductVariant>, min: Option<Money>, max: Option<Money>) -> Product {
        Product {
            id: ProductId::new("gid://shopify/Product/1"),
            handle: "semaglutide".to_string(),
            title: "Semaglutide".to_string(),
            description: String::new(),
            description_html: String::new(),
            available_for_sale: true,
            product_type: None,
            vendor: None,
            tags: Vec::new(),
            price_range: PriceRange {
                min_variant_price: min,
                max_variant_price: max,
            },
            featured_image: None,
            images: Vec::new(),
            options: Vec::new(),
            variants,
        }
    }

    #[test]
    fn test_selected_variant_prefers_available() {
        let p = product(
            vec![variant("v1", false), variant("v2", true)],
            None,
            None,
        );
        assert_eq!(p.selected_variant().unwrap().id.as_str(), "v2");

        let p = product(vec![variant("v1", false)], None, None);
        assert_eq!(p.selected_variant().unwrap().id.as_str(), "v1");
        assert!(product(Vec::new(), None, None).selected_variant().is_none());
    }

    #[test]
    fn test_price_display_and_range() {
        let p = product(Vec::new(), money("199.00"), money("299.00"));
        assert_eq!(p.price_display(), "$199.00");
        assert!(p.has_price_range());

        let p = product(Vec::new(), None, None);
        assert_eq!(p.price_display(), "-");
        assert!(!p.has_price_range());
    }

    #[test]
    fn test_sort_key_from_query() {
        assert_eq!(
            ProductSortKey::from_query("price-desc"),
            Some((ProductSortKey::Price, true))
        );
        assert_eq!(ProductSortKey::from_query("bogus"), None);
    }

    #[test]
    fn test_next_cursor_only_with_next_page() {
        let info = PageInfo {
            has_next_page: false,
            end_cursor: Some("abc".to_string()),
            ..PageInfo::default()
        };
        assert!(info.next_cursor().is_none());

        let info = PageInfo {
            has_next_page: true,
            ..info
        };
        assert_eq!(info.next_cursor(), Some("abc"));
    }

    #[test]
    fn test_access_token_debug_redacted() {
        let token = CustomerAccessToken {
            access_token: "secret-token".to_string(),
            expires_at: "2030-01-01T00:00:00Z".to_string(),
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
