//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;
use wellspring_core::cart::Image;
use wellspring_core::format_optional;

use crate::config::AnalyticsConfig;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::shopify::{Product, ProductSortKey, ProductVariant};
use crate::state::AppState;

/// Products per listing page.
pub const PRODUCTS_PER_PAGE: i64 = 24;

/// Image display data for templates.
#[derive(Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

impl ImageView {
    fn from_image(image: &Image, fallback_alt: &str) -> Self {
        Self {
            url: image.url.clone(),
            alt: image
                .alt_text
                .clone()
                .filter(|alt| !alt.is_empty())
                .unwrap_or_else(|| fallback_alt.to_string()),
        }
    }
}

/// Product card data for listings. A missing image renders as a neutral
/// block, a missing price as `-`.
#[derive(Clone)]
pub struct ProductCardView {
    pub handle: String,
    pub title: String,
    pub product_type: Option<String>,
    pub price: String,
    pub from_price: bool,
    pub image: Option<ImageView>,
    pub available: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            product_type: product.product_type.clone(),
            price: product.price_display(),
            from_price: product.has_price_range(),
            image: product
                .featured_image
                .as_ref()
                .map(|img| ImageView::from_image(img, &product.title)),
            available: product.available_for_sale,
        }
    }
}

/// Variant display data for templates.
#[derive(Clone)]
pub struct VariantView {
    pub id: String,
    pub title: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub available: bool,
    pub selected: bool,
}

impl VariantView {
    fn new(variant: &ProductVariant, selected: bool) -> Self {
        Self {
            id: variant.id.to_string(),
            title: variant.title.clone(),
            price: format_optional(variant.price.as_ref()),
            compare_at_price: variant
                .compare_at_price
                .as_ref()
                .filter(|compare| Some(*compare) != variant.price.as_ref())
                .map(ToString::to_string),
            available: variant.available_for_sale,
            selected,
        }
    }
}

/// Product detail data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub handle: String,
    pub title: String,
    pub product_type: Option<String>,
    pub description_html: String,
    pub image: Option<ImageView>,
    pub thumbnails: Vec<ImageView>,
    pub variants: Vec<VariantView>,
    /// Single-variant products hide the variant picker.
    pub show_variants: bool,
    pub selected: Option<VariantView>,
}

impl ProductView {
    /// Build the detail view with `variant_id` preselected when it belongs to
    /// the product.
    #[must_use]
    pub fn new(product: &Product, variant_id: Option<&str>) -> Self {
        let selected = variant_id
            .and_then(|id| product.variants.iter().find(|v| v.id.as_str() == id))
            .or_else(|| product.selected_variant());

        let variants: Vec<VariantView> = product
            .variants
            .iter()
            .map(|variant| VariantView::new(variant, Some(variant) == selected))
            .collect();

        let image = selected
            .and_then(|variant| variant.image.as_ref())
            .or(product.featured_image.as_ref())
            .map(|img| ImageView::from_image(img, &product.title));

        Self {
            handle: product.handle.clone(),
            title: product.title.clone(),
            product_type: product.product_type.clone(),
            description_html: product.description_html.clone(),
            image,
            thumbnails: product
                .images
                .iter()
                .take(5)
                .map(|img| ImageView::from_image(img, &product.title))
                .collect(),
            show_variants: !(variants.len() == 1 && selected.is_some_and(ProductVariant::is_default)),
            selected: variants.iter().find(|v| v.selected).cloned(),
            variants,
        }
    }
}

/// Pagination and sorting query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Cursor of the last product on the previous page.
    pub after: Option<String>,
    pub sort: Option<String>,
}

/// Variant selection on the product page.
#[derive(Debug, Deserialize)]
pub struct VariantQuery {
    pub variant: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub title: String,
    pub products: Vec<ProductCardView>,
    pub sort: String,
    pub next_cursor: Option<String>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Fetch one page of the whole catalog, sorted per `query`.
pub(crate) async fn catalog_page(
    state: &AppState,
    query: &ListingQuery,
) -> Result<(Vec<ProductCardView>, Option<String>)> {
    let sort = query.sort.as_deref().and_then(ProductSortKey::from_query);
    let connection = state
        .storefront()
        .get_products(PRODUCTS_PER_PAGE, query.after.clone(), sort)
        .await?;

    Ok((
        connection.products.iter().map(ProductCardView::from).collect(),
        connection.page_info.next_cursor().map(String::from),
    ))
}

/// Display product listing page.
#[instrument(skip(state, nonce))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
    nonce: CspNonce,
) -> Result<impl IntoResponse> {
    let (products, next_cursor) = catalog_page(&state, &query).await?;

    Ok(ProductsIndexTemplate {
        title: "All products".to_string(),
        products,
        sort: query.sort.unwrap_or_default(),
        next_cursor,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    })
}

/// Display product detail page.
#[instrument(skip(state, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<VariantQuery>,
    nonce: CspNonce,
) -> Result<impl IntoResponse> {
    let product = state
        .storefront()
        .get_product_by_handle(&handle)
        .await
        .map_err(|e| match e {
            crate::shopify::ShopifyError::NotFound(_) => {
                AppError::NotFound(format!("product {handle}"))
            }
            other => AppError::Shopify(other),
        })?;

    Ok(ProductShowTemplate {
        product: ProductView::new(&product, query.variant.as_deref()),
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    })
}
