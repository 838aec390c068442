//! Collection route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::config::AnalyticsConfig;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::shopify::{Collection, ShopifyError};
use crate::state::AppState;

pub use super::products::{ImageView, ListingQuery, PRODUCTS_PER_PAGE, ProductCardView};

/// Collections shown on the listing page.
const COLLECTIONS_PER_PAGE: i64 = 50;

/// Collection display data for templates.
#[derive(Clone)]
pub struct CollectionView {
    pub handle: String,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<ImageView>,
}

impl From<&Collection> for CollectionView {
    fn from(collection: &Collection) -> Self {
        Self {
            handle: collection.handle.clone(),
            title: collection.title.clone(),
            description: if collection.description.is_empty() {
                None
            } else {
                Some(collection.description.clone())
            },
            image: collection.image.as_ref().map(|img| ImageView {
                url: img.url.clone(),
                alt: img
                    .alt_text
                    .clone()
                    .unwrap_or_else(|| collection.title.clone()),
            }),
        }
    }
}

/// Cursor query for collection pages.
#[derive(Debug, Deserialize)]
pub struct CursorQuery {
    pub after: Option<String>,
}

/// Collection listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "collections/index.html")]
pub struct CollectionsIndexTemplate {
    pub collections: Vec<CollectionView>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Collection detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "collections/show.html")]
pub struct CollectionShowTemplate {
    pub collection: CollectionView,
    pub products: Vec<ProductCardView>,
    pub next_cursor: Option<String>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Display collection listing page.
#[instrument(skip(state, nonce))]
pub async fn index(State(state): State<AppState>, nonce: CspNonce) -> Result<impl IntoResponse> {
    let connection = state
        .storefront()
        .get_collections(COLLECTIONS_PER_PAGE, None)
        .await?;

    Ok(CollectionsIndexTemplate {
        collections: connection
            .collections
            .iter()
            .map(CollectionView::from)
            .collect(),
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    })
}

/// Display collection detail page with one page of products.
#[instrument(skip(state, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<CursorQuery>,
    nonce: CspNonce,
) -> Result<impl IntoResponse> {
    let collection = state
        .storefront()
        .get_collection_by_handle(&handle, PRODUCTS_PER_PAGE, query.after)
        .await
        .map_err(|e| match e {
            ShopifyError::NotFound(_) => AppError::NotFound(format!("collection {handle}")),
            other => AppError::Shopify(other),
        })?;

    Ok(CollectionShowTemplate {
        collection: CollectionView::from(&collection),
        products: collection.products.iter().map(ProductCardView::from).collect(),
        next_cursor: collection.page_info.next_cursor().map(String::from),
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    })
}

/// Display every product as a pseudo-collection.
#[instrument(skip(state, nonce))]
pub async fn all(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
    nonce: CspNonce,
) -> Result<impl IntoResponse> {
    let (products, next_cursor) = super::products::catalog_page(&state, &query).await?;

    Ok(CollectionShowTemplate {
        collection: CollectionView {
            handle: "all".to_string(),
            title: "All products".to_string(),
            description: None,
            image: None,
        },
        products,
        next_cursor,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    })
}
