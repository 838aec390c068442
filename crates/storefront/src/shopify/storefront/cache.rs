//! Cache types for Storefront API responses.

use crate::shopify::types::{Collection, CollectionConnection, Product, ProductConnection};

/// Cached value types. Carts and customers are never cached.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductConnection),
    Collection(Box<Collection>),
    Collections(CollectionConnection),
}

pub fn product_key(handle: &str) -> String {
    format!("product:{handle}")
}

pub fn products_key(first: i64, after: Option<&str>, sort: Option<&str>) -> String {
    format!(
        "products:{first}:{}:{}",
        after.unwrap_or(""),
        sort.unwrap_or("")
    )
}

pub fn collection_key(handle: &str, after: Option<&str>) -> String {
    format!("collection:{handle}:{}", after.unwrap_or(""))
}

pub fn collections_key(after: Option<&str>) -> String {
    format!("collections:{}", after.unwrap_or(""))
}
