//! Conversions from wire types to domain types.
//!
//! Malformed money never fails a page: unparseable amounts become `None` and
//! render as a placeholder.

use wellspring_core::cart::{
    AppliedGiftCard, Cart, CartCost, CartLine, DiscountCode, Image, LineCost, LineMerchandise,
    SelectedOption,
};
use wellspring_core::{CartId, CartLineId, GiftCardId, MerchandiseId, Money, ProductId};

use super::queries::wire;
use crate::shopify::types::{
    Collection, CollectionConnection, Customer, CustomerAccessToken, PageInfo, PriceRange,
    Product, ProductConnection, ProductOption, ProductVariant,
};

// =============================================================================
// Shared
// =============================================================================

pub fn convert_money(money: Option<wire::Money>) -> Option<Money> {
    let money = money?;
    let parsed = Money::parse(&money.amount, money.currency_code);
    if parsed.is_none() {
        tracing::warn!(amount = %money.amount, "Unparseable amount in Shopify response");
    }
    parsed
}

pub fn convert_image(image: wire::Image) -> Image {
    Image {
        url: image.url,
        alt_text: image.alt_text,
    }
}

fn convert_selected_option(option: wire::SelectedOption) -> SelectedOption {
    SelectedOption {
        name: option.name,
        value: option.value,
    }
}

pub fn convert_page_info(info: wire::PageInfo) -> PageInfo {
    PageInfo {
        has_next_page: info.has_next_page,
        has_previous_page: info.has_previous_page,
        start_cursor: info.start_cursor,
        end_cursor: info.end_cursor,
    }
}

/// First mutation user error, which is the one shown to the user.
pub fn first_user_error(errors: &[wire::UserError]) -> Option<String> {
    let error = errors.first()?;
    tracing::debug!(field = ?error.field, count = errors.len(), "Shopify user error");
    Some(error.message.clone())
}

// =============================================================================
// Products
// =============================================================================

pub fn convert_product_card(card: wire::ProductCard) -> Product {
    let price_range = card.price_range.map_or(
        PriceRange {
            min_variant_price: None,
            max_variant_price: None,
        },
        |range| PriceRange {
            min_variant_price: convert_money(range.min_variant_price),
            max_variant_price: convert_money(range.max_variant_price),
        },
    );

    Product {
        id: ProductId::new(card.id),
        handle: card.handle,
        title: card.title,
        description: card.description,
        description_html: String::new(),
        available_for_sale: card.available_for_sale,
        product_type: card.product_type.filter(|t| !t.is_empty()),
        vendor: card.vendor.filter(|v| !v.is_empty()),
        tags: card.tags,
        price_range,
        featured_image: card.featured_image.map(convert_image),
        images: Vec::new(),
        options: Vec::new(),
        variants: Vec::new(),
    }
}

fn convert_variant(variant: wire::ProductVariant) -> ProductVariant {
    ProductVariant {
        id: MerchandiseId::new(variant.id),
        title: variant.title,
        available_for_sale: variant.available_for_sale,
        price: convert_money(variant.price),
        compare_at_price: convert_money(variant.compare_at_price),
        selected_options: variant
            .selected_options
            .into_iter()
            .map(convert_selected_option)
            .collect(),
        image: variant.image.map(convert_image),
    }
}

pub fn convert_product(detail: wire::ProductDetail) -> Product {
    let mut product = convert_product_card(detail.card);
    product.description_html = detail.description_html;
    product.images = detail
        .images
        .map(|n| n.nodes.into_iter().map(convert_image).collect())
        .unwrap_or_default();
    product.options = detail
        .options
        .into_iter()
        .map(|o| ProductOption {
            name: o.name,
            values: o.values,
        })
        .collect();
    product.variants = detail
        .variants
        .map(|n| n.nodes.into_iter().map(convert_variant).collect())
        .unwrap_or_default();
    product
}

pub fn convert_product_connection(page: wire::Page<wire::ProductCard>) -> ProductConnection {
    ProductConnection {
        products: page.nodes.into_iter().map(convert_product_card).collect(),
        page_info: convert_page_info(page.page_info),
    }
}

// =============================================================================
// Collections
// =============================================================================

fn convert_collection_card(card: wire::CollectionCard) -> Collection {
    Collection {
        id: card.id,
        handle: card.handle,
        title: card.title,
        description: card.description,
        description_html: String::new(),
        image: card.image.map(convert_image),
        products: Vec::new(),
        page_info: PageInfo::default(),
    }
}

pub fn convert_collection(detail: wire::CollectionDetail) -> Collection {
    let mut collection = convert_collection_card(detail.card);
    collection.description_html = detail.description_html;
    if let Some(page) = detail.products {
        let connection = convert_product_connection(page);
        collection.products = connection.products;
        collection.page_info = connection.page_info;
    }
    collection
}

pub fn convert_collection_connection(
    page: wire::Page<wire::CollectionCard>,
) -> CollectionConnection {
    CollectionConnection {
        collections: page.nodes.into_iter().map(convert_collection_card).collect(),
        page_info: convert_page_info(page.page_info),
    }
}

// =============================================================================
// Cart
// =============================================================================

fn convert_cart_line(line: wire::CartLine) -> Option<CartLine> {
    let quantity = u32::try_from(line.quantity).ok().filter(|q| *q > 0)?;
    let merchandise = line.merchandise;

    let cost = line.cost.and_then(|cost| {
        Some(LineCost {
            amount_per_quantity: convert_money(cost.amount_per_quantity)?,
            total_amount: convert_money(cost.total_amount)?,
        })
    });

    let display = merchandise.product.map(|product| LineMerchandise {
        title: merchandise.title.unwrap_or_default(),
        product_title: product.title,
        product_handle: product.handle,
        product_type: product.product_type.filter(|t| !t.is_empty()),
        image: merchandise.image.map(convert_image),
        selected_options: merchandise
            .selected_options
            .into_iter()
            .map(convert_selected_option)
            .collect(),
    });

    Some(CartLine {
        id: CartLineId::new(line.id),
        merchandise_id: MerchandiseId::new(merchandise.id),
        quantity,
        is_optimistic: false,
        merchandise: display,
        cost,
    })
}

/// Convert a server cart into a confirmed core cart.
///
/// Lines with a non-positive quantity are dropped and the total quantity is
/// recomputed from the remaining lines.
pub fn convert_cart(cart: wire::Cart) -> Cart {
    let (subtotal, total) = cart.cost.map_or((None, None), |cost| {
        (
            convert_money(cost.subtotal_amount),
            convert_money(cost.total_amount),
        )
    });

    let mut converted = Cart {
        id: CartId::new(cart.id),
        checkout_url: cart.checkout_url,
        lines: cart
            .lines
            .nodes
            .into_iter()
            .filter_map(convert_cart_line)
            .collect(),
        discount_codes: cart
            .discount_codes
            .into_iter()
            .map(|d| DiscountCode {
                code: d.code,
                applicable: d.applicable,
            })
            .collect(),
        applied_gift_cards: cart
            .applied_gift_cards
            .into_iter()
            .map(|g| AppliedGiftCard {
                id: GiftCardId::new(g.id),
                last_characters: g.last_characters,
            })
            .collect(),
        total_quantity: 0,
        cost: CartCost { subtotal, total },
        is_optimistic: false,
    };
    converted.recompute_total_quantity();

    if i64::from(converted.total_quantity) != cart.total_quantity {
        tracing::debug!(
            reported = cart.total_quantity,
            computed = converted.total_quantity,
            "Cart total quantity differs from line sum"
        );
    }

    converted
}

// =============================================================================
// Customers
// =============================================================================

pub fn convert_customer(customer: wire::Customer) -> Customer {
    Customer {
        id: customer.id,
        email: customer.email,
        first_name: customer.first_name,
        last_name: customer.last_name,
        display_name: customer.display_name,
        phone: customer.phone,
    }
}

pub fn convert_access_token(token: wire::CustomerAccessToken) -> CustomerAccessToken {
    CustomerAccessToken {
        access_token: token.access_token,
        expires_at: token.expires_at,
    }
}
