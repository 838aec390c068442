//! Cart projection types.
//!
//! These mirror the parts of the Shopify cart the storefront renders. The
//! server owns the cart; these values are either a confirmed snapshot of it
//! or a local prediction layered on top (`is_optimistic`).

use serde::{Deserialize, Serialize};

use crate::types::{CartId, CartLineId, GiftCardId, MerchandiseId, Money};

/// Product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub alt_text: Option<String>,
}

/// Selected option on a variant (e.g. `Size: Large`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// Display data for the variant a line points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMerchandise {
    /// Variant title; Shopify uses `"Default Title"` for single-variant products.
    pub title: String,
    pub product_title: String,
    pub product_handle: String,
    pub product_type: Option<String>,
    pub image: Option<Image>,
    pub selected_options: Vec<SelectedOption>,
}

/// Pricing of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCost {
    pub amount_per_quantity: Money,
    pub total_amount: Money,
}

/// One product variant entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Server-assigned once confirmed; a placeholder before that.
    pub id: CartLineId,
    pub merchandise_id: MerchandiseId,
    /// Never zero inside a cart: a zero-quantity line is removed instead.
    pub quantity: u32,
    /// Set while the line reflects a change the server has not confirmed.
    pub is_optimistic: bool,
    pub merchandise: Option<LineMerchandise>,
    pub cost: Option<LineCost>,
}

impl CartLine {
    /// A line predicted locally for merchandise that is not in the cart yet.
    #[must_use]
    pub fn placeholder(merchandise_id: MerchandiseId, quantity: u32) -> Self {
        Self {
            id: CartLineId::placeholder(&merchandise_id),
            merchandise_id,
            quantity,
            is_optimistic: true,
            merchandise: None,
            cost: None,
        }
    }

    /// Set the quantity and keep the line total consistent with the unit price.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        if let Some(cost) = self.cost.as_mut() {
            cost.total_amount = cost.amount_per_quantity.times(quantity);
        }
    }
}

/// Discount code attached to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    pub code: String,
    /// Whether the platform accepted the code for this cart.
    pub applicable: bool,
}

/// Gift card applied to the cart. Only the last characters are ever exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedGiftCard {
    pub id: GiftCardId,
    pub last_characters: String,
}

/// Cart cost summary. Either amount may be missing from a malformed response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCost {
    pub subtotal: Option<Money>,
    pub total: Option<Money>,
}

/// The cart as rendered: either a confirmed server snapshot or a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    /// Externally hosted checkout; handed to the browser unmodified.
    pub checkout_url: Option<String>,
    pub lines: Vec<CartLine>,
    pub discount_codes: Vec<DiscountCode>,
    pub applied_gift_cards: Vec<AppliedGiftCard>,
    /// Always the sum of `lines[].quantity`.
    pub total_quantity: u32,
    pub cost: CartCost,
    pub is_optimistic: bool,
}

impl Cart {
    /// A cart with no lines.
    #[must_use]
    pub fn empty(id: CartId) -> Self {
        Self {
            id,
            checkout_url: None,
            lines: Vec::new(),
            discount_codes: Vec::new(),
            applied_gift_cards: Vec::new(),
            total_quantity: 0,
            cost: CartCost::default(),
            is_optimistic: false,
        }
    }

    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.id == id)
    }

    #[must_use]
    pub fn has_items(&self) -> bool {
        self.total_quantity > 0
    }

    /// Codes the platform accepted; only these are shown as applied.
    #[must_use]
    pub fn applicable_discount_codes(&self) -> Vec<&str> {
        self.discount_codes
            .iter()
            .filter(|code| code.applicable)
            .map(|code| code.code.as_str())
            .collect()
    }

    /// Restore the derived quantity invariant after the line set changed.
    pub fn recompute_total_quantity(&mut self) {
        self.total_quantity = self.lines.iter().map(|line| line.quantity).sum();
    }

    /// Re-derive the subtotal from unit prices after the line set changed.
    ///
    /// Only runs when every line carries a price in a single currency; the
    /// total moves by the same delta as the subtotal so discounts and taxes
    /// the server already computed stay in place until reconciliation.
    pub fn recompute_cost(&mut self) {
        let Some(previous) = self.cost.subtotal.clone() else {
            return;
        };

        let mut subtotal = Money::zero(&*previous.currency_code);
        for line in &self.lines {
            let Some(next) = line
                .cost
                .as_ref()
                .and_then(|cost| subtotal.checked_add(&cost.total_amount))
            else {
                return;
            };
            subtotal = next;
        }

        if let Some(delta) = subtotal.checked_sub(&previous) {
            self.cost.total = self
                .cost
                .total
                .as_ref()
                .and_then(|total| total.checked_add(&delta));
        }
        self.cost.subtotal = Some(subtotal);
    }

    /// Clear every optimistic marker, turning the value into confirmed state.
    #[must_use]
    pub fn into_confirmed(mut self) -> Self {
        self.is_optimistic = false;
        for line in &mut self.lines {
            line.is_optimistic = false;
        }
        self.recompute_total_quantity();
        self
    }
}
