//! Optimistic cart adapter.
//!
//! The server owns the cart. This module predicts the effect of a mutation
//! locally ([`apply_mutation`]), adopts the authoritative cart when the
//! response lands ([`reconcile`]), and tracks which requests are in flight
//! ([`OptimisticCart`]).

mod controls;
mod model;
mod mutation;
mod optimistic;
mod projection;

pub use controls::LineControls;
pub use model::{
    AppliedGiftCard, Cart, CartCost, CartLine, DiscountCode, Image, LineCost, LineMerchandise,
    SelectedOption,
};
pub use mutation::{
    CartError, CartMutation, LineAdd, LineUpdate, MutationKey, MutationKind, PendingMutation,
    normalize_gift_card_code,
};
pub use optimistic::{CartEvent, OptimisticCart, Submission};
pub use projection::{apply_mutation, reconcile};
