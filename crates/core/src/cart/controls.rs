//! Quantity edit affordances for a rendered cart line.

use serde::Serialize;

use super::model::CartLine;

/// What the quantity stepper next to a line may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineControls {
    pub quantity: u32,
    /// Quantity the decrement button submits, floored at zero.
    pub previous_quantity: u32,
    pub next_quantity: u32,
    /// Off at quantity one; removal is its own action.
    pub can_decrement: bool,
    pub can_increment: bool,
    pub can_remove: bool,
}

impl LineControls {
    /// Controls for `line`. Everything is disabled while the line is optimistic
    /// so edits to one line never stack on an unconfirmed change.
    #[must_use]
    pub const fn for_line(line: &CartLine) -> Self {
        let settled = !line.is_optimistic;
        Self {
            quantity: line.quantity,
            previous_quantity: line.quantity.saturating_sub(1),
            next_quantity: line.quantity.saturating_add(1),
            can_decrement: settled && line.quantity > 1,
            can_increment: settled,
            can_remove: settled,
        }
    }
}
