//! Pure cart transitions: local prediction and server reconciliation.

use super::model::{AppliedGiftCard, Cart, CartLine, DiscountCode};
use super::mutation::{CartMutation, normalize_gift_card_code};
use crate::types::GiftCardId;

/// Number of trailing code characters Shopify exposes for an applied gift card.
const GIFT_CARD_VISIBLE_CHARS: usize = 4;

/// Predict the cart the server will return for `mutation`.
///
/// The result is flagged optimistic, as is every line the mutation added or
/// changed. `total_quantity` always matches the lines afterwards.
#[must_use]
pub fn apply_mutation(cart: &Cart, mutation: &CartMutation) -> Cart {
    let mut next = cart.clone();

    match mutation {
        CartMutation::AddLines(adds) => {
            for add in adds.iter().filter(|add| add.quantity > 0) {
                if let Some(line) = next
                    .lines
                    .iter_mut()
                    .find(|line| line.merchandise_id == add.merchandise_id)
                {
                    line.set_quantity(line.quantity.saturating_add(add.quantity));
                    line.is_optimistic = true;
                } else {
                    next.lines
                        .push(CartLine::placeholder(add.merchandise_id.clone(), add.quantity));
                }
            }
        }
        CartMutation::UpdateLines(updates) => {
            for update in updates {
                if update.quantity == 0 {
                    next.lines.retain(|line| line.id != update.id);
                } else if let Some(line) = next.lines.iter_mut().find(|line| line.id == update.id)
                {
                    line.set_quantity(update.quantity);
                    line.is_optimistic = true;
                }
            }
        }
        CartMutation::RemoveLines(ids) => {
            next.lines.retain(|line| !ids.contains(&line.id));
        }
        CartMutation::DiscountCodesUpdate(codes) => {
            next.discount_codes = replace_discount_codes(&cart.discount_codes, codes);
        }
        CartMutation::GiftCardCodesUpdate(codes) => {
            next.applied_gift_cards = replace_gift_cards(&cart.applied_gift_cards, codes);
        }
        CartMutation::GiftCardCodesRemove(ids) => {
            next.applied_gift_cards.retain(|card| !ids.contains(&card.id));
        }
    }

    next.is_optimistic = true;
    next.recompute_total_quantity();
    if mutation.kind().touches_lines() {
        next.recompute_cost();
    }
    next
}

/// Adopt the server's cart wholesale. No field of the prior projection survives.
#[must_use]
pub fn reconcile(server_cart: Cart) -> Cart {
    server_cart.into_confirmed()
}

fn replace_discount_codes(current: &[DiscountCode], codes: &[String]) -> Vec<DiscountCode> {
    let mut out: Vec<DiscountCode> = Vec::with_capacity(codes.len());
    for code in codes.iter().map(|code| code.trim()).filter(|c| !c.is_empty()) {
        if out.iter().any(|existing| existing.code.eq_ignore_ascii_case(code)) {
            continue;
        }
        // Known codes keep their verdict; new ones are shown until the server says otherwise.
        let applicable = current
            .iter()
            .find(|existing| existing.code.eq_ignore_ascii_case(code))
            .is_none_or(|existing| existing.applicable);
        out.push(DiscountCode {
            code: code.to_string(),
            applicable,
        });
    }
    out
}

fn replace_gift_cards(current: &[AppliedGiftCard], codes: &[String]) -> Vec<AppliedGiftCard> {
    let mut out: Vec<AppliedGiftCard> = Vec::with_capacity(codes.len());
    for code in codes.iter().map(|code| normalize_gift_card_code(code)) {
        if code.is_empty() {
            continue;
        }
        let last_characters = last_chars(&code, GIFT_CARD_VISIBLE_CHARS);
        if out.iter().any(|card| card.last_characters == last_characters) {
            continue;
        }
        let card = current
            .iter()
            .find(|card| card.last_characters.eq_ignore_ascii_case(&last_characters))
            .cloned()
            .unwrap_or_else(|| AppliedGiftCard {
                id: GiftCardId::placeholder(&code),
                last_characters,
            });
        out.push(card);
    }
    out
}

fn last_chars(code: &str, n: usize) -> String {
    let count = code.chars().count();
    code.chars().skip(count.saturating_sub(n)).collect()
}
