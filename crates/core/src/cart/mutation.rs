//! Cart mutations and their concurrency keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CartLineId, GiftCardId, MerchandiseId};

/// Errors raised before a mutation ever reaches the projection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("{0} needs at least one target")]
    Empty(MutationKind),

    #[error("cannot add zero units of {0}")]
    ZeroQuantity(MerchandiseId),

    #[error("line {0} has not been confirmed yet")]
    UnconfirmedLine(CartLineId),

    #[error("gift card {0} has not been confirmed yet")]
    UnconfirmedGiftCard(GiftCardId),
}

/// The cart actions the storefront can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    AddLines,
    UpdateLines,
    RemoveLines,
    DiscountCodesUpdate,
    GiftCardCodesUpdate,
    GiftCardCodesRemove,
}

impl MutationKind {
    /// Action name used in mutation keys and form payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddLines => "LinesAdd",
            Self::UpdateLines => "LinesUpdate",
            Self::RemoveLines => "LinesRemove",
            Self::DiscountCodesUpdate => "DiscountCodesUpdate",
            Self::GiftCardCodesUpdate => "GiftCardCodesUpdate",
            Self::GiftCardCodesRemove => "GiftCardCodesRemove",
        }
    }

    /// Whether the action changes line quantities (and therefore prices).
    #[must_use]
    pub const fn touches_lines(self) -> bool {
        matches!(self, Self::AddLines | Self::UpdateLines | Self::RemoveLines)
    }

    /// Whether the server applies the action as an increment on top of the
    /// cart rather than setting an absolute value.
    #[must_use]
    pub const fn is_additive(self) -> bool {
        matches!(self, Self::AddLines)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A variant to add and how many units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdd {
    pub merchandise_id: MerchandiseId,
    pub quantity: u32,
}

/// A new absolute quantity for an existing line. Zero removes the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUpdate {
    pub id: CartLineId,
    pub quantity: u32,
}

/// A change the user asked for, before the server has confirmed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartMutation {
    AddLines(Vec<LineAdd>),
    UpdateLines(Vec<LineUpdate>),
    RemoveLines(Vec<CartLineId>),
    DiscountCodesUpdate(Vec<String>),
    GiftCardCodesUpdate(Vec<String>),
    GiftCardCodesRemove(Vec<GiftCardId>),
}

impl CartMutation {
    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::AddLines(_) => MutationKind::AddLines,
            Self::UpdateLines(_) => MutationKind::UpdateLines,
            Self::RemoveLines(_) => MutationKind::RemoveLines,
            Self::DiscountCodesUpdate(_) => MutationKind::DiscountCodesUpdate,
            Self::GiftCardCodesUpdate(_) => MutationKind::GiftCardCodesUpdate,
            Self::GiftCardCodesRemove(_) => MutationKind::GiftCardCodesRemove,
        }
    }

    /// Concurrency key for this mutation.
    #[must_use]
    pub fn key(&self) -> MutationKey {
        let targets: Vec<&str> = match self {
            Self::AddLines(lines) => lines.iter().map(|l| l.merchandise_id.as_str()).collect(),
            Self::UpdateLines(lines) => lines.iter().map(|l| l.id.as_str()).collect(),
            Self::RemoveLines(ids) => ids.iter().map(CartLineId::as_str).collect(),
            Self::DiscountCodesUpdate(_)
            | Self::GiftCardCodesUpdate(_)
            | Self::GiftCardCodesRemove(_) => Vec::new(),
        };
        MutationKey::new(self.kind(), targets)
    }

    /// The payload to send when `later` supersedes `self` under the same key.
    ///
    /// Adds accumulate per variant. Every other action is replaced outright.
    #[must_use]
    pub fn superseded_by(self, later: Self) -> Self {
        match (self, later) {
            (Self::AddLines(mut parked), Self::AddLines(adds)) => {
                for add in adds {
                    match parked
                        .iter_mut()
                        .find(|line| line.merchandise_id == add.merchandise_id)
                    {
                        Some(line) => line.quantity = line.quantity.saturating_add(add.quantity),
                        None => parked.push(add),
                    }
                }
                Self::AddLines(parked)
            }
            (_, later) => later,
        }
    }

    /// Canonical form: trimmed discount codes, whitespace-free gift card
    /// codes, blanks and duplicates dropped.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::DiscountCodesUpdate(codes) => Self::DiscountCodesUpdate(dedup(
                codes.iter().map(|code| code.trim().to_string()),
            )),
            Self::GiftCardCodesUpdate(codes) => Self::GiftCardCodesUpdate(dedup(
                codes.iter().map(|code| normalize_gift_card_code(code)),
            )),
            other => other,
        }
    }

    /// Reject mutations that cannot be sent to the server as-is.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] for empty line or gift card targets, zero-unit
    /// adds, and references to placeholder ids.
    pub fn validate(&self) -> Result<(), CartError> {
        match self {
            Self::AddLines(lines) => {
                if lines.is_empty() {
                    return Err(CartError::Empty(self.kind()));
                }
                if let Some(line) = lines.iter().find(|line| line.quantity == 0) {
                    return Err(CartError::ZeroQuantity(line.merchandise_id.clone()));
                }
            }
            Self::UpdateLines(lines) => {
                if lines.is_empty() {
                    return Err(CartError::Empty(self.kind()));
                }
                check_confirmed_lines(lines.iter().map(|line| &line.id))?;
            }
            Self::RemoveLines(ids) => {
                if ids.is_empty() {
                    return Err(CartError::Empty(self.kind()));
                }
                check_confirmed_lines(ids.iter())?;
            }
            Self::GiftCardCodesUpdate(codes) => {
                if codes.iter().all(|code| normalize_gift_card_code(code).is_empty()) {
                    return Err(CartError::Empty(self.kind()));
                }
            }
            Self::GiftCardCodesRemove(ids) => {
                if ids.is_empty() {
                    return Err(CartError::Empty(self.kind()));
                }
                if let Some(id) = ids.iter().find(|id| id.is_placeholder()) {
                    return Err(CartError::UnconfirmedGiftCard(id.clone()));
                }
            }
            // An empty code list clears every discount.
            Self::DiscountCodesUpdate(_) => {}
        }
        Ok(())
    }
}

fn check_confirmed_lines<'a>(
    mut ids: impl Iterator<Item = &'a CartLineId>,
) -> Result<(), CartError> {
    ids.find(|id| id.is_placeholder())
        .map_or(Ok(()), |id| Err(CartError::UnconfirmedLine(id.clone())))
}

fn dedup(codes: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in codes {
        if !code.is_empty() && !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

/// Strip every whitespace character from a gift card code.
///
/// ```
/// use wellspring_core::cart::normalize_gift_card_code;
///
/// assert_eq!(normalize_gift_card_code(" abcd efgh\tijkl "), "abcdefghijkl");
/// ```
#[must_use]
pub fn normalize_gift_card_code(code: &str) -> String {
    code.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Deterministic identity of a logical cart action.
///
/// Built from the action name and the sorted, de-duplicated targets, joined
/// with `-`, e.g. `LinesUpdate-gid://shopify/CartLine/1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationKey(String);

impl MutationKey {
    #[must_use]
    pub fn new<'a>(kind: MutationKind, targets: impl IntoIterator<Item = &'a str>) -> Self {
        let mut targets: Vec<&str> = targets.into_iter().collect();
        targets.sort_unstable();
        targets.dedup();

        let mut key = kind.as_str().to_string();
        for target in targets {
            key.push('-');
            key.push_str(target);
        }
        Self(key)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mutation that has been projected locally and handed out for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub kind: MutationKind,
    pub key: MutationKey,
    pub mutation: CartMutation,
    pub submitted_at: DateTime<Utc>,
    /// Monotonic per adapter; identifies this submission when it settles.
    pub sequence: u64,
}

impl PendingMutation {
    #[must_use]
    pub fn new(mutation: CartMutation, sequence: u64) -> Self {
        Self {
            kind: mutation.kind(),
            key: mutation.key(),
            mutation,
            submitted_at: Utc::now(),
            sequence,
        }
    }
}
