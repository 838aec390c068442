//! Monetary amounts using decimal arithmetic.
//!
//! Shopify returns amounts as decimal strings; they are parsed into
//! [`rust_decimal::Decimal`] so optimistic line totals never pick up float
//! rounding errors.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Text rendered in place of an amount that the API did not return.
pub const MISSING_AMOUNT: &str = "-";

/// A monetary amount with its ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (dollars, not cents).
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    /// ISO 4217 currency code, e.g. `USD`.
    pub currency_code: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub fn zero(currency_code: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Parse a Shopify decimal string.
    ///
    /// Returns `None` for malformed amounts so callers can fall back to a
    /// placeholder instead of failing the page.
    #[must_use]
    pub fn parse(amount: &str, currency_code: impl Into<String>) -> Option<Self> {
        Decimal::from_str(amount.trim())
            .ok()
            .map(|amount| Self::new(amount, currency_code))
    }

    /// This amount multiplied by a line quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), &*self.currency_code)
    }

    /// Sum of two amounts, or `None` when the currencies differ.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        (self.currency_code == other.currency_code)
            .then(|| Self::new(self.amount + other.amount, &*self.currency_code))
    }

    /// Difference of two amounts, or `None` when the currencies differ.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        (self.currency_code == other.currency_code)
            .then(|| Self::new(self.amount - other.amount, &*self.currency_code))
    }

    fn symbol(&self) -> Option<&'static str> {
        match self.currency_code.as_str() {
            "USD" | "CAD" | "AUD" | "NZD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            _ => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.amount.round_dp(2);
        match self.symbol() {
            Some(symbol) if amount.is_sign_negative() => write!(f, "-{symbol}{:.2}", amount.abs()),
            Some(symbol) => write!(f, "{symbol}{amount:.2}"),
            None => write!(f, "{amount:.2} {}", self.currency_code),
        }
    }
}

/// Format an optional amount, rendering [`MISSING_AMOUNT`] when absent.
#[must_use]
pub fn format_optional(money: Option<&Money>) -> String {
    money.map_or_else(|| MISSING_AMOUNT.to_string(), ToString::to_string)
}
