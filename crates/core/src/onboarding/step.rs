//! Wizard step numbers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A step of the consultation, always within `1..=14`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Step(u8);

impl Step {
    pub const FIRST: Self = Self(1);
    pub const LAST: Self = Self(14);
    pub const COUNT: u8 = 14;

    /// `None` when `n` is outside `1..=14`.
    #[must_use]
    pub const fn new(n: u8) -> Option<Self> {
        if n >= Self::FIRST.0 && n <= Self::LAST.0 {
            Some(Self(n))
        } else {
            None
        }
    }

    /// Clamp any integer into the valid range.
    ///
    /// ```
    /// use wellspring_core::onboarding::Step;
    ///
    /// assert_eq!(Step::clamp(0), Step::FIRST);
    /// assert_eq!(Step::clamp(99), Step::LAST);
    /// ```
    #[must_use]
    pub fn clamp(n: i64) -> Self {
        let clamped = n.clamp(i64::from(Self::FIRST.0), i64::from(Self::LAST.0));
        // In range by construction.
        Self(u8::try_from(clamped).unwrap_or(Self::FIRST.0))
    }

    /// Strict parse of an indicator value: an integer within range.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u8>().ok().and_then(Self::new)
    }

    /// Read an indicator value leniently: missing, garbage and out-of-range
    /// values all read as the first step.
    #[must_use]
    pub fn from_indicator(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Self::FIRST)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The following step, staying on the last one.
    #[must_use]
    pub fn next(self) -> Self {
        Self::clamp(i64::from(self.0) + 1)
    }

    /// The preceding step, staying on the first one.
    #[must_use]
    pub fn previous(self) -> Self {
        Self::clamp(i64::from(self.0) - 1)
    }

    #[must_use]
    pub const fn is_first(self) -> bool {
        self.0 == Self::FIRST.0
    }

    /// The final step only offers a way back home.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.0 == Self::LAST.0
    }

    /// Every step in order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::FIRST.0..=Self::LAST.0).map(Self)
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("step {value} is outside 1..=14"))
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.0
    }
}
