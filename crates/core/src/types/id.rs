//! Newtype IDs for Shopify global identifiers.
//!
//! Shopify identifies every resource with an opaque global ID string
//! (`gid://shopify/CartLine/...`). The `define_gid!` macro wraps those strings
//! so a cart line ID can never be passed where a merchandise ID is expected.

/// Macro to define a type-safe wrapper around a Shopify global ID.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `new()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>`, `From<String>` and `From<&str>`
///
/// # Example
///
/// ```rust
/// # use wellspring_core::define_gid;
/// define_gid!(OrderGid);
///
/// let id = OrderGid::new("gid://shopify/Order/1");
/// assert_eq!(id.as_str(), "gid://shopify/Order/1");
/// ```
#[macro_export]
macro_rules! define_gid {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw global ID string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw global ID.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the raw global ID.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_gid!(CartId);
define_gid!(CartLineId);
define_gid!(MerchandiseId);
define_gid!(GiftCardId);
define_gid!(ProductId);

/// Prefix of cart line IDs synthesised before the server confirms a line.
pub const OPTIMISTIC_LINE_PREFIX: &str = "optimistic-line:";

/// Prefix of gift card IDs synthesised before the server confirms a code.
pub const OPTIMISTIC_GIFT_CARD_PREFIX: &str = "optimistic-gift-card:";

impl CartLineId {
    /// Placeholder ID for a line that only exists in the optimistic projection.
    ///
    /// Deterministic in the merchandise ID so repeated adds of the same variant
    /// land on the same placeholder line.
    #[must_use]
    pub fn placeholder(merchandise_id: &MerchandiseId) -> Self {
        Self(format!("{OPTIMISTIC_LINE_PREFIX}{merchandise_id}"))
    }

    /// Whether this ID was synthesised locally and is unknown to the server.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(OPTIMISTIC_LINE_PREFIX)
    }
}

impl GiftCardId {
    /// Placeholder ID for a gift card code that the server has not applied yet.
    #[must_use]
    pub fn placeholder(code: &str) -> Self {
        Self(format!("{OPTIMISTIC_GIFT_CARD_PREFIX}{code}"))
    }

    /// Whether this ID was synthesised locally and is unknown to the server.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(OPTIMISTIC_GIFT_CARD_PREFIX)
    }
}
