//! Value types shared by the cart and onboarding modules.

pub mod email;
pub mod id;
pub mod money;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{MISSING_AMOUNT, Money, format_optional};
