//! Types the storefront keeps in the session.

pub mod session;

pub use session::CurrentCustomer;
pub use session::keys as session_keys;
