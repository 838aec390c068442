//! Services that sit between the routes and the core state machines.

pub mod cart_sync;
pub mod onboarding;

pub use cart_sync::{CartOutcome, CartSync, CartSyncError};
