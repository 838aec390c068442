//! Wellspring Core - storefront state that does not touch the network.
//!
//! This crate holds the two state machines behind the storefront's
//! interactive surfaces:
//! - [`cart`] - the optimistic cart adapter that predicts the effect of a
//!   cart mutation and snaps back to the server's cart when it answers
//! - [`onboarding`] - the 14-step consultation wizard with its step indicator
//!   and durable answer store
//!
//! # Architecture
//!
//! No I/O, no HTTP clients, no async. Persistence and navigation are reached
//! through the [`onboarding::KeyValueStore`] and [`onboarding::StepIndicator`]
//! ports, and state changes are announced through [`observer::Observers`] so a
//! presentation layer can re-render without the core knowing about it.
//!
//! # Modules
//!
//! - [`types`] - Shopify global IDs, money and email newtypes
//! - [`observer`] - explicit state-change notification

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod observer;
pub mod onboarding;
pub mod types;

pub use types::*;
