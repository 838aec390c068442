//! Wellspring storefront library.
//!
//! Server-rendered Shopify storefront with an optimistic cart and the
//! consultation wizard. The binary in `main.rs` wires these modules into an
//! Axum server; integration tests drive them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod state;
