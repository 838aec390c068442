//! Askama filters shared by the storefront templates.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::Datelike;

/// `{{ ""|current_year }}` in the footer.
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    Ok(chrono::Utc::now().year())
}

/// `{{ cart.item_count|items }}` renders `1 item` or `3 items`.
#[askama::filter_fn]
pub fn items(count: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(count_noun(&count.to_string(), "item", "items"))
}

fn count_noun(count: &str, one: &str, many: &str) -> String {
    let noun = if count.trim() == "1" { one } else { many };
    format!("{count} {noun}")
}
