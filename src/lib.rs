//! Affiliate Attribution
//!
//! Checkout patches for an affiliate extension: resolve the referring affiliate from
//! its cookie when the extension gives up, and stop affiliate and coupon discounts
//! from stacking on the same item.

pub mod accounts;
pub mod area;
pub mod cart;
pub mod config;
pub mod cookies;
pub mod fixtures;
pub mod observability;
pub mod prelude;
pub mod reconciliation;
pub mod resolution;
pub mod rules;

#[cfg(test)]
mod test_support;
