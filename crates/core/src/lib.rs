//! ChowHub Core - Shared domain types and cart state.
//!
//! This crate provides the types used across ChowHub components:
//! - `storefront` - Public-facing food ordering site
//! - `integration-tests` - End-to-end tests against a mock backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no HTTP clients, no locking. The storefront wraps [`cart::Cart`] in a
//! shared, session-scoped store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for identifiers, prices, and checkout enums
//! - [`cart`] - The cart state container with merge-add semantics

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartError, CartSnapshot, InvalidItemReason, LineItem, OrderSummary};
pub use types::*;
