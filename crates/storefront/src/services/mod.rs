//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Session-scoped cart stores and their registry
//! - `session_store` - Bounded session record store that tears down carts

pub mod cart;
pub mod session_store;

pub use cart::{CartSessions, CartStore, PendingCheckout};
pub use session_store::MokaSessionStore;
