//! Session-stored state for the storefront.

use serde::{Deserialize, Serialize};

/// Summary of the last placed order, shown once on the confirmation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    /// Order total, formatted for display.
    pub total: String,
    /// Number of items ordered.
    pub item_count: u64,
    /// Payment method label.
    pub payment_method: String,
    /// Delivery address as entered.
    pub delivery_address: String,
}

/// Session keys.
pub mod session_keys {
    /// Key for the browsing session's cart identifier.
    pub const CART_SESSION: &str = "cart_session";

    /// Key for the confirmation of the most recent order.
    pub const LAST_ORDER: &str = "last_order";
}
