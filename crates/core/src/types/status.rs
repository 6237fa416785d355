//! Checkout enums.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How the customer intends to pay for an order.
///
/// Serialized in kebab-case to match the checkout form's radio values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    BankTransfer,
    Card,
}

impl PaymentMethod {
    /// All payment methods, in the order the checkout form lists them.
    pub const ALL: [Self; 3] = [Self::CashOnDelivery, Self::BankTransfer, Self::Card];

    /// Form value for this method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash-on-delivery",
            Self::BankTransfer => "bank-transfer",
            Self::Card => "card",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on Delivery",
            Self::BankTransfer => "Bank Transfer",
            Self::Card => "Card Payment",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle status as recorded in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}
