//! Cart error types.

use thiserror::Error;

use crate::types::{CurrencyCode, IdError, PriceError};

/// Errors raised by cart operations.
///
/// Both variants indicate a programming error in the caller, not a
/// user-facing condition, and are returned synchronously.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart was accessed before it was attached to a session scope.
    #[error("cart accessed outside an initialized session scope")]
    Uninitialized,

    /// A line item or quantity failed validation.
    #[error("invalid cart item: {0}")]
    InvalidItem(#[from] InvalidItemReason),
}

/// Why a line item was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidItemReason {
    /// The product identifier is empty.
    #[error("product id is empty")]
    EmptyId,

    /// The product identifier exceeds the maximum length.
    #[error("product id is too long")]
    IdTooLong,

    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// Unit price must not be negative.
    #[error("unit price must not be negative")]
    NegativePrice,

    /// The item is priced in a different currency than the cart.
    #[error("item priced in {found}, cart uses {expected}")]
    CurrencyMismatch {
        /// The cart's currency.
        expected: CurrencyCode,
        /// The item's currency.
        found: CurrencyCode,
    },

    /// The merged quantity does not fit in a `u32`.
    #[error("quantity too large")]
    QuantityOverflow,

    /// The cart subtotal would leave the decimal range.
    #[error("cart total too large")]
    AmountOverflow,
}

impl From<IdError> for CartError {
    fn from(err: IdError) -> Self {
        let reason = match err {
            IdError::Empty => InvalidItemReason::EmptyId,
            IdError::TooLong { .. } => InvalidItemReason::IdTooLong,
        };
        Self::InvalidItem(reason)
    }
}

impl From<PriceError> for InvalidItemReason {
    fn from(err: PriceError) -> Self {
        match err {
            PriceError::CurrencyMismatch { expected, found } => {
                Self::CurrencyMismatch { expected, found }
            }
            PriceError::Overflow => Self::AmountOverflow,
        }
    }
}
