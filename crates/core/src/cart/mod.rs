//! Shopping cart state container.
//!
//! A [`Cart`] is an ordered list of [`LineItem`]s keyed by [`MealId`]. Adding
//! a meal that is already present merges into the existing entry: quantities
//! accumulate while the title, price snapshot, and image of the first add are
//! kept. Aggregates are never stored; [`Cart::snapshot`] recomputes them from
//! the current contents.
//!
//! The cart performs no I/O and no locking. Callers that share a cart across
//! requests wrap it in their own synchronization (see the storefront's
//! `CartStore`).
//!
//! # Example
//!
//! ```
//! use chowhub_core::{Cart, CurrencyCode, LineItem, MealId, Price};
//! use rust_decimal::Decimal;
//!
//! let mut cart = Cart::new(CurrencyCode::NGN);
//! let jollof = MealId::parse("m1").unwrap();
//! let price = Price::new(Decimal::from(1500), CurrencyCode::NGN);
//!
//! cart.add_item(LineItem::new(jollof.clone(), "Jollof", price, 2)).unwrap();
//! cart.add_item(LineItem::new(jollof, "Jollof-renamed", price, 1)).unwrap();
//!
//! let snapshot = cart.snapshot();
//! assert_eq!(snapshot.items.len(), 1);
//! assert_eq!(snapshot.items[0].title, "Jollof");
//! assert_eq!(snapshot.total_item_count, 3);
//! ```

mod error;
#[cfg(test)]
mod proptests;

pub use error::{CartError, InvalidItemReason};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, MealId, Price, PriceError};

/// One product entry in the cart with a price snapshot and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Product identifier; the merge key.
    pub id: MealId,
    /// Display name captured when the item was first added.
    pub title: String,
    /// Unit price captured when the item was first added.
    pub unit_price: Price,
    /// Number of units, at least 1.
    pub quantity: u32,
    /// Optional display image.
    pub image_url: Option<String>,
}

impl LineItem {
    /// Create a line item without an image.
    #[must_use]
    pub fn new(id: MealId, title: impl Into<String>, unit_price: Price, quantity: u32) -> Self {
        Self {
            id,
            title: title.into(),
            unit_price,
            quantity,
            image_url: None,
        }
    }

    /// Attach an image reference.
    #[must_use]
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    /// Unit price multiplied by quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the product overflows.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.unit_price.checked_mul_quantity(self.quantity)
    }
}

/// Read-only view of cart contents and aggregates.
///
/// Owned and detached from the cart it was taken from: mutating a snapshot
/// never affects the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Line items in insertion order.
    pub items: Vec<LineItem>,
    /// Sum of all quantities.
    pub total_item_count: u64,
    /// Sum of unit price times quantity over all items.
    pub subtotal: Price,
}

impl CartSnapshot {
    /// Whether the cart had no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Totals for the order summary shown on cart and checkout pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the delivery fee is in a different currency or
    /// the total overflows.
    pub fn summary(&self, delivery_fee: Price) -> Result<OrderSummary, PriceError> {
        Ok(OrderSummary {
            subtotal: self.subtotal,
            delivery_fee,
            total: self.subtotal.checked_add(delivery_fee)?,
        })
    }
}

/// Subtotal plus delivery fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

/// The cart state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    currency_code: CurrencyCode,
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart priced in `currency_code`.
    #[must_use]
    pub const fn new(currency_code: CurrencyCode) -> Self {
        Self {
            currency_code,
            items: Vec::new(),
        }
    }

    /// The currency every line item must be priced in.
    #[must_use]
    pub const fn currency_code(&self) -> CurrencyCode {
        self.currency_code
    }

    /// Number of distinct line items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current quantity of the entry for `id`, if present.
    #[must_use]
    pub fn quantity(&self, id: &MealId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .map(|item| item.quantity)
    }

    /// Add an item, merging into an existing entry with the same id.
    ///
    /// On merge only the quantity changes; the existing title, price, and
    /// image are kept and the supplied ones are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidItem`] if the quantity is zero, the price
    /// is negative or in another currency, or the merged quantity or cart
    /// total would overflow. The cart is unchanged on error.
    pub fn add_item(&mut self, item: LineItem) -> Result<(), CartError> {
        if item.quantity == 0 {
            return Err(InvalidItemReason::ZeroQuantity.into());
        }
        if item.unit_price.is_negative() {
            return Err(InvalidItemReason::NegativePrice.into());
        }
        if item.unit_price.currency_code != self.currency_code {
            return Err(InvalidItemReason::CurrencyMismatch {
                expected: self.currency_code,
                found: item.unit_price.currency_code,
            }
            .into());
        }

        match self.position(&item.id) {
            Some(index) => {
                let current = self.items.get(index).map_or(0, |existing| existing.quantity);
                let merged = current
                    .checked_add(item.quantity)
                    .ok_or(InvalidItemReason::QuantityOverflow)?;
                self.check_total_with(index, merged)?;
                if let Some(existing) = self.items.get_mut(index) {
                    existing.quantity = merged;
                }
            }
            None => {
                self.subtotal_amount()
                    .and_then(|sum| sum.checked_add(item.line_total()?))
                    .map_err(|err| CartError::InvalidItem(err.into()))?;
                self.items.push(item);
            }
        }

        Ok(())
    }

    /// Remove the entry for `id`. Returns whether an entry was removed;
    /// removing an absent id is a no-op.
    pub fn remove_item(&mut self, id: &MealId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.items.len() != before
    }

    /// Replace the quantity of the entry for `id`.
    ///
    /// Returns `Ok(false)` without changing anything when `id` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidItem`] if `quantity` is zero or the cart
    /// total would overflow. Zero is rejected rather than clamped or treated
    /// as a removal.
    pub fn set_quantity(&mut self, id: &MealId, quantity: u32) -> Result<bool, CartError> {
        if quantity == 0 {
            return Err(InvalidItemReason::ZeroQuantity.into());
        }
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.check_total_with(index, quantity)?;
        if let Some(existing) = self.items.get_mut(index) {
            existing.quantity = quantity;
        }
        Ok(true)
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Copy the current contents and compute aggregates.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        let total_item_count = self.items.iter().map(|item| u64::from(item.quantity)).sum();
        // Mutations reject any state whose subtotal overflows, so this never
        // falls back in practice.
        let subtotal = self
            .subtotal_amount()
            .unwrap_or_else(|_| Price::new(Decimal::MAX, self.currency_code));

        CartSnapshot {
            items: self.items.clone(),
            total_item_count,
            subtotal,
        }
    }

    fn position(&self, id: &MealId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    fn subtotal_amount(&self) -> Result<Price, PriceError> {
        self.items
            .iter()
            .try_fold(Price::zero(self.currency_code), |sum, item| {
                sum.checked_add(item.line_total()?)
            })
    }

    /// Verify the subtotal stays representable if the item at `index` had
    /// `quantity` units.
    fn check_total_with(&self, index: usize, quantity: u32) -> Result<(), CartError> {
        self.items
            .iter()
            .enumerate()
            .try_fold(Price::zero(self.currency_code), |sum, (i, item)| {
                let units = if i == index { quantity } else { item.quantity };
                sum.checked_add(item.unit_price.checked_mul_quantity(units)?)
            })
            .map(|_| ())
            .map_err(|err| CartError::InvalidItem(err.into()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn naira(amount: i64) -> Price {
        Price::new(Decimal::from(amount), CurrencyCode::NGN)
    }

    fn id(s: &str) -> MealId {
        MealId::parse(s).unwrap()
    }

    fn item(meal: &str, price: i64, quantity: u32) -> LineItem {
        LineItem::new(id(meal), meal.to_uppercase(), naira(price), quantity)
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = Cart::new(CurrencyCode::NGN);
        let snapshot = cart.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_item_count, 0);
        assert_eq!(snapshot.subtotal, naira(0));
    }

    #[test]
    fn test_merge_add_keeps_first_metadata() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(LineItem::new(id("m1"), "Jollof", naira(1500), 2))
            .unwrap();
        cart.add_item(
            LineItem::new(id("m1"), "Jollof-renamed", naira(9999), 1)
                .with_image_url(Some("https://cdn.example.com/new.png".to_string())),
        )
        .unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.items.len(), 1);
        let entry = &snapshot.items[0];
        assert_eq!(entry.title, "Jollof");
        assert_eq!(entry.unit_price, naira(1500));
        assert_eq!(entry.quantity, 3);
        assert_eq!(entry.image_url, None);
        assert_eq!(snapshot.subtotal, naira(4500));
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("b", 100, 1)).unwrap();
        cart.add_item(item("a", 100, 1)).unwrap();
        cart.add_item(item("b", 100, 1)).unwrap();

        let ids: Vec<_> = cart
            .snapshot()
            .items
            .iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_add_rejects_zero_quantity() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        assert_eq!(
            cart.add_item(item("m1", 100, 0)),
            Err(CartError::InvalidItem(InvalidItemReason::ZeroQuantity))
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_rejects_negative_price() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        assert_eq!(
            cart.add_item(item("m1", -5, 1)),
            Err(CartError::InvalidItem(InvalidItemReason::NegativePrice))
        );
    }

    #[test]
    fn test_add_accepts_free_item() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("water", 0, 2)).unwrap();
        assert_eq!(cart.snapshot().total_item_count, 2);
    }

    #[test]
    fn test_add_rejects_currency_mismatch() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        let dollars = LineItem::new(
            id("m1"),
            "Burger",
            Price::new(Decimal::ONE, CurrencyCode::USD),
            1,
        );
        assert_eq!(
            cart.add_item(dollars),
            Err(CartError::InvalidItem(InvalidItemReason::CurrencyMismatch {
                expected: CurrencyCode::NGN,
                found: CurrencyCode::USD,
            }))
        );
    }

    #[test]
    fn test_merge_quantity_overflow_leaves_cart_unchanged() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("m1", 1, u32::MAX)).unwrap();
        assert_eq!(
            cart.add_item(item("m1", 1, 1)),
            Err(CartError::InvalidItem(InvalidItemReason::QuantityOverflow))
        );
        assert_eq!(cart.snapshot().items[0].quantity, u32::MAX);
    }

    #[test]
    fn test_add_rejects_amount_overflow() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        let huge = LineItem::new(id("gold"), "Gold", Price::new(Decimal::MAX, CurrencyCode::NGN), 1);
        cart.add_item(huge.clone()).unwrap();

        let other = LineItem::new(id("more-gold"), "More", huge.unit_price, 1);
        assert_eq!(
            cart.add_item(other),
            Err(CartError::InvalidItem(InvalidItemReason::AmountOverflow))
        );
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove_item_is_idempotent() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 100, 1)).unwrap();
        cart.add_item(item("b", 200, 1)).unwrap();

        assert!(cart.remove_item(&id("a")));
        let after_first = cart.snapshot();
        assert!(!cart.remove_item(&id("a")));
        assert_eq!(cart.snapshot(), after_first);
    }

    #[test]
    fn test_set_quantity_replaces_value() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 100, 4)).unwrap();
        assert_eq!(cart.set_quantity(&id("a"), 2), Ok(true));
        assert_eq!(cart.snapshot().items[0].quantity, 2);
        assert_eq!(cart.quantity(&id("a")), Some(2));
        assert_eq!(cart.quantity(&id("zz")), None);
    }

    #[test]
    fn test_set_quantity_rejects_zero() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 100, 4)).unwrap();
        assert_eq!(
            cart.set_quantity(&id("a"), 0),
            Err(CartError::InvalidItem(InvalidItemReason::ZeroQuantity))
        );
        assert_eq!(cart.snapshot().items[0].quantity, 4);
    }

    #[test]
    fn test_set_quantity_absent_id_is_noop() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 100, 1)).unwrap();
        let before = cart.snapshot();
        assert_eq!(cart.set_quantity(&id("zzz"), 3), Ok(false));
        assert_eq!(cart.snapshot(), before);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 100, 1)).unwrap();
        cart.add_item(item("b", 200, 3)).unwrap();
        cart.clear();

        let snapshot = cart.snapshot();
        assert!(snapshot.items.is_empty());
        assert_eq!(snapshot.total_item_count, 0);
        assert_eq!(snapshot.subtotal, naira(0));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 100, 1)).unwrap();

        let mut snapshot = cart.snapshot();
        snapshot.items[0].quantity = 99;
        snapshot.items.clear();

        assert_eq!(cart.snapshot().items[0].quantity, 1);
    }

    #[test]
    fn test_checkout_scenario() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 1000, 2)).unwrap();
        cart.add_item(item("b", 500, 1)).unwrap();
        cart.set_quantity(&id("a"), 5).unwrap();

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.total_item_count, 6);
        assert_eq!(snapshot.subtotal, naira(5500));

        cart.remove_item(&id("b"));
        let snapshot = cart.snapshot();
        assert_eq!(snapshot.total_item_count, 5);
        assert_eq!(snapshot.subtotal, naira(5000));
    }

    #[test]
    fn test_summary_adds_delivery_fee() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(item("a", 1000, 2)).unwrap();

        let summary = cart.snapshot().summary(naira(500)).unwrap();
        assert_eq!(summary.subtotal, naira(2000));
        assert_eq!(summary.delivery_fee, naira(500));
        assert_eq!(summary.total, naira(2500));
    }

    #[test]
    fn test_summary_rejects_fee_in_other_currency() {
        let cart = Cart::new(CurrencyCode::NGN);
        let fee = Price::new(Decimal::ONE, CurrencyCode::USD);
        assert!(matches!(
            cart.snapshot().summary(fee),
            Err(PriceError::CurrencyMismatch { .. })
        ));
    }
}
