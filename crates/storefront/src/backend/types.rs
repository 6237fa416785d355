//! Validated catalog types and order payloads.
//!
//! Everything in this module has passed boundary validation; raw backend
//! rows live in [`super::records`].

use chrono::{DateTime, Utc};
use chowhub_core::{
    CartSessionId, CartSnapshot, CurrencyCode, LineItem, MealId, OrderStatus, OrderSummary,
    PaymentMethod, Price, PriceError, VendorId,
};
use rust_decimal::Decimal;
use serde::Serialize;

/// A meal offered by a vendor.
#[derive(Debug, Clone, PartialEq)]
pub struct Meal {
    pub id: MealId,
    pub vendor_id: Option<VendorId>,
    pub title: String,
    pub description: Option<String>,
    /// Only set when the stored value is an absolute `http(s)` URL.
    pub photo_url: Option<String>,
    pub is_available: bool,
    pub tags: Vec<String>,
    pub price: Price,
    pub category: Option<String>,
    pub total_orders: u64,
    pub vendor: Option<VendorSummary>,
}

impl Meal {
    /// Build a cart line item for `quantity` units of this meal.
    ///
    /// The title, price, and photo are snapshotted; later catalog changes do
    /// not affect the cart entry.
    #[must_use]
    pub fn to_line_item(&self, quantity: u32) -> LineItem {
        LineItem::new(self.id.clone(), self.title.clone(), self.price, quantity)
            .with_image_url(self.photo_url.clone())
    }
}

/// The vendor fields shown alongside a meal.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorSummary {
    pub id: Option<VendorId>,
    pub name: String,
    pub logo_url: Option<String>,
    /// Average rating, clamped to 0-5.
    pub rating: Option<f32>,
}

/// A vendor profile from the `vendors` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub logo_url: Option<String>,
    /// Average rating, clamped to 0-5.
    pub rating: Option<f32>,
    pub location: Option<String>,
    pub cuisine_tags: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Only set when the stored value is an absolute `http(s)` URL.
    pub website: Option<String>,
}

/// One order row inserted into the backend at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub cart_session_id: CartSessionId,
    pub items: Vec<OrderLine>,
    pub currency: CurrencyCode,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

/// One line of an [`OrderRequest`].
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub meal_id: MealId,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl OrderRequest {
    /// Build an order from a cart snapshot and its summary.
    ///
    /// # Errors
    ///
    /// Returns an error if a line total overflows.
    pub fn from_snapshot(
        cart_session_id: CartSessionId,
        snapshot: &CartSnapshot,
        summary: &OrderSummary,
        delivery_address: String,
        payment_method: PaymentMethod,
        placed_at: DateTime<Utc>,
    ) -> Result<Self, PriceError> {
        let items = snapshot
            .items
            .iter()
            .map(|item| {
                Ok(OrderLine {
                    meal_id: item.id.clone(),
                    title: item.title.clone(),
                    unit_price: item.unit_price.amount,
                    quantity: item.quantity,
                    line_total: item.line_total()?.amount,
                })
            })
            .collect::<Result<Vec<_>, PriceError>>()?;

        Ok(Self {
            cart_session_id,
            items,
            currency: summary.total.currency_code,
            subtotal: summary.subtotal.amount,
            delivery_fee: summary.delivery_fee.amount,
            total: summary.total.amount,
            delivery_address,
            payment_method,
            status: OrderStatus::Pending,
            placed_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chowhub_core::Cart;

    fn naira(amount: i64) -> Price {
        Price::new(Decimal::from(amount), CurrencyCode::NGN)
    }

    fn meal(id: &str, price: i64) -> Meal {
        Meal {
            id: MealId::parse(id).unwrap(),
            vendor_id: None,
            title: format!("Meal {id}"),
            description: None,
            photo_url: Some("https://cdn.example.com/meal.jpg".to_string()),
            is_available: true,
            tags: Vec::new(),
            price: naira(price),
            category: None,
            total_orders: 0,
            vendor: None,
        }
    }

    #[test]
    fn test_to_line_item_snapshots_catalog_fields() {
        let line = meal("m1", 1500).to_line_item(3);
        assert_eq!(line.id.as_str(), "m1");
        assert_eq!(line.title, "Meal m1");
        assert_eq!(line.unit_price, naira(1500));
        assert_eq!(line.quantity, 3);
        assert_eq!(
            line.image_url.as_deref(),
            Some("https://cdn.example.com/meal.jpg")
        );
    }

    #[test]
    fn test_order_request_from_snapshot() {
        let mut cart = Cart::new(CurrencyCode::NGN);
        cart.add_item(meal("a", 1000).to_line_item(2)).unwrap();
        cart.add_item(meal("b", 500).to_line_item(1)).unwrap();
        let snapshot = cart.snapshot();
        let summary = snapshot.summary(naira(500)).unwrap();

        let order = OrderRequest::from_snapshot(
            CartSessionId::new(),
            &snapshot,
            &summary,
            "12 Allen Avenue, Ikeja".to_string(),
            PaymentMethod::BankTransfer,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].line_total, Decimal::from(2000));
        assert_eq!(order.subtotal, Decimal::from(2500));
        assert_eq!(order.total, Decimal::from(3000));
        assert_eq!(order.status, OrderStatus::Pending);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["payment_method"], "bank-transfer");
        assert_eq!(json["currency"], "NGN");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["items"][1]["meal_id"], "b");
    }
}
