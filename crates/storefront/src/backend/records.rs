//! Raw backend rows and their boundary validation.
//!
//! The hosted backend returns loosely typed JSON: ids may be strings or
//! numbers, numeric columns may be numbers or numeric strings, an embedded
//! vendor may come back as an object or a one-element array, and image
//! columns may hold relative paths or junk. Each row is decoded on its own
//! into a record and then validated into [`Meal`] or [`Vendor`], so one bad
//! row never takes down a listing.

use std::str::FromStr;

use chowhub_core::{CurrencyCode, IdError, MealId, Price, VendorId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::types::{Meal, Vendor, VendorSummary};

/// Why a backend row was rejected.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid {field}: {source}")]
    InvalidId {
        field: &'static str,
        #[source]
        source: IdError,
    },

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("negative price")]
    NegativePrice,

    #[error("malformed row: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// An identifier column that may be text or an integer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// A numeric column that may be a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    fn text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        let text = self.text();
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }
}

/// An embedded row that may arrive as an object or as an array of objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Embedded<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Embedded<T> {
    fn into_first(self) -> Option<T> {
        match self {
            Self::Many(rows) => rows.into_iter().next(),
            Self::One(row) => Some(row),
        }
    }
}

/// A `meals` row with its embedded vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct MealRecord {
    pub id: Option<RawId>,
    #[serde(default)]
    pub vendor_id: Option<RawId>,
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub price: Option<RawNumber>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub total_orders: Option<RawNumber>,
    #[serde(default)]
    pub vendors: Option<Embedded<VendorRecord>>,
}

/// A `vendors` row, either embedded in a meal or read from its own table.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorRecord {
    #[serde(default)]
    pub id: Option<RawId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub rating: Option<RawNumber>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub cuisine_tags: Option<Vec<String>>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfoRecord>,
}

/// The `contact_info` column of a vendor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInfoRecord {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn decode<T: DeserializeOwned>(row: Value) -> Result<T, RecordError> {
    serde_json::from_value(row).map_err(RecordError::Malformed)
}

/// Decode and validate one `meals` row.
///
/// # Errors
///
/// Returns an error if the row is not a meal object or fails validation.
pub fn parse_meal(row: Value, currency: CurrencyCode) -> Result<Meal, RecordError> {
    decode::<MealRecord>(row)?.into_meal(currency)
}

/// Decode and validate one `vendors` row.
///
/// # Errors
///
/// Returns an error if the row is not a vendor object or fails validation.
pub fn parse_vendor(row: Value) -> Result<Vendor, RecordError> {
    decode::<VendorRecord>(row)?.into_vendor()
}

impl MealRecord {
    /// Validate this row into a [`Meal`] priced in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the id or title is missing or empty, or the price
    /// is missing, unparseable, or negative. A malformed embedded vendor is
    /// dropped rather than failing the meal.
    pub fn into_meal(self, currency: CurrencyCode) -> Result<Meal, RecordError> {
        let id = MealId::parse(&self.id.ok_or(RecordError::Missing("id"))?.into_text())
            .map_err(|source| RecordError::InvalidId { field: "id", source })?;

        let title = non_blank(self.title).ok_or(RecordError::Missing("title"))?;

        let price = self.price.ok_or(RecordError::Missing("price"))?;
        let amount = price
            .to_decimal()
            .ok_or_else(|| RecordError::InvalidPrice(price.text()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(RecordError::NegativePrice);
        }

        let vendor_id = self
            .vendor_id
            .map(|raw| VendorId::parse(&raw.into_text()))
            .transpose()
            .map_err(|source| RecordError::InvalidId {
                field: "vendor_id",
                source,
            })?;

        Ok(Meal {
            id,
            vendor_id,
            title,
            description: non_blank(self.description),
            photo_url: self.photo_url.and_then(|url| web_url(&url)),
            is_available: self.is_available.unwrap_or(false),
            tags: self.tags.unwrap_or_default(),
            price: Price::new(amount, currency),
            category: non_blank(self.category),
            total_orders: self
                .total_orders
                .as_ref()
                .and_then(RawNumber::to_decimal)
                .and_then(|n| n.trunc().to_u64())
                .unwrap_or(0),
            vendor: self
                .vendors
                .and_then(Embedded::into_first)
                .and_then(VendorRecord::into_summary),
        })
    }
}

impl VendorRecord {
    fn into_summary(self) -> Option<VendorSummary> {
        let name = non_blank(self.name)?;
        Some(VendorSummary {
            id: self.id.and_then(|raw| VendorId::parse(&raw.into_text()).ok()),
            name,
            logo_url: self.logo_url.and_then(|url| web_url(&url)),
            rating: self.rating.as_ref().and_then(rating),
        })
    }

    /// Validate a full `vendors` row into a [`Vendor`].
    ///
    /// # Errors
    ///
    /// Returns an error if the id or name is missing or empty.
    pub fn into_vendor(self) -> Result<Vendor, RecordError> {
        let id = VendorId::parse(&self.id.ok_or(RecordError::Missing("id"))?.into_text())
            .map_err(|source| RecordError::InvalidId { field: "id", source })?;
        let name = non_blank(self.name).ok_or(RecordError::Missing("name"))?;
        let contact = self.contact_info.unwrap_or_default();

        Ok(Vendor {
            id,
            name,
            logo_url: self.logo_url.and_then(|url| web_url(&url)),
            rating: self.rating.as_ref().and_then(rating),
            location: non_blank(self.location),
            cuisine_tags: self
                .cuisine_tags
                .unwrap_or_default()
                .into_iter()
                .filter_map(|tag| non_blank(Some(tag)))
                .collect(),
            email: non_blank(self.email),
            phone: non_blank(contact.phone),
            website: contact.website.and_then(|url| web_url(&url)),
        })
    }
}

/// A finite rating clamped to 0-5.
fn rating(raw: &RawNumber) -> Option<f32> {
    raw.to_decimal()
        .and_then(|r| r.to_f32())
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, 5.0))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Keep only absolute `http`/`https` URLs.
fn web_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Meal, RecordError> {
        parse_meal(value, CurrencyCode::NGN)
    }

    #[test]
    fn test_full_row() {
        let meal = parse(json!({
            "id": "m1",
            "vendor_id": 7,
            "title": "  Jollof Rice ",
            "description": "Smoky party jollof",
            "photo_url": "https://cdn.example.com/jollof.jpg",
            "is_available": true,
            "tags": ["rice", "spicy"],
            "price": 1500,
            "category": "Mains",
            "total_orders": 42,
            "vendors": {
                "id": 7,
                "name": "Mama Put",
                "logo_url": "https://cdn.example.com/logo.png",
                "rating": 4.6
            }
        }))
        .unwrap();

        assert_eq!(meal.id.as_str(), "m1");
        assert_eq!(meal.vendor_id.unwrap().as_str(), "7");
        assert_eq!(meal.title, "Jollof Rice");
        assert_eq!(meal.price, Price::new(Decimal::from(1500), CurrencyCode::NGN));
        assert!(meal.is_available);
        assert_eq!(meal.total_orders, 42);
        let vendor = meal.vendor.unwrap();
        assert_eq!(vendor.name, "Mama Put");
        assert!((vendor.rating.unwrap() - 4.6).abs() < 1e-6);
    }

    #[test]
    fn test_price_as_string_and_decimal() {
        let meal = parse(json!({"id": "m1", "title": "Suya", "price": "1250.50"})).unwrap();
        assert_eq!(meal.price.amount, Decimal::new(125_050, 2));

        let meal = parse(json!({"id": "m2", "title": "Suya", "price": 99.99})).unwrap();
        assert_eq!(meal.price.amount, Decimal::new(9999, 2));
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(matches!(
            parse(json!({"title": "Suya", "price": 1})),
            Err(RecordError::Missing("id"))
        ));
        assert!(matches!(
            parse(json!({"id": "m1", "title": "   ", "price": 1})),
            Err(RecordError::Missing("title"))
        ));
        assert!(matches!(
            parse(json!({"id": "m1", "title": "Suya"})),
            Err(RecordError::Missing("price"))
        ));
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(matches!(
            parse(json!({"id": "", "title": "Suya", "price": 1})),
            Err(RecordError::InvalidId { field: "id", .. })
        ));
    }

    #[test]
    fn test_bad_prices_rejected() {
        assert!(matches!(
            parse(json!({"id": "m1", "title": "Suya", "price": -1})),
            Err(RecordError::NegativePrice)
        ));
        assert!(matches!(
            parse(json!({"id": "m1", "title": "Suya", "price": "cheap"})),
            Err(RecordError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_non_web_urls_dropped() {
        let meal = parse(json!({
            "id": "m1",
            "title": "Suya",
            "price": 1,
            "photo_url": "/uploads/suya.png",
            "vendors": {"name": "Grill", "logo_url": "javascript:alert(1)", "rating": 11}
        }))
        .unwrap();

        assert_eq!(meal.photo_url, None);
        let vendor = meal.vendor.unwrap();
        assert_eq!(vendor.logo_url, None);
        assert_eq!(vendor.rating, Some(5.0));
    }

    #[test]
    fn test_nameless_vendor_dropped_and_availability_defaults_false() {
        let meal = parse(json!({
            "id": "m1",
            "title": "Suya",
            "price": 1,
            "vendors": {"name": null}
        }))
        .unwrap();
        assert!(meal.vendor.is_none());
        assert!(!meal.is_available);
    }

    #[test]
    fn test_vendor_as_array_and_numeric_strings() {
        let meal = parse(json!({
            "id": "m1",
            "title": "Suya",
            "price": 1,
            "total_orders": "12",
            "vendors": [{"name": "Grill", "rating": "4.5"}]
        }))
        .unwrap();

        assert_eq!(meal.total_orders, 12);
        let vendor = meal.vendor.unwrap();
        assert_eq!(vendor.name, "Grill");
        assert_eq!(vendor.rating, Some(4.5));

        let meal = parse(json!({"id": "m2", "title": "Suya", "price": 1, "vendors": []})).unwrap();
        assert!(meal.vendor.is_none());
    }

    #[test]
    fn test_negative_orders_floor_at_zero() {
        let meal = parse(json!({"id": "m1", "title": "Suya", "price": 1, "total_orders": -4})).unwrap();
        assert_eq!(meal.total_orders, 0);
    }

    #[test]
    fn test_malformed_row_is_an_error_not_a_panic() {
        assert!(matches!(
            parse(json!({"id": "m1", "title": "Suya", "price": 1, "tags": "rice"})),
            Err(RecordError::Malformed(_))
        ));
        assert!(matches!(parse(json!("not a row")), Err(RecordError::Malformed(_))));
    }

    #[test]
    fn test_full_vendor_row() {
        let vendor = parse_vendor(json!({
            "id": 3,
            "uuid": "5b6c",
            "name": " Mama Put ",
            "email": "hello@mamaput.ng",
            "logo_url": "https://cdn.example.com/mamaput.png",
            "location": "Yaba, Lagos",
            "cuisine_tags": ["Nigerian", " ", "Rice"],
            "contact_info": {"website": "https://mamaput.ng", "phone": "+234 800 000 0000"},
            "created_at": "2025-01-01T00:00:00Z",
            "rating": null
        }))
        .unwrap();

        assert_eq!(vendor.id.as_str(), "3");
        assert_eq!(vendor.name, "Mama Put");
        assert_eq!(vendor.location.as_deref(), Some("Yaba, Lagos"));
        assert_eq!(vendor.cuisine_tags, vec!["Nigerian", "Rice"]);
        assert_eq!(vendor.phone.as_deref(), Some("+234 800 000 0000"));
        assert_eq!(vendor.website.as_deref(), Some("https://mamaput.ng/"));
        assert_eq!(vendor.rating, None);
    }

    #[test]
    fn test_vendor_requires_id_and_name() {
        assert!(matches!(
            parse_vendor(json!({"name": "Grill"})),
            Err(RecordError::Missing("id"))
        ));
        assert!(matches!(
            parse_vendor(json!({"id": 1, "name": ""})),
            Err(RecordError::Missing("name"))
        ));
    }

    #[test]
    fn test_vendor_drops_unsafe_links() {
        let vendor = parse_vendor(json!({
            "id": 1,
            "name": "Grill",
            "contact_info": {"website": "javascript:alert(1)"}
        }))
        .unwrap();
        assert_eq!(vendor.website, None);
        assert_eq!(vendor.phone, None);
    }
}
