//! Meal route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use chowhub_core::MealId;
use tracing::instrument;

use crate::backend::Meal;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::SessionCart;
use crate::state::AppState;

/// Meal display data for templates.
#[derive(Clone)]
pub struct MealView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: String,
    pub photo_url: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_available: bool,
    pub vendor: Option<VendorView>,
}

/// Vendor display data for templates.
#[derive(Clone)]
pub struct VendorView {
    pub id: Option<String>,
    pub name: String,
    pub logo_url: Option<String>,
    pub rating: Option<String>,
}

impl From<&Meal> for MealView {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id.to_string(),
            title: meal.title.clone(),
            description: meal.description.clone(),
            price: meal.price.to_string(),
            photo_url: meal.photo_url.clone(),
            category: meal.category.clone(),
            tags: meal.tags.clone(),
            is_available: meal.is_available,
            vendor: meal.vendor.as_ref().map(|vendor| VendorView {
                id: vendor
                    .id
                    .as_ref()
                    .or(meal.vendor_id.as_ref())
                    .map(ToString::to_string),
                name: vendor.name.clone(),
                logo_url: vendor.logo_url.clone(),
                rating: vendor.rating.map(|r| format!("{r:.1}")),
            }),
        }
    }
}

/// Meal detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "meals/show.html")]
pub struct MealShowTemplate {
    pub meal: MealView,
    pub cart_count: u64,
}

/// Display a meal with its add-to-cart form.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Path(id): Path<String>,
) -> Result<MealShowTemplate> {
    let id = MealId::parse(&id).map_err(|_| AppError::NotFound(format!("meal {id}")))?;
    let meal = state.backend().get_meal(&id).await?;

    Ok(MealShowTemplate {
        meal: MealView::from(&meal),
        cart_count: cart.snapshot().total_item_count,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::VendorSummary;
    use chowhub_core::{CurrencyCode, Price, VendorId};
    use rust_decimal::Decimal;

    #[test]
    fn test_meal_view_formats_price_and_rating() {
        let meal = Meal {
            id: MealId::parse("m1").unwrap(),
            vendor_id: Some(VendorId::parse("7").unwrap()),
            title: "Jollof Rice".to_string(),
            description: None,
            photo_url: None,
            is_available: true,
            tags: vec!["rice".to_string()],
            price: Price::new(Decimal::from(1500), CurrencyCode::NGN),
            category: None,
            total_orders: 3,
            vendor: Some(VendorSummary {
                id: None,
                name: "Mama Put".to_string(),
                logo_url: None,
                rating: Some(4.3),
            }),
        };

        let view = MealView::from(&meal);
        assert_eq!(view.id, "m1");
        assert_eq!(view.price, "₦1,500.00");
        let vendor = view.vendor.unwrap();
        assert_eq!(vendor.rating.as_deref(), Some("4.3"));
        assert_eq!(vendor.id.as_deref(), Some("7"));
    }
}
