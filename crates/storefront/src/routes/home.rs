//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::SessionCart;
use crate::routes::meals::MealView;
use crate::state::AppState;

/// Home page template: the menu of available meals.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub meals: Vec<MealView>,
    pub catalog_unavailable: bool,
    pub cart_count: u64,
}

/// Display the menu.
///
/// A backend failure renders an empty menu with a notice rather than an
/// error page.
#[instrument(skip(state, cart))]
pub async fn home(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
) -> impl IntoResponse {
    let (meals, catalog_unavailable) = match state.backend().list_meals().await {
        Ok(meals) => (meals.iter().map(MealView::from).collect(), false),
        Err(e) => {
            tracing::warn!("Failed to fetch meals: {e}");
            (Vec::new(), true)
        }
    };

    HomeTemplate {
        meals,
        catalog_unavailable,
        cart_count: cart.snapshot().total_item_count,
    }
}
