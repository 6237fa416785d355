//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Mutations that change the cart respond with `HX-Trigger: cart-updated` so
//! the header badge refreshes itself from `/cart/count`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use chowhub_core::{CartError, CartSnapshot, LineItem, MealId, Price};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::SessionCart;
use crate::services::CartStore;
use crate::state::AppState;

/// HTMX event fired when the cart changes.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image_url: Option<String>,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    pub subtotal: String,
    pub delivery_fee: String,
    pub total: String,
}

impl CartView {
    /// Build the view for a snapshot, adding the flat delivery fee.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the fee is in another currency or a
    /// total overflows.
    pub fn build(snapshot: &CartSnapshot, delivery_fee: Price) -> Result<Self> {
        let summary = snapshot
            .summary(delivery_fee)
            .map_err(|e| AppError::Internal(format!("cart summary: {e}")))?;

        let items = snapshot
            .items
            .iter()
            .map(CartItemView::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            items,
            item_count: snapshot.total_item_count,
            subtotal: summary.subtotal.to_string(),
            delivery_fee: summary.delivery_fee.to_string(),
            total: summary.total.to_string(),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl TryFrom<&LineItem> for CartItemView {
    type Error = AppError;

    fn try_from(item: &LineItem) -> Result<Self> {
        let line_total = item
            .line_total()
            .map_err(|e| AppError::Internal(format!("line total: {e}")))?;

        Ok(Self {
            id: item.id.to_string(),
            title: item.title.clone(),
            quantity: item.quantity,
            price: item.unit_price.to_string(),
            line_price: line_total.to_string(),
            image_url: item.image_url.clone(),
        })
    }
}

/// Render the current cart of `store`.
pub(crate) fn cart_view(state: &AppState, store: &CartStore) -> Result<CartView> {
    CartView::build(&store.snapshot(), state.config().cart.delivery_fee_price())
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub meal_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub meal_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub meal_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub cart_count: u64,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// Attach the change trigger when the cart revision moved.
fn with_cart_trigger(changed: bool, body: impl IntoResponse) -> Response {
    if changed {
        (AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]), body).into_response()
    } else {
        body.into_response()
    }
}

fn parse_meal_id(raw: &str) -> std::result::Result<MealId, CartError> {
    Ok(MealId::parse(raw)?)
}

/// Display cart page.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
) -> Result<CartShowTemplate> {
    let view = cart_view(&state, &cart)?;
    Ok(CartShowTemplate {
        cart_count: view.item_count,
        cart: view,
    })
}

/// Add a meal to the cart (HTMX).
///
/// The line item is built from the validated catalog meal, so the title,
/// price, and photo are snapshotted at add time. Returns the count badge.
#[instrument(skip(state, cart, form), fields(meal_id = %form.meal_id, quantity = ?form.quantity))]
pub async fn add(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let id = parse_meal_id(&form.meal_id)?;
    let quantity = form.quantity.unwrap_or(1);

    let meal = state.backend().get_meal(&id).await?;
    if !meal.is_available {
        return Err(AppError::BadRequest(format!(
            "{} is not available right now",
            meal.title
        )));
    }

    let before = cart.revision();
    cart.add_item(meal.to_line_item(quantity))?;
    add_breadcrumb("cart", "Added to cart", Some(&[("meal_id", id.as_str())]));

    let count = cart.snapshot().total_item_count;
    Ok(with_cart_trigger(
        cart.revision() != before,
        CartCountTemplate { count },
    ))
}

/// Update a line item's quantity (HTMX). Returns the cart items fragment.
#[instrument(skip(state, cart, form), fields(meal_id = %form.meal_id, quantity = form.quantity))]
pub async fn update(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let id = parse_meal_id(&form.meal_id)?;

    let before = cart.revision();
    cart.set_quantity(&id, form.quantity)?;

    Ok(with_cart_trigger(
        cart.revision() != before,
        CartItemsTemplate {
            cart: cart_view(&state, &cart)?,
        },
    ))
}

/// Remove a line item (HTMX). Returns the cart items fragment.
#[instrument(skip(state, cart, form), fields(meal_id = %form.meal_id))]
pub async fn remove(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let id = parse_meal_id(&form.meal_id)?;

    let before = cart.revision();
    cart.remove_item(&id);

    Ok(with_cart_trigger(
        cart.revision() != before,
        CartItemsTemplate {
            cart: cart_view(&state, &cart)?,
        },
    ))
}

/// Get cart count badge (HTMX).
#[instrument(skip(cart))]
pub async fn count(SessionCart(cart): SessionCart) -> CartCountTemplate {
    CartCountTemplate {
        count: cart.snapshot().total_item_count,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use chowhub_core::{CurrencyCode, InvalidItemReason};
    use rust_decimal::Decimal;

    fn naira(amount: i64) -> Price {
        Price::new(Decimal::from(amount), CurrencyCode::NGN)
    }

    #[test]
    fn test_cart_view_adds_delivery_fee() {
        let store = CartStore::new(CurrencyCode::NGN);
        store
            .add_item(LineItem::new(MealId::parse("a").unwrap(), "Jollof", naira(1000), 2))
            .unwrap();

        let view = CartView::build(&store.snapshot(), naira(500)).unwrap();
        assert_eq!(view.item_count, 2);
        assert_eq!(view.items[0].line_price, "₦2,000.00");
        assert_eq!(view.subtotal, "₦2,000.00");
        assert_eq!(view.delivery_fee, "₦500.00");
        assert_eq!(view.total, "₦2,500.00");
    }

    #[test]
    fn test_cart_view_rejects_fee_in_other_currency() {
        let store = CartStore::new(CurrencyCode::NGN);
        let fee = Price::new(Decimal::from(5), CurrencyCode::USD);
        assert!(matches!(
            CartView::build(&store.snapshot(), fee),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_blank_meal_id_is_invalid_item() {
        assert_eq!(
            parse_meal_id("  "),
            Err(CartError::InvalidItem(InvalidItemReason::EmptyId))
        );
    }

    #[test]
    fn test_trigger_only_on_change() {
        let changed = with_cart_trigger(true, "ok");
        assert_eq!(changed.headers()["HX-Trigger"], CART_UPDATED_EVENT);

        let unchanged = with_cart_trigger(false, "ok");
        assert!(unchanged.headers().get("HX-Trigger").is_none());
    }
}
