//! Checkout route handlers.
//!
//! Checkout fixes a snapshot of the cart, submits one order row to the
//! backend, and only removes the ordered items once the backend has accepted
//! it. A second submit while one is in flight is refused.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chowhub_core::{CartSessionId, PaymentMethod};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::OrderRequest;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::SessionCart;
use crate::models::{OrderConfirmation, session_keys};
use crate::routes::cart::{CartView, cart_view};
use crate::state::AppState;

/// Longest delivery address accepted, in characters.
pub const MAX_ADDRESS_CHARS: usize = 500;

/// Payment method option for the checkout form.
#[derive(Clone)]
pub struct PaymentMethodView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn payment_method_views(selected: PaymentMethod) -> Vec<PaymentMethodView> {
    PaymentMethod::ALL
        .iter()
        .map(|method| PaymentMethodView {
            value: method.as_str(),
            label: method.label(),
            selected: *method == selected,
        })
        .collect()
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub delivery_address: String,
    pub payment_method: Option<PaymentMethod>,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub cart: CartView,
    pub cart_count: u64,
    pub delivery_address: String,
    pub payment_methods: Vec<PaymentMethodView>,
    pub error: Option<String>,
}

/// Order placed page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/complete.html")]
pub struct CheckoutCompleteTemplate {
    pub order: OrderConfirmation,
    pub cart_count: u64,
}

/// Trim and bound the delivery address.
fn validate_address(raw: &str) -> std::result::Result<String, &'static str> {
    let address = raw.trim();
    if address.is_empty() {
        return Err("Please enter a delivery address");
    }
    if address.chars().count() > MAX_ADDRESS_CHARS {
        return Err("Delivery address is too long");
    }
    Ok(address.to_string())
}

/// Display the checkout form. Redirects to the cart when it is empty.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
) -> Result<Response> {
    let view = cart_view(&state, &cart)?;
    if view.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(CheckoutTemplate {
        cart_count: view.item_count,
        cart: view,
        delivery_address: String::new(),
        payment_methods: payment_method_views(PaymentMethod::default()),
        error: None,
    }
    .into_response())
}

/// Place the order.
///
/// On success the ordered items leave the cart and the customer is
/// redirected to the confirmation page. On a validation or backend failure
/// the form is shown again with the cart left intact. A submit that arrives
/// while this cart's order is already being placed gets a 409.
#[instrument(skip(state, cart, session, form), fields(payment_method = ?form.payment_method))]
pub async fn submit(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Extension(cart_session_id): Extension<CartSessionId>,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let payment_method = form.payment_method.unwrap_or_default();

    let Some(checkout) = cart.begin_checkout() else {
        tracing::warn!("Checkout already in flight");
        let view = cart_view(&state, &cart)?;
        return Ok((
            StatusCode::CONFLICT,
            CheckoutTemplate {
                cart_count: view.item_count,
                cart: view,
                delivery_address: form.delivery_address,
                payment_methods: payment_method_views(payment_method),
                error: Some("Your order is already being placed.".to_string()),
            },
        )
            .into_response());
    };

    let snapshot = checkout.snapshot().clone();
    if snapshot.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let fee = state.config().cart.delivery_fee_price();
    let view = CartView::build(&snapshot, fee)?;
    let rerender = |status: StatusCode, error: &str| {
        (
            status,
            CheckoutTemplate {
                cart_count: view.item_count,
                cart: view.clone(),
                delivery_address: form.delivery_address.clone(),
                payment_methods: payment_method_views(payment_method),
                error: Some(error.to_string()),
            },
        )
            .into_response()
    };

    let delivery_address = match validate_address(&form.delivery_address) {
        Ok(address) => address,
        Err(message) => return Ok(rerender(StatusCode::BAD_REQUEST, message)),
    };

    let summary = snapshot
        .summary(fee)
        .map_err(|e| AppError::Internal(format!("order summary: {e}")))?;
    let order = OrderRequest::from_snapshot(
        cart_session_id,
        &snapshot,
        &summary,
        delivery_address.clone(),
        payment_method,
        chrono::Utc::now(),
    )
    .map_err(|e| AppError::Internal(format!("order lines: {e}")))?;

    if let Err(e) = state.backend().submit_order(&order).await {
        tracing::error!(error = %e, "Failed to submit order");
        return Ok(rerender(
            StatusCode::BAD_GATEWAY,
            "We couldn't place your order. Please try again.",
        ));
    }

    let cart_emptied = checkout.complete();
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("payment_method", payment_method.as_str())]),
    );
    tracing::info!(
        total = %summary.total,
        items = snapshot.total_item_count,
        cart_emptied,
        "Order placed"
    );

    let confirmation = OrderConfirmation {
        total: summary.total.to_string(),
        item_count: snapshot.total_item_count,
        payment_method: payment_method.label().to_string(),
        delivery_address,
    };
    if let Err(e) = session.insert(session_keys::LAST_ORDER, confirmation).await {
        tracing::warn!("Failed to save order confirmation to session: {e}");
    }

    Ok(Redirect::to("/checkout/complete").into_response())
}

/// Show the confirmation for the order just placed.
///
/// The confirmation is shown once; revisiting redirects to the menu.
#[instrument(skip(cart, session))]
pub async fn complete(SessionCart(cart): SessionCart, session: Session) -> Response {
    let order = match session
        .remove::<OrderConfirmation>(session_keys::LAST_ORDER)
        .await
    {
        Ok(order) => order,
        Err(e) => {
            tracing::warn!("Failed to read order confirmation from session: {e}");
            None
        }
    };

    match order {
        Some(order) => CheckoutCompleteTemplate {
            order,
            cart_count: cart.snapshot().total_item_count,
        }
        .into_response(),
        None => Redirect::to("/").into_response(),
    }
}
