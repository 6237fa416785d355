//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Menu of available meals
//! GET  /meals/{id}             - Meal detail with add-to-cart form
//! GET  /vendors                - Vendor listing
//! GET  /vendors/{id}           - Vendor profile with its available meals
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (returns count badge, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout
//! GET  /checkout               - Checkout form
//! POST /checkout               - Place order
//! GET  /checkout/complete      - Order placed confirmation
//! ```
//!
//! Health routes live in the crate root and are not wrapped by the cart
//! middleware.

pub mod cart;
pub mod checkout;
pub mod home;
pub mod meals;
pub mod vendors;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/complete", get(checkout::complete))
}

/// Create all page routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/meals/{id}", get(meals::show))
        .route("/vendors", get(vendors::index))
        .route("/vendors/{id}", get(vendors::show))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
}
