//! Cart attachment middleware and extractor.
//!
//! [`attach_cart`] is the point where a request's cart comes into scope: it
//! resolves the session's [`CartSessionId`] (minting one on first visit) and
//! puts it and that session's [`CartStore`] into the request extensions.
//! [`SessionCart`] takes it back out in handlers.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chowhub_core::{CartError, CartSessionId};
use tower_sessions::Session;
use tracing::Span;

use crate::error::AppError;
use crate::models::session_keys;
use crate::services::CartStore;
use crate::state::AppState;

/// Resolve the session's cart and attach it to the request.
///
/// Must run inside the session layer.
pub async fn attach_cart(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return AppError::Internal("session layer missing".to_string()).into_response();
    };

    let cart_session_id = match cart_session_id(&session).await {
        Ok(id) => id,
        Err(e) => {
            return AppError::Internal(format!("session store error: {e}")).into_response();
        }
    };

    Span::current().record("cart_session_id", tracing::field::display(cart_session_id));

    let store = state.carts().attach(&cart_session_id);
    request.extensions_mut().insert(store);
    request.extensions_mut().insert(cart_session_id);

    next.run(request).await
}

/// Read the cart session ID from the session, storing a fresh one if absent.
async fn cart_session_id(
    session: &Session,
) -> Result<CartSessionId, tower_sessions::session::Error> {
    if let Some(id) = session
        .get::<CartSessionId>(session_keys::CART_SESSION)
        .await?
    {
        return Ok(id);
    }

    let id = CartSessionId::new();
    session.insert(session_keys::CART_SESSION, id).await?;
    tracing::debug!(cart_session_id = %id, "Started cart session");
    Ok(id)
}

/// Extractor for the current session's cart.
///
/// Fails with [`CartError::Uninitialized`] when the route is not wrapped by
/// [`attach_cart`]. That is a wiring defect, so it surfaces as a 500 rather
/// than an empty cart.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(SessionCart(cart): SessionCart) -> String {
///     cart.snapshot().total_item_count.to_string()
/// }
/// ```
pub struct SessionCart(pub CartStore);

impl<S> FromRequestParts<S> for SessionCart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CartStore>()
            .cloned()
            .map(Self)
            .ok_or(AppError::Cart(CartError::Uninitialized))
    }
}
