//! Session middleware configuration.
//!
//! Sessions live in a bounded in-memory store next to the carts they point
//! at; both expire after the same idle timeout. Every response re-saves the
//! session, so an active visitor's cookie and record stay alive.

use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::services::MokaSessionStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "chowhub_session";

/// Create the session layer over `store`.
#[must_use]
pub fn create_session_layer(
    config: &StorefrontConfig,
    store: MokaSessionStore,
) -> SessionManagerLayer<MokaSessionStore> {
    let idle = tower_sessions::cookie::time::Duration::try_from(config.cart.idle_timeout)
        .unwrap_or(tower_sessions::cookie::time::Duration::hours(2));

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(idle))
        .with_always_save(true)
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
