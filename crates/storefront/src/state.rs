//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::services::{CartSessions, MokaSessionStore};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds the configuration, the hosted backend
/// client, the registry of live session carts, and the session records that
/// point at them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    carts: CartSessions,
    sessions: MokaSessionStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built from the
    /// configured URL.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend, config.cart.currency)?;
        let carts = CartSessions::new(&config.cart);
        let sessions = MokaSessionStore::new(&config.cart, carts.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                carts,
                sessions,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the hosted backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the session cart registry.
    #[must_use]
    pub fn carts(&self) -> &CartSessions {
        &self.inner.carts
    }

    /// Get a reference to the session record store.
    #[must_use]
    pub fn sessions(&self) -> &MokaSessionStore {
        &self.inner.sessions
    }
}
