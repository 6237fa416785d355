//! Session-scoped cart hosting.
//!
//! Each browsing session owns one [`CartStore`], looked up from the
//! [`CartSessions`] registry by the [`CartSessionId`] kept in the session.
//! Stores idle for longer than the session timeout are evicted, which is
//! the cart's teardown. A store also goes away when the session record that
//! points at it does (see [`super::session_store`]).
//!
//! One checkout per cart runs at a time. A [`PendingCheckout`] holds the
//! snapshot being ordered; completing it removes only what was ordered.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chowhub_core::{Cart, CartError, CartSessionId, CartSnapshot, CurrencyCode, LineItem, MealId};
use moka::sync::Cache;
use tracing::debug;

use crate::config::CartConfig;

/// Shared handle to one session's cart.
///
/// Cloning is cheap. Mutations hold the write lock for their whole state
/// transition, so readers never see a half-applied change.
#[derive(Debug, Clone)]
pub struct CartStore {
    inner: Arc<RwLock<CartState>>,
}

#[derive(Debug)]
struct CartState {
    cart: Cart,
    revision: u64,
    checkout_in_flight: bool,
}

impl CartState {
    const fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl CartStore {
    /// Create an empty store priced in `currency`.
    #[must_use]
    pub fn new(currency: CurrencyCode) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CartState {
                cart: Cart::new(currency),
                revision: 0,
                checkout_in_flight: false,
            })),
        }
    }

    // A panic while holding the lock cannot leave the cart half-mutated:
    // every mutation validates before it writes.
    fn read(&self) -> RwLockReadGuard<'_, CartState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current contents and aggregates.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.read().cart.snapshot()
    }

    /// Number of observable changes applied so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    /// The currency this cart accepts.
    #[must_use]
    pub fn currency_code(&self) -> CurrencyCode {
        self.read().cart.currency_code()
    }

    /// Add an item with merge-add semantics.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidItem`] if the item is rejected; the cart
    /// is unchanged.
    pub fn add_item(&self, item: LineItem) -> Result<(), CartError> {
        let mut state = self.write();
        let (id, quantity) = (item.id.clone(), item.quantity);
        state.cart.add_item(item)?;
        state.bump();
        debug!(meal_id = %id, quantity, revision = state.revision, "Added to cart");
        Ok(())
    }

    /// Remove the entry for `id`. Returns whether anything was removed.
    pub fn remove_item(&self, id: &MealId) -> bool {
        let mut state = self.write();
        let removed = state.cart.remove_item(id);
        if removed {
            state.bump();
            debug!(meal_id = %id, revision = state.revision, "Removed from cart");
        }
        removed
    }

    /// Replace the quantity of the entry for `id`. Returns whether the id
    /// was present.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidItem`] for a zero quantity or a total
    /// that would overflow.
    pub fn set_quantity(&self, id: &MealId, quantity: u32) -> Result<bool, CartError> {
        let mut state = self.write();
        let previous = state.cart.quantity(id);
        let found = state.cart.set_quantity(id, quantity)?;
        if found && previous != Some(quantity) {
            state.bump();
            debug!(meal_id = %id, quantity, revision = state.revision, "Updated cart quantity");
        }
        Ok(found)
    }

    /// Start placing an order from the current contents.
    ///
    /// Returns `None` while another checkout of this cart is in flight.
    #[must_use]
    pub fn begin_checkout(&self) -> Option<PendingCheckout> {
        let mut state = self.write();
        if state.checkout_in_flight {
            return None;
        }
        state.checkout_in_flight = true;

        Some(PendingCheckout {
            store: self.clone(),
            snapshot: state.cart.snapshot(),
            revision: state.revision,
        })
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut state = self.write();
        if !state.cart.is_empty() {
            state.cart.clear();
            state.bump();
            debug!(revision = state.revision, "Cleared cart");
        }
    }
}

/// An order being placed from a fixed snapshot of a cart.
///
/// Dropping it without calling [`Self::complete`] leaves the cart untouched
/// and lets the next checkout start.
#[must_use]
#[derive(Debug)]
pub struct PendingCheckout {
    store: CartStore,
    snapshot: CartSnapshot,
    revision: u64,
}

impl PendingCheckout {
    /// The contents being ordered.
    pub const fn snapshot(&self) -> &CartSnapshot {
        &self.snapshot
    }

    /// Remove the ordered items from the cart once the order is accepted.
    ///
    /// Anything added while the order was in flight stays, as does any
    /// quantity above what was ordered. Returns whether the cart is now
    /// empty.
    pub fn complete(self) -> bool {
        let mut state = self.store.write();
        state.checkout_in_flight = false;

        if state.revision == self.revision {
            if !state.cart.is_empty() {
                state.cart.clear();
                state.bump();
            }
            debug!(revision = state.revision, "Checked out cart");
            return true;
        }

        for line in &self.snapshot.items {
            match state.cart.quantity(&line.id) {
                Some(current) if current > line.quantity => {
                    if state.cart.set_quantity(&line.id, current - line.quantity).is_err() {
                        state.cart.remove_item(&line.id);
                    }
                }
                Some(_) => {
                    state.cart.remove_item(&line.id);
                }
                None => {}
            }
        }
        state.bump();
        debug!(
            revision = state.revision,
            remaining = state.cart.len(),
            "Checked out cart with changes made during checkout"
        );
        state.cart.is_empty()
    }
}

impl Drop for PendingCheckout {
    fn drop(&mut self) {
        self.store.write().checkout_in_flight = false;
    }
}

/// Registry of live carts keyed by session.
///
/// Entries expire after the configured idle time and the registry holds at
/// most `max_carts` stores.
#[derive(Clone)]
pub struct CartSessions {
    carts: Cache<CartSessionId, CartStore>,
    currency: CurrencyCode,
}

impl CartSessions {
    /// Create a registry from cart settings.
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        Self::with_limits(config.currency, config.idle_timeout, config.max_carts)
    }

    /// Create a registry with explicit limits.
    #[must_use]
    pub fn with_limits(currency: CurrencyCode, idle_timeout: Duration, max_carts: u64) -> Self {
        let carts = Cache::builder()
            .max_capacity(max_carts)
            .time_to_idle(idle_timeout)
            .build();
        Self { carts, currency }
    }

    /// Get the store for `id`, creating an empty one on first use.
    #[must_use]
    pub fn attach(&self, id: &CartSessionId) -> CartStore {
        self.carts.get_with(*id, || {
            debug!(cart_session_id = %id, "Created cart");
            CartStore::new(self.currency)
        })
    }

    /// Drop the store for `id`, if any. Called when its session ends.
    pub fn detach(&self, id: &CartSessionId) {
        self.carts.invalidate(id);
    }

    /// Approximate number of live carts.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.carts.entry_count()
    }

    /// Whether no carts are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending evictions so [`Self::len`] is exact.
    pub fn run_pending_tasks(&self) {
        self.carts.run_pending_tasks();
    }
}
