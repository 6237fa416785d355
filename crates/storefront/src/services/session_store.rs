//! In-memory session store.
//!
//! Session records live in a bounded `moka` cache with the same idle timeout
//! as the carts. When a record leaves the cache for any reason other than
//! being overwritten, the cart it points at is detached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chowhub_core::CartSessionId;
use moka::future::Cache;
use moka::notification::RemovalCause;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tracing::debug;

use crate::config::CartConfig;
use crate::models::session_keys;
use crate::services::CartSessions;

/// Session store backed by a bounded, idle-expiring cache.
#[derive(Debug, Clone)]
pub struct MokaSessionStore {
    records: Cache<Id, Record>,
}

impl MokaSessionStore {
    /// Create a store sized and timed like the cart registry.
    #[must_use]
    pub fn new(config: &CartConfig, carts: CartSessions) -> Self {
        Self::with_limits(config.idle_timeout, config.max_carts, carts)
    }

    /// Create a store with explicit limits.
    #[must_use]
    pub fn with_limits(idle_timeout: Duration, max_sessions: u64, carts: CartSessions) -> Self {
        let records = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle_timeout)
            .eviction_listener(move |id: Arc<Id>, record: Record, cause| {
                if cause == RemovalCause::Replaced {
                    return;
                }
                if let Some(cart_session_id) = cart_session_of(&record) {
                    debug!(
                        session_id = %id,
                        cart_session_id = %cart_session_id,
                        ?cause,
                        "Session ended, dropping cart"
                    );
                    carts.detach(&cart_session_id);
                }
            })
            .build();

        Self { records }
    }

    /// Approximate number of stored sessions.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.records.entry_count()
    }

    /// Whether no sessions are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending expirations and deliver their notifications.
    pub async fn run_pending_tasks(&self) {
        self.records.run_pending_tasks().await;
    }
}

fn cart_session_of(record: &Record) -> Option<CartSessionId> {
    record
        .data
        .get(session_keys::CART_SESSION)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            let entry = self
                .records
                .entry(record.id)
                .or_insert(record.clone())
                .await;
            if entry.is_fresh() {
                return Ok(());
            }
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let Some(record) = self.records.get(session_id).await else {
            return Ok(None);
        };

        if record.expiry_date > OffsetDateTime::now_utc() {
            Ok(Some(record))
        } else {
            self.records.invalidate(session_id).await;
            Ok(None)
        }
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.invalidate(session_id).await;
        Ok(())
    }
}
