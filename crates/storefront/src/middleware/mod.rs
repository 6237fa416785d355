//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (per-request hub, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions over a bounded `moka` store)
//! 5. Cart attachment (page and cart routes only)

pub mod cart;
pub mod request_id;
pub mod session;

pub use cart::{SessionCart, attach_cart};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
