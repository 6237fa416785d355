//! Integration tests for ChowHub.
//!
//! Each [`TestContext`] starts two servers on ephemeral ports: an axum mock
//! of the hosted backend's row API and the real storefront router pointed
//! at it. Tests drive the storefront with a cookie-enabled `reqwest` client,
//! so every client is one browsing session.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p chowhub-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chowhub_storefront::config::{BackendConfig, CartConfig, StorefrontConfig};
use chowhub_storefront::state::AppState;
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

/// Anon key the mock backend expects.
pub const ANON_KEY: &str = "test-anon-key";

/// Catalog served by the mock backend.
///
/// `a`, `b`, and `c` are available and `sold-out` is not. `b` embeds its
/// vendor as a one-element array and `c` sends `total_orders` as a string,
/// both of which the backend may do. `broken` (blank title), `odd-tags`
/// (tags as a string), and the bare string row fail validation, so
/// listings must skip them without losing the rest.
#[must_use]
pub fn catalog() -> Vec<Value> {
    vec![
        json!({
            "id": "a",
            "vendor_id": 1,
            "title": "Jollof Rice",
            "description": "Smoky party jollof",
            "photo_url": "https://cdn.example.com/jollof.jpg",
            "is_available": true,
            "tags": ["rice"],
            "price": 1000,
            "category": "Mains",
            "total_orders": 90,
            "vendors": {"id": 1, "name": "Mama Put", "logo_url": null, "rating": 4.5}
        }),
        json!({
            "id": "b",
            "vendor_id": 2,
            "title": "Puff Puff",
            "photo_url": "/relative/puff.png",
            "is_available": true,
            "price": "500",
            "total_orders": 40,
            "vendors": [{"id": 2, "name": "Sweet Tooth", "rating": "4.1"}]
        }),
        json!({
            "id": "c",
            "vendor_id": 1,
            "title": "Moi Moi",
            "is_available": true,
            "price": 300,
            "total_orders": "12",
            "vendors": null
        }),
        json!({
            "id": "sold-out",
            "title": "Pepper Soup",
            "is_available": false,
            "price": 2500,
            "total_orders": 10
        }),
        json!({
            "id": "broken",
            "title": "   ",
            "is_available": true,
            "price": 100,
            "total_orders": 5
        }),
        json!({
            "id": "odd-tags",
            "vendor_id": 2,
            "title": "Ofada Stew",
            "is_available": true,
            "tags": "stew",
            "price": 1800
        }),
        json!("not a row"),
    ]
}

/// Vendors served by the mock backend.
///
/// Vendors 1 and 2 are valid. The last two rows fail validation (blank name,
/// missing id).
#[must_use]
pub fn vendors() -> Vec<Value> {
    vec![
        json!({
            "id": 1,
            "name": "Mama Put",
            "email": "hello@mamaput.ng",
            "logo_url": "https://cdn.example.com/mamaput.png",
            "location": "Yaba, Lagos",
            "cuisine_tags": ["Nigerian", "Rice"],
            "contact_info": {"website": "https://mamaput.ng", "phone": "+234 800 000 0000"},
            "rating": 4.5
        }),
        json!({
            "id": 2,
            "name": "Sweet Tooth",
            "cuisine_tags": ["Snacks"],
            "contact_info": {"website": "javascript:alert(1)"},
            "rating": "4.1"
        }),
        json!({"id": 3, "name": "  "}),
        json!({"name": "Ghost Kitchen"}),
    ]
}

/// Column value as filter text, so `eq.1` matches both `1` and `"1"`.
fn column_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether `row[column]` satisfies an optional `eq.` filter.
fn matches_eq(row: &Value, column: &str, filter: Option<&String>) -> bool {
    match filter.and_then(|f| f.strip_prefix("eq.")) {
        Some(wanted) => column_text(&row[column]).as_deref() == Some(wanted),
        None => true,
    }
}

/// Mock of the hosted backend's row API.
#[derive(Clone, Default)]
pub struct MockBackend {
    orders: Arc<Mutex<Vec<Value>>>,
    fail_orders: Arc<AtomicBool>,
    order_delay_ms: Arc<AtomicU64>,
}

impl MockBackend {
    /// Orders received so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make order inserts fail with a 500 until reset.
    pub fn fail_orders(&self, fail: bool) {
        self.fail_orders.store(fail, Ordering::SeqCst);
    }

    /// Hold each order insert for `delay` before accepting it.
    pub fn delay_orders(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.order_delay_ms.store(millis, Ordering::SeqCst);
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/rest/v1/meals", get(list_meals))
            .route("/rest/v1/vendors", get(list_vendors))
            .route("/rest/v1/orders", post(insert_order))
            .with_state(self.clone())
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    apikey == Some(ANON_KEY) && bearer == Some(ANON_KEY)
}

async fn list_meals(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let only_available = params.get("is_available").map(String::as_str) == Some("eq.true");

    let rows: Vec<Value> = catalog()
        .into_iter()
        .filter(|row| matches_eq(row, "id", params.get("id")))
        .filter(|row| matches_eq(row, "vendor_id", params.get("vendor_id")))
        .filter(|row| !only_available || row["is_available"] != false)
        .collect();

    Json(rows).into_response()
}

async fn list_vendors(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let rows: Vec<Value> = vendors()
        .into_iter()
        .filter(|row| matches_eq(row, "id", params.get("id")))
        .collect();

    Json(rows).into_response()
}

async fn insert_order(
    State(backend): State<MockBackend>,
    headers: HeaderMap,
    Json(order): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let delay = backend.order_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if backend.fail_orders.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    backend
        .orders
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(order);
    StatusCode::CREATED
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server error");
    });
    addr
}

/// Storefront configuration pointed at a backend on `backend_addr`.
#[must_use]
pub fn test_config(backend_addr: SocketAddr) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        backend: BackendConfig {
            url: Url::parse(&format!("http://{backend_addr}")).expect("valid mock URL"),
            anon_key: SecretString::from(ANON_KEY),
        },
        cart: CartConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A running storefront plus its mock backend.
pub struct TestContext {
    /// Cookie-enabled client: one browsing session.
    pub client: Client,
    /// Storefront base URL, without trailing slash.
    pub base_url: String,
    /// The mock backend, for inspecting orders and injecting failures.
    pub backend: MockBackend,
}

impl TestContext {
    /// Start the mock backend and the storefront.
    pub async fn start() -> Self {
        let backend = MockBackend::default();
        let backend_addr = serve(backend.router()).await;

        let state = AppState::new(test_config(backend_addr)).expect("Failed to build state");
        let storefront_addr = serve(chowhub_storefront::app(state)).await;

        Self {
            client: new_session_client(),
            base_url: format!("http://{storefront_addr}"),
            backend,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` with this context's session.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// POST a form to `path` with this context's session.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// Add `quantity` of `meal_id` and assert the request succeeded.
    pub async fn add(&self, meal_id: &str, quantity: u32) {
        let quantity = quantity.to_string();
        let response = self
            .post_form("/cart/add", &[("meal_id", meal_id), ("quantity", &quantity)])
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK, "add {meal_id}");
    }

    /// Current badge count, read from `/cart/count`.
    pub async fn cart_count(&self) -> u64 {
        badge_count(&self.get("/cart/count").await.text().await.expect("body"))
    }
}

/// A fresh cookie-enabled client, i.e. a new browsing session.
#[must_use]
pub fn new_session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Parse the count badge fragment; an empty fragment means zero.
#[must_use]
pub fn badge_count(fragment: &str) -> u64 {
    let digits: String = fragment.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
