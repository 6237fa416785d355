//! Hosted backend client.
//!
//! # Architecture
//!
//! - Talks to the backend's PostgREST-style row API at `{url}/rest/v1/{table}`
//! - The backend is the source of truth for meals, vendors, and orders;
//!   nothing is synced locally
//! - In-memory caching via `moka` for catalog reads (5 minute TTL)
//! - Every row is decoded and validated on its own at this boundary (see
//!   [`records`]); listings skip bad rows instead of failing
//!
//! # Example
//!
//! ```rust,ignore
//! use chowhub_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend, config.cart.currency)?;
//! let meals = client.list_meals().await?;
//! let meal = client.get_meal(&meals[0].id).await?;
//! ```

mod cache;
pub mod records;
pub mod types;

pub use records::RecordError;
pub use types::{Meal, OrderLine, OrderRequest, Vendor, VendorSummary};

use std::sync::Arc;
use std::time::Duration;

use chowhub_core::{CurrencyCode, MealId, VendorId};
use moka::future::Cache;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::BackendConfig;
use cache::{CacheKey, CacheValue};

const MEALS_TABLE: &str = "meals";
const VENDORS_TABLE: &str = "vendors";
const ORDERS_TABLE: &str = "orders";

/// Columns requested for meal reads, with the vendor embedded.
const MEAL_SELECT: &str = "*,vendors(id,name,logo_url,rating)";

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend URL could not be built.
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success status from the backend.
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A returned row failed validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the hosted backend's row API.
///
/// Meal reads are cached for 5 minutes. Order inserts are never cached.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    rest_base: Url,
    anon_key: SecretString,
    currency: CurrencyCode,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client. Prices are read in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST endpoint cannot be derived from the
    /// configured URL.
    pub fn new(config: &BackendConfig, currency: CurrencyCode) -> Result<Self, BackendError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                rest_base: rest_base(&config.url)?,
                anon_key: config.anon_key.clone(),
                currency,
                cache,
            }),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.inner.anon_key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    fn table_url(&self, table: &str) -> Result<Url, BackendError> {
        Ok(self.inner.rest_base.join(table)?)
    }

    /// Read the body of a response, mapping failures to errors.
    async fn checked_body(response: Response) -> Result<String, BackendError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %truncated(&body, 500),
                "Backend returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncated(&body, 200),
            });
        }

        Ok(body)
    }

    /// Fetch a table read as raw JSON rows.
    ///
    /// Only the outer array is checked here; each row is decoded separately.
    async fn fetch_rows(&self, url: Url) -> Result<Vec<Value>, BackendError> {
        let response = self.authorized(self.inner.client.get(url)).send().await?;
        let body = Self::checked_body(response).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncated(&body, 500),
                "Failed to parse backend rows"
            );
            BackendError::Parse(e)
        })
    }

    /// Meal listing query, optionally narrowed to one vendor.
    fn meals_url(&self, vendor: Option<&VendorId>) -> Result<Url, BackendError> {
        let mut url = self.table_url(MEALS_TABLE)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", MEAL_SELECT);
            if let Some(vendor) = vendor {
                query.append_pair("vendor_id", &format!("eq.{vendor}"));
            }
            query
                .append_pair("is_available", "eq.true")
                .append_pair("order", "total_orders.desc");
        }
        Ok(url)
    }

    // =========================================================================
    // Meal Methods
    // =========================================================================

    /// List available meals with their vendors, most ordered first.
    ///
    /// Rows that fail validation are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_meals(&self) -> Result<Vec<Meal>, BackendError> {
        if let Some(CacheValue::Meals(meals)) = self.inner.cache.get(&CacheKey::AvailableMeals).await
        {
            debug!("Cache hit for meal listing");
            return Ok(meals);
        }

        let currency = self.inner.currency;
        let rows = self.fetch_rows(self.meals_url(None)?).await?;
        let meals = keep_valid(rows, MEALS_TABLE, |row| records::parse_meal(row, currency));

        debug!(count = meals.len(), "Fetched meals");

        self.inner
            .cache
            .insert(CacheKey::AvailableMeals, CacheValue::Meals(meals.clone()))
            .await;

        Ok(meals)
    }

    /// Get one meal with its vendor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row matches, `InvalidRecord` if the row fails
    /// validation, or an error if the API request fails.
    #[instrument(skip(self), fields(meal_id = %id))]
    pub async fn get_meal(&self, id: &MealId) -> Result<Meal, BackendError> {
        let cache_key = CacheKey::Meal(id.clone());

        if let Some(CacheValue::Meal(meal)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for meal");
            return Ok(*meal);
        }

        let mut url = self.table_url(MEALS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", MEAL_SELECT)
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("limit", "1");

        let row = self
            .fetch_rows(url)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("Meal not found: {id}")))?;

        let meal = records::parse_meal(row, self.inner.currency)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Meal(Box::new(meal.clone())))
            .await;

        Ok(meal)
    }

    // =========================================================================
    // Vendor Methods
    // =========================================================================

    /// List vendors by name.
    ///
    /// Rows that fail validation are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, BackendError> {
        if let Some(CacheValue::Vendors(vendors)) = self.inner.cache.get(&CacheKey::Vendors).await {
            debug!("Cache hit for vendor listing");
            return Ok(vendors);
        }

        let mut url = self.table_url(VENDORS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "name.asc");

        let rows = self.fetch_rows(url).await?;
        let vendors = keep_valid(rows, VENDORS_TABLE, records::parse_vendor);
        debug!(count = vendors.len(), "Fetched vendors");

        self.inner
            .cache
            .insert(CacheKey::Vendors, CacheValue::Vendors(vendors.clone()))
            .await;

        Ok(vendors)
    }

    /// Get one vendor profile.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row matches, `InvalidRecord` if the row fails
    /// validation, or an error if the API request fails.
    #[instrument(skip(self), fields(vendor_id = %id))]
    pub async fn get_vendor(&self, id: &VendorId) -> Result<Vendor, BackendError> {
        let cache_key = CacheKey::Vendor(id.clone());

        if let Some(CacheValue::Vendor(vendor)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for vendor");
            return Ok(*vendor);
        }

        let mut url = self.table_url(VENDORS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("limit", "1");

        let row = self
            .fetch_rows(url)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("Vendor not found: {id}")))?;

        let vendor = records::parse_vendor(row)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Vendor(Box::new(vendor.clone())))
            .await;

        Ok(vendor)
    }

    /// List one vendor's available meals, most ordered first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(vendor_id = %id))]
    pub async fn vendor_meals(&self, id: &VendorId) -> Result<Vec<Meal>, BackendError> {
        let cache_key = CacheKey::VendorMeals(id.clone());

        if let Some(CacheValue::Meals(meals)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for vendor meals");
            return Ok(meals);
        }

        let currency = self.inner.currency;
        let rows = self.fetch_rows(self.meals_url(Some(id))?).await?;
        let meals = keep_valid(rows, MEALS_TABLE, |row| records::parse_meal(row, currency));

        self.inner
            .cache
            .insert(cache_key, CacheValue::Meals(meals.clone()))
            .await;

        Ok(meals)
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Insert one order row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the backend rejects the row.
    #[instrument(skip(self, order), fields(items = order.items.len(), total = %order.total))]
    pub async fn submit_order(&self, order: &OrderRequest) -> Result<(), BackendError> {
        let url = self.table_url(ORDERS_TABLE)?;

        let response = self
            .authorized(self.inner.client.post(url))
            .header("Prefer", "return=minimal")
            .json(order)
            .send()
            .await?;

        Self::checked_body(response).await?;
        debug!("Order submitted");
        Ok(())
    }
}

/// Derive `{url}/rest/v1/` from the project URL, tolerating a missing
/// trailing slash.
fn rest_base(url: &Url) -> Result<Url, url::ParseError> {
    let mut base = url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/")
}

/// Validate each row on its own, skipping the ones that fail.
fn keep_valid<T>(
    rows: Vec<Value>,
    table: &'static str,
    parse: impl Fn(Value) -> Result<T, RecordError>,
) -> Vec<T> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match parse(row) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(table, index, error = %e, "Skipping invalid row");
                None
            }
        })
        .collect()
}

fn truncated(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
