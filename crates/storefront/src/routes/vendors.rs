//! Vendor route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chowhub_core::VendorId;
use tracing::instrument;

use crate::backend::Vendor;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::SessionCart;
use crate::routes::meals::MealView;
use crate::state::AppState;

/// Vendor profile data for templates.
#[derive(Clone)]
pub struct VendorProfileView {
    pub id: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub rating: Option<String>,
    pub location: Option<String>,
    pub cuisine_tags: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl From<&Vendor> for VendorProfileView {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id.to_string(),
            name: vendor.name.clone(),
            logo_url: vendor.logo_url.clone(),
            rating: vendor.rating.map(|r| format!("{r:.1}")),
            location: vendor.location.clone(),
            cuisine_tags: vendor.cuisine_tags.clone(),
            email: vendor.email.clone(),
            phone: vendor.phone.clone(),
            website: vendor.website.clone(),
        }
    }
}

/// Vendor listing template.
#[derive(Template, WebTemplate)]
#[template(path = "vendors/index.html")]
pub struct VendorIndexTemplate {
    pub vendors: Vec<VendorProfileView>,
    pub catalog_unavailable: bool,
    pub cart_count: u64,
}

/// Vendor profile template with the vendor's menu.
#[derive(Template, WebTemplate)]
#[template(path = "vendors/show.html")]
pub struct VendorShowTemplate {
    pub vendor: VendorProfileView,
    pub meals: Vec<MealView>,
    pub cart_count: u64,
}

/// List vendors.
///
/// A backend failure renders an empty list with a notice, like the menu.
#[instrument(skip(state, cart))]
pub async fn index(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
) -> impl IntoResponse {
    let (vendors, catalog_unavailable) = match state.backend().list_vendors().await {
        Ok(vendors) => (vendors.iter().map(VendorProfileView::from).collect(), false),
        Err(e) => {
            tracing::warn!("Failed to fetch vendors: {e}");
            (Vec::new(), true)
        }
    };

    VendorIndexTemplate {
        vendors,
        catalog_unavailable,
        cart_count: cart.snapshot().total_item_count,
    }
}

/// Display a vendor profile and its available meals.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    SessionCart(cart): SessionCart,
    Path(id): Path<String>,
) -> Result<VendorShowTemplate> {
    let id = VendorId::parse(&id).map_err(|_| AppError::NotFound(format!("vendor {id}")))?;

    let backend = state.backend();
    let (vendor, meals) = tokio::try_join!(backend.get_vendor(&id), backend.vendor_meals(&id))?;

    Ok(VendorShowTemplate {
        vendor: VendorProfileView::from(&vendor),
        meals: meals.iter().map(MealView::from).collect(),
        cart_count: cart.snapshot().total_item_count,
    })
}
