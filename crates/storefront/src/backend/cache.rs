//! Cache types for backend catalog responses.

use chowhub_core::{MealId, VendorId};

use crate::backend::types::{Meal, Vendor};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Meal(MealId),
    AvailableMeals,
    Vendor(VendorId),
    Vendors,
    VendorMeals(VendorId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Meal(Box<Meal>),
    Meals(Vec<Meal>),
    Vendor(Box<Vendor>),
    Vendors(Vec<Vendor>),
}
