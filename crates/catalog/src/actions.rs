//! Catalog bulk actions, keyed by name.

use chrono::{DateTime, Utc};

use storefront_core::DomainResult;

use crate::inventory::Inventory;
use crate::product::{Product, Season};

/// Bulk action over products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductAction {
    Activate,
    Deactivate,
    SetSeason(Season),
}

impl ProductAction {
    pub const NAMES: [&'static str; 4] = [
        "activate_products",
        "deactivate_products",
        "set_summer_season",
        "set_winter_season",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "activate_products" => Some(Self::Activate),
            "deactivate_products" => Some(Self::Deactivate),
            "set_summer_season" => Some(Self::SetSeason(Season::Summer)),
            "set_winter_season" => Some(Self::SetSeason(Season::Winter)),
            _ => None,
        }
    }

    /// Applies the action; returns whether the product changed.
    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) -> bool {
        match self {
            Self::Activate => product.set_active(true, now),
            Self::Deactivate => product.set_active(false, now),
            Self::SetSeason(season) => product.set_season(season, now),
        }
    }
}

/// Bulk action over inventory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryAction {
    /// Add a fixed amount of stock.
    Restock(i64),
    ClearStock,
}

impl InventoryAction {
    pub const NAMES: [&'static str; 2] = ["restock_items", "clear_stock"];

    pub fn from_name(name: &str, restock_amount: i64) -> Option<Self> {
        match name {
            "restock_items" => Some(Self::Restock(restock_amount)),
            "clear_stock" => Some(Self::ClearStock),
            _ => None,
        }
    }

    pub fn apply(self, inventory: &mut Inventory, now: DateTime<Utc>) -> DomainResult<()> {
        match self {
            Self::Restock(amount) => inventory.adjust(amount, now),
            Self::ClearStock => inventory.set(0, now),
        }
    }
}
