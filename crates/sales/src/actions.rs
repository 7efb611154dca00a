//! Order and cart bulk actions, keyed by name.

use crate::order::OrderStatus;

/// Bulk status change over orders. Each order still goes through the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    MarkConfirmed,
    MarkShipped,
    MarkDelivered,
    MarkCancelled,
}

impl OrderAction {
    pub const NAMES: [&'static str; 4] = [
        "mark_confirmed",
        "mark_shipped",
        "mark_delivered",
        "mark_cancelled",
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mark_confirmed" => Some(Self::MarkConfirmed),
            "mark_shipped" => Some(Self::MarkShipped),
            "mark_delivered" => Some(Self::MarkDelivered),
            "mark_cancelled" => Some(Self::MarkCancelled),
            _ => None,
        }
    }

    pub fn target(self) -> OrderStatus {
        match self {
            Self::MarkConfirmed => OrderStatus::Confirmed,
            Self::MarkShipped => OrderStatus::Shipped,
            Self::MarkDelivered => OrderStatus::Delivered,
            Self::MarkCancelled => OrderStatus::Cancelled,
        }
    }
}

/// Bulk action over cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAction {
    /// Delete the selected lines.
    ClearCarts,
    /// Add one unit to each selected line.
    IncreaseQuantity,
}

impl CartAction {
    pub const NAMES: [&'static str; 2] = ["clear_carts", "increase_quantity"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "clear_carts" => Some(Self::ClearCarts),
            "increase_quantity" => Some(Self::IncreaseQuantity),
            _ => None,
        }
    }
}
