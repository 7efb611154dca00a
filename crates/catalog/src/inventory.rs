use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{DomainError, DomainResult, Quantity};

use crate::product::ProductId;

/// Stock record for one product (one-to-one with [`crate::Product`]).
///
/// `stock_available` never goes below zero: every mutation is checked here and
/// the stores repeat the check inside their commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub product_id: ProductId,
    stock_available: i64,
    pub updated_at: DateTime<Utc>,
}

/// Raised when a reservation asks for more units than are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
pub struct InsufficientStock {
    pub product_id: ProductId,
    pub requested: u32,
    pub available: i64,
}

impl Inventory {
    pub fn new(product_id: ProductId, stock_available: i64, now: DateTime<Utc>) -> DomainResult<Self> {
        ensure_non_negative(stock_available)?;
        Ok(Self {
            product_id,
            stock_available,
            updated_at: now,
        })
    }

    pub fn stock_available(&self) -> i64 {
        self.stock_available
    }

    pub fn has_available(&self, quantity: Quantity) -> bool {
        self.stock_available >= quantity.as_i64()
    }

    /// Decrement stock for an order line.
    pub fn reserve(&mut self, quantity: Quantity, now: DateTime<Utc>) -> Result<(), InsufficientStock> {
        if !self.has_available(quantity) {
            return Err(InsufficientStock {
                product_id: self.product_id,
                requested: quantity.get(),
                available: self.stock_available,
            });
        }
        self.stock_available -= quantity.as_i64();
        self.updated_at = now;
        Ok(())
    }

    /// Overwrite the stock level.
    pub fn set(&mut self, stock_available: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_non_negative(stock_available)?;
        self.stock_available = stock_available;
        self.updated_at = now;
        Ok(())
    }

    /// Relative adjustment. A zero delta is invalid input; going negative is refused.
    pub fn adjust(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_stock = self
            .stock_available
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock adjustment overflow"))?;
        if new_stock < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.stock_available = new_stock;
        self.updated_at = now;
        Ok(())
    }

    pub fn status(&self, low_stock_threshold: i64) -> StockStatus {
        StockStatus::classify(self.stock_available, low_stock_threshold)
    }
}

fn ensure_non_negative(stock: i64) -> DomainResult<()> {
    if stock < 0 {
        return Err(DomainError::validation(format!(
            "stock cannot be negative (got {stock})"
        )));
    }
    Ok(())
}

/// Admin-facing stock classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn classify(stock: i64, low_stock_threshold: i64) -> Self {
        if stock > low_stock_threshold {
            StockStatus::InStock
        } else if stock > 0 {
            StockStatus::LowStock
        } else {
            StockStatus::OutOfStock
        }
    }
}

/// All-or-nothing reservation over several inventory records.
///
/// Every demand is checked before any record is touched, so on error the
/// records are left exactly as they were. Repeated products are summed; a
/// product without an inventory record counts as zero available.
pub fn reserve_all(
    inventories: &mut HashMap<ProductId, Inventory>,
    demands: &[(ProductId, Quantity)],
    now: DateTime<Utc>,
) -> Result<(), InsufficientStock> {
    let mut totals: BTreeMap<ProductId, Quantity> = BTreeMap::new();
    for (product_id, quantity) in demands {
        let total = match totals.get(product_id) {
            Some(existing) => existing.checked_add(*quantity).map_err(|_| InsufficientStock {
                product_id: *product_id,
                requested: u32::MAX,
                available: inventories.get(product_id).map_or(0, Inventory::stock_available),
            })?,
            None => *quantity,
        };
        totals.insert(*product_id, total);
    }

    for (product_id, quantity) in &totals {
        let available = inventories.get(product_id).map_or(0, Inventory::stock_available);
        if available < quantity.as_i64() {
            return Err(InsufficientStock {
                product_id: *product_id,
                requested: quantity.get(),
                available,
            });
        }
    }
    for (product_id, quantity) in totals {
        if let Some(inv) = inventories.get_mut(&product_id) {
            inv.reserve(quantity, now)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn inv(stock: i64) -> Inventory {
        Inventory::new(ProductId::generate(), stock, Utc::now()).unwrap()
    }

    #[test]
    fn negative_initial_stock_is_rejected() {
        assert!(matches!(
            Inventory::new(ProductId::generate(), -1, Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn reserve_refuses_to_oversell() {
        let mut i = inv(2);
        let err = i.reserve(qty(3), Utc::now()).unwrap_err();
        assert_eq!(err.requested, 3);
        assert_eq!(err.available, 2);
        assert_eq!(i.stock_available(), 2);

        i.reserve(qty(2), Utc::now()).unwrap();
        assert_eq!(i.stock_available(), 0);
    }

    #[test]
    fn adjust_rejects_zero_and_negative_results() {
        let mut i = inv(5);
        assert!(matches!(i.adjust(0, Utc::now()), Err(DomainError::Validation(_))));
        assert!(matches!(
            i.adjust(-6, Utc::now()),
            Err(DomainError::InvariantViolation(_))
        ));
        i.adjust(-5, Utc::now()).unwrap();
        assert_eq!(i.stock_available(), 0);
        i.adjust(50, Utc::now()).unwrap();
        assert_eq!(i.stock_available(), 50);
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(StockStatus::classify(51, 50), StockStatus::InStock);
        assert_eq!(StockStatus::classify(50, 50), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(1, 50), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(0, 50), StockStatus::OutOfStock);
    }

    #[test]
    fn reserve_all_is_all_or_nothing() {
        let a = inv(10);
        let b = inv(1);
        let (a_id, b_id) = (a.product_id, b.product_id);
        let mut map = HashMap::from([(a_id, a), (b_id, b)]);

        let err = reserve_all(&mut map, &[(a_id, qty(2)), (b_id, qty(2))], Utc::now()).unwrap_err();
        assert_eq!(err.product_id, b_id);
        assert_eq!(map[&a_id].stock_available(), 10);
        assert_eq!(map[&b_id].stock_available(), 1);

        reserve_all(&mut map, &[(a_id, qty(2)), (b_id, qty(1))], Utc::now()).unwrap();
        assert_eq!(map[&a_id].stock_available(), 8);
        assert_eq!(map[&b_id].stock_available(), 0);
    }

    #[test]
    fn reserve_all_sums_repeated_products() {
        let a = inv(5);
        let a_id = a.product_id;
        let mut map = HashMap::from([(a_id, a)]);
        let err = reserve_all(&mut map, &[(a_id, qty(3)), (a_id, qty(3))], Utc::now()).unwrap_err();
        assert_eq!(err.requested, 6);
        assert_eq!(map[&a_id].stock_available(), 5);
    }

    #[test]
    fn missing_inventory_counts_as_zero() {
        let mut map = HashMap::new();
        let id = ProductId::generate();
        let err = reserve_all(&mut map, &[(id, qty(1))], Utc::now()).unwrap_err();
        assert_eq!(err.available, 0);
    }

    proptest! {
        /// Property: stock never goes negative whatever sequence of adjustments is attempted.
        #[test]
        fn stock_never_negative(start in 0i64..1000, deltas in proptest::collection::vec(-500i64..500, 0..40)) {
            let mut i = inv(start);
            for d in deltas {
                let _ = i.adjust(d, Utc::now());
                prop_assert!(i.stock_available() >= 0);
            }
        }
    }
}
