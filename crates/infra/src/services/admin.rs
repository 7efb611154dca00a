//! Named bulk actions over products, inventory, orders and cart lines.
//!
//! Each selected id is processed on its own: one failure is reported in the
//! outcome and does not stop or undo the others.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use storefront_catalog::{InventoryAction, ProductAction, ProductId};
use storefront_core::{DomainError, Quantity};
use storefront_sales::{CartAction, CartLineId, OrderAction, OrderId};

use super::{CartService, CatalogService, OrderService, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Product(ProductAction),
    Inventory(InventoryAction),
    Order(OrderAction),
    Cart(CartAction),
}

impl AdminAction {
    pub fn parse(name: &str, restock_amount: i64) -> ServiceResult<Self> {
        ProductAction::from_name(name)
            .map(Self::Product)
            .or_else(|| InventoryAction::from_name(name, restock_amount).map(Self::Inventory))
            .or_else(|| OrderAction::from_name(name).map(Self::Order))
            .or_else(|| CartAction::from_name(name).map(Self::Cart))
            .ok_or_else(|| DomainError::validation(format!("unknown action '{name}'")).into())
    }

    pub fn names() -> Vec<&'static str> {
        ProductAction::NAMES
            .iter()
            .chain(InventoryAction::NAMES.iter())
            .chain(OrderAction::NAMES.iter())
            .chain(CartAction::NAMES.iter())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub updated: usize,
    pub failed: Vec<BulkFailure>,
}

#[derive(Clone)]
pub struct AdminService {
    catalog: CatalogService,
    orders: OrderService,
    carts: CartService,
    restock_amount: i64,
}

impl AdminService {
    pub fn new(catalog: CatalogService, orders: OrderService, carts: CartService, restock_amount: i64) -> Self {
        Self {
            catalog,
            orders,
            carts,
            restock_amount,
        }
    }

    /// Run the action named `name` over `ids`. Unknown names are rejected before
    /// anything is touched.
    pub async fn run(&self, name: &str, ids: &[Uuid]) -> ServiceResult<BulkOutcome> {
        let action = AdminAction::parse(name, self.restock_amount)?;
        let mut outcome = BulkOutcome::default();

        for &id in ids {
            match self.apply(action, id).await {
                Ok(()) => outcome.updated += 1,
                Err(err) => outcome.failed.push(BulkFailure {
                    id,
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            action = name,
            updated = outcome.updated,
            failed = outcome.failed.len(),
            "bulk action applied"
        );
        Ok(outcome)
    }

    async fn apply(&self, action: AdminAction, id: Uuid) -> ServiceResult<()> {
        match action {
            AdminAction::Product(action) => {
                let product_id = ProductId::from_uuid(id);
                let mut product = self.catalog.get_product(product_id).await?;
                if action.apply(&mut product, Utc::now()) {
                    self.catalog.save_product(&product).await?;
                }
            }
            AdminAction::Inventory(InventoryAction::Restock(amount)) => {
                self.catalog.adjust_stock(ProductId::from_uuid(id), amount).await?;
            }
            AdminAction::Inventory(InventoryAction::ClearStock) => {
                self.catalog.set_stock(ProductId::from_uuid(id), 0).await?;
            }
            AdminAction::Order(action) => {
                self.orders.transition(OrderId::from_uuid(id), action.target()).await?;
            }
            AdminAction::Cart(CartAction::ClearCarts) => {
                self.carts.remove(CartLineId::from_uuid(id)).await?;
            }
            AdminAction::Cart(CartAction::IncreaseQuantity) => {
                let line = self.carts.get_line(CartLineId::from_uuid(id)).await?;
                let quantity = line.quantity.checked_add(Quantity::ONE)?;
                self.carts.update_quantity(line.id, quantity.as_i64()).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_covers_every_listed_name() {
        for name in AdminAction::names() {
            assert!(AdminAction::parse(name, 50).is_ok(), "{name}");
        }
    }

    #[test]
    fn restock_uses_configured_amount() {
        assert_eq!(
            AdminAction::parse("restock_items", 25).unwrap(),
            AdminAction::Inventory(InventoryAction::Restock(25))
        );
    }

    #[test]
    fn unknown_name_is_a_validation_error() {
        let err = AdminAction::parse("drop_tables", 50).unwrap_err();
        assert!(matches!(err, super::super::ServiceError::Validation(_)));
    }
}
