use std::sync::Arc;

use tracing::warn;

use storefront_core::DomainError;

use super::ServiceResult;
use crate::store::{ResetReport, Store};

/// Destructive catalog maintenance.
#[derive(Clone)]
pub struct MaintenanceService {
    store: Arc<dyn Store>,
}

impl MaintenanceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Delete every product with its inventory, all cart lines, and all orders
    /// (items included). Customers are kept. Refused unless `confirm` is set.
    pub async fn reset_catalog(&self, confirm: bool) -> ServiceResult<ResetReport> {
        if !confirm {
            return Err(DomainError::validation("catalog reset requires confirm=true").into());
        }
        let report = self.store.reset_catalog().await?;
        warn!(
            products = report.products,
            orders = report.orders,
            cart_lines = report.cart_lines,
            "catalog reset"
        );
        Ok(report)
    }
}
