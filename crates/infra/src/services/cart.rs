use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use storefront_catalog::ProductId;
use storefront_core::{DomainError, Quantity};
use storefront_customers::CustomerId;
use storefront_sales::{Cart, CartLine, CartLineId, CartSummary};

use super::{ServiceError, ServiceResult};
use crate::store::Store;

/// Cart lines per customer. Stock is not reserved here; checkout checks it.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Add `quantity` of a product, merging into an existing line for the same
    /// product. Returns the line and whether it was newly created.
    pub async fn add(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: i64,
    ) -> ServiceResult<(CartLine, bool)> {
        let quantity = Quantity::new(quantity)?;

        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {product_id}")))?;
        if !product.can_be_sold() {
            return Err(
                DomainError::validation(format!("product '{}' is not available", product.name())).into(),
            );
        }

        let (line, created) = self
            .store
            .add_or_merge(customer_id, product_id, quantity, Utc::now())
            .await?;
        debug!(
            customer_id = %customer_id,
            line_id = %line.id,
            quantity = line.quantity.get(),
            created,
            "cart line saved"
        );
        Ok((line, created))
    }

    pub async fn get_line(&self, line_id: CartLineId) -> ServiceResult<CartLine> {
        self.store
            .get_line(line_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("cart line {line_id}")))
    }

    pub async fn update_quantity(&self, line_id: CartLineId, quantity: i64) -> ServiceResult<CartLine> {
        let quantity = Quantity::new(quantity)?;
        Ok(self.store.update_quantity(line_id, quantity).await?)
    }

    pub async fn remove(&self, line_id: CartLineId) -> ServiceResult<CartLine> {
        Ok(self.store.remove_line(line_id).await?)
    }

    /// Remove every line of the customer's cart; returns how many were removed.
    pub async fn clear(&self, customer_id: CustomerId) -> ServiceResult<u64> {
        Ok(self.store.clear_cart(customer_id).await?)
    }

    pub async fn lines(&self, customer_id: CustomerId) -> ServiceResult<Vec<CartLine>> {
        Ok(self.store.list_lines(customer_id).await?)
    }

    /// Cart contents priced at the current catalog prices.
    pub async fn summary(&self, customer_id: CustomerId) -> ServiceResult<CartSummary> {
        let lines = self.store.list_lines(customer_id).await?;
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let products = self.store.get_products(&ids).await?;
        Ok(Cart::from_lines(customer_id, lines).summary(&products)?)
    }
}
