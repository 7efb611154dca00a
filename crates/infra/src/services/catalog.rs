use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use storefront_catalog::{Inventory, Product, ProductDetails, ProductFilter, ProductId, StockStatus};
use storefront_core::DomainError;

use super::{ServiceError, ServiceResult};
use crate::config::CatalogSettings;
use crate::store::Store;

/// Input for creating a product together with its inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    #[serde(flatten)]
    pub details: ProductDetails,
    #[serde(default)]
    pub initial_stock: i64,
}

/// One inventory row joined with its product and classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    pub product: Product,
    pub inventory: Inventory,
    pub status: StockStatus,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    settings: CatalogSettings,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, settings: CatalogSettings) -> Self {
        Self { store, settings }
    }

    pub async fn create_product(&self, input: NewProduct) -> ServiceResult<(Product, Inventory)> {
        let now = Utc::now();
        let product = Product::create(ProductId::generate(), input.details, now)?;
        let inventory = Inventory::new(product.id, input.initial_stock, now)?;
        self.store.insert_product(&product, &inventory).await?;
        info!(
            product_id = %product.id,
            category = product.category(),
            stock = inventory.stock_available(),
            "product created"
        );
        Ok((product, inventory))
    }

    pub async fn update_product(&self, id: ProductId, details: ProductDetails) -> ServiceResult<Product> {
        let mut product = self.get_product(id).await?;
        product.update(details, Utc::now())?;
        self.store.update_product(&product).await?;
        Ok(product)
    }

    /// Soft delete: the product leaves listings and checkout, while order
    /// history keeps referencing it. Deleting twice is a no-op.
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<Product> {
        let mut product = self.get_product(id).await?;
        if product.set_active(false, Utc::now()) {
            self.store.update_product(&product).await?;
            info!(product_id = %id, "product deleted");
        }
        Ok(product)
    }

    /// Persist a product mutated in place (activation, season).
    pub async fn save_product(&self, product: &Product) -> ServiceResult<()> {
        Ok(self.store.update_product(product).await?)
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("product {id}")))
    }

    /// Active products matching `filter`, with their current stock.
    pub async fn list_products(&self, filter: &ProductFilter) -> ServiceResult<Vec<(Product, i64)>> {
        Ok(self.store.list_products(filter).await?)
    }

    pub async fn count_products(&self, filter: &ProductFilter) -> ServiceResult<usize> {
        Ok(self.store.list_products(filter).await?.len())
    }

    pub async fn categories(&self) -> ServiceResult<Vec<String>> {
        Ok(self.store.categories().await?)
    }

    pub async fn get_stock(&self, product_id: ProductId) -> ServiceResult<StockReport> {
        let product = self.get_product(product_id).await?;
        let inventory = self
            .store
            .get_inventory(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("inventory for product {product_id}")))?;
        Ok(self.report(product, inventory))
    }

    pub async fn list_stock(&self) -> ServiceResult<Vec<StockReport>> {
        let rows = self.store.list_inventory().await?;
        Ok(rows
            .into_iter()
            .map(|(product, inventory)| self.report(product, inventory))
            .collect())
    }

    /// Only rows classified as low stock or out of stock.
    pub async fn low_stock(&self) -> ServiceResult<Vec<StockReport>> {
        let mut rows = self.list_stock().await?;
        rows.retain(|r| r.status != StockStatus::InStock);
        Ok(rows)
    }

    pub async fn set_stock(&self, product_id: ProductId, stock: i64) -> ServiceResult<StockReport> {
        if stock < 0 {
            return Err(DomainError::validation("stock_available cannot be negative").into());
        }
        let product = self.get_product(product_id).await?;
        let inventory = self.store.set_stock(product_id, stock, Utc::now()).await?;
        info!(product_id = %product_id, stock, "stock set");
        Ok(self.report(product, inventory))
    }

    /// Add `delta` (positive or negative) to the stock level.
    pub async fn adjust_stock(&self, product_id: ProductId, delta: i64) -> ServiceResult<StockReport> {
        if delta == 0 {
            return Err(DomainError::validation("stock adjustment cannot be zero").into());
        }
        let product = self.get_product(product_id).await?;
        let inventory = self.store.adjust_stock(product_id, delta, Utc::now()).await?;
        info!(
            product_id = %product_id,
            delta,
            stock = inventory.stock_available(),
            "stock adjusted"
        );
        Ok(self.report(product, inventory))
    }

    fn report(&self, product: Product, inventory: Inventory) -> StockReport {
        let status = inventory.status(self.settings.low_stock_threshold);
        StockReport {
            product,
            inventory,
            status,
        }
    }
}
