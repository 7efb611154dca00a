//! Persistence for catalog, carts, orders and customers.
//!
//! Stores are split by concern but implemented together, because the order
//! commit has to touch inventory, orders and cart lines in one transaction.
//! Application services hold an `Arc<dyn Store>`.
//!
//! Two implementations:
//! - [`InMemoryStore`]: one mutex around all state (tests/dev).
//! - [`PostgresStore`]: `sqlx` transactions with conditional updates.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use storefront_catalog::{InsufficientStock, Inventory, Product, ProductFilter, ProductId};
use storefront_core::{DomainError, ExpectedVersion, Quantity};
use storefront_customers::{Customer, CustomerId};
use storefront_sales::{CartLine, CartLineId, Order, OrderId};

pub mod memory;
pub mod postgres;
mod schema;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// Stale version or unique-key collision.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStock),

    /// A domain rule refused the mutation inside the store's critical section.
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(what: impl core::fmt::Display) -> Self {
        StoreError::NotFound(what.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Rows removed by [`MaintenanceStore::purge_customer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub cart_lines: u64,
    pub order_items: u64,
    pub orders: u64,
    pub customers: u64,
}

/// Rows removed by [`MaintenanceStore::reset_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub cart_lines: u64,
    pub order_items: u64,
    pub orders: u64,
    pub inventory: u64,
    pub products: u64,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert a product together with its inventory record.
    async fn insert_product(&self, product: &Product, inventory: &Inventory) -> StoreResult<()>;

    /// Overwrite an existing product. `NotFound` if it does not exist.
    async fn update_product(&self, product: &Product) -> StoreResult<()>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Fetch several products at once; missing ids are simply absent from the map.
    async fn get_products(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>>;

    /// Products matching `filter` with their available stock, ordered by category then name.
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<(Product, i64)>>;

    /// Distinct categories of active products, sorted.
    async fn categories(&self) -> StoreResult<Vec<String>>;

    async fn get_inventory(&self, product_id: ProductId) -> StoreResult<Option<Inventory>>;

    /// Every product (active or not) with its inventory, ordered by category then name.
    async fn list_inventory(&self) -> StoreResult<Vec<(Product, Inventory)>>;

    /// Overwrite the stock level.
    async fn set_stock(
        &self,
        product_id: ProductId,
        stock: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Inventory>;

    /// Atomically add `delta`; refuses to go below zero.
    async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Inventory>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Insert a new line or add to the existing (customer, product) line.
    /// Returns the line and whether it was created.
    async fn add_or_merge(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> StoreResult<(CartLine, bool)>;

    async fn get_line(&self, line_id: CartLineId) -> StoreResult<Option<CartLine>>;

    async fn update_quantity(&self, line_id: CartLineId, quantity: Quantity) -> StoreResult<CartLine>;

    async fn remove_line(&self, line_id: CartLineId) -> StoreResult<CartLine>;

    /// Delete every line of the customer's cart. Returns how many were removed.
    async fn clear_cart(&self, customer_id: CustomerId) -> StoreResult<u64>;

    /// Lines in insertion order.
    async fn list_lines(&self, customer_id: CustomerId) -> StoreResult<Vec<CartLine>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commit a freshly placed order in one transaction:
    /// decrement stock for every item (all-or-nothing), insert the order and its
    /// items, and delete `consumed_lines`. A product deactivated since the
    /// snapshot was taken fails the whole commit with a validation error.
    async fn commit_order(&self, order: &Order, consumed_lines: &[CartLineId]) -> StoreResult<()>;

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    /// Newest first. `None` lists every order.
    async fn list_orders(&self, customer_id: Option<CustomerId>) -> StoreResult<Vec<Order>>;

    /// Persist a status change if the stored version still equals `expected`.
    async fn save_status(&self, order: &Order, expected: ExpectedVersion) -> StoreResult<()>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// `Conflict` if the (lower-cased) email is already registered.
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;

    /// Overwrite name, email and phone. `NotFound` if the customer is gone,
    /// `Conflict` if another customer already holds the email.
    async fn update_customer(&self, customer: &Customer) -> StoreResult<()>;

    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>>;

    async fn list_customers(&self) -> StoreResult<Vec<Customer>>;
}

/// Explicit cascades. Nothing relies on `ON DELETE CASCADE`.
#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Delete cart lines, order items, orders, then the customer.
    async fn purge_customer(&self, id: CustomerId) -> StoreResult<PurgeReport>;

    /// Delete cart lines, order items, orders, inventory, then products.
    async fn reset_catalog(&self) -> StoreResult<ResetReport>;
}

/// Everything the application services need from storage.
pub trait Store: CatalogStore + CartStore + OrderStore + CustomerStore + MaintenanceStore {}

impl<T> Store for T where T: CatalogStore + CartStore + OrderStore + CustomerStore + MaintenanceStore {}
