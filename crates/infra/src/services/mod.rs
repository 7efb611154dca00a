//! Application services: the operations the HTTP layer exposes.
//!
//! Each service validates input with the domain crates, performs one store
//! call (or one store transaction), then publishes the resulting events.
//! Errors from both sides are folded into [`ServiceError`].

use std::sync::Arc;

use thiserror::Error;

use storefront_catalog::InsufficientStock;
use storefront_core::DomainError;

use crate::config::AppConfig;
use crate::notification::EventPublisher;
use crate::store::{Store, StoreError};

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod maintenance;
pub mod orders;

pub use admin::{AdminAction, AdminService, BulkFailure, BulkOutcome};
pub use cart::CartService;
pub use catalog::{CatalogService, NewProduct, StockReport};
pub use checkout::{CheckoutRequest, CheckoutService};
pub use customers::CustomerService;
pub use maintenance::MaintenanceService;
pub use orders::OrderService;

/// Application-level error, one variant per outcome class the API distinguishes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    OutOfStock(InsufficientStock),

    /// Duplicate unique key or stale version.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Illegal state transition or a stock adjustment below zero.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: impl core::fmt::Display) -> Self {
        ServiceError::NotFound(what.to_string())
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            StoreError::InsufficientStock(e) => ServiceError::OutOfStock(e),
            StoreError::Domain(e) => e.into(),
            StoreError::Backend(_) | StoreError::Poisoned => ServiceError::Store(value.to_string()),
        }
    }
}

/// All services, wired to one store and one publisher.
#[derive(Clone)]
pub struct Storefront {
    pub catalog: CatalogService,
    pub customers: CustomerService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub admin: AdminService,
    pub maintenance: MaintenanceService,
}

impl Storefront {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher, config: &AppConfig) -> Self {
        let catalog = CatalogService::new(store.clone(), config.catalog);
        let orders = OrderService::new(store.clone(), publisher.clone());
        let carts = CartService::new(store.clone());
        Self {
            customers: CustomerService::new(store.clone(), publisher.clone()),
            checkout: CheckoutService::new(store.clone(), publisher, config.checkout.clone()),
            admin: AdminService::new(
                catalog.clone(),
                orders.clone(),
                carts.clone(),
                config.catalog.restock_amount,
            ),
            maintenance: MaintenanceService::new(store),
            catalog,
            orders,
            carts,
        }
    }
}
