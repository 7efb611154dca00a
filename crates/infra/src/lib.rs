//! Infrastructure layer: storage, application services, notifications, config.

pub mod config;
pub mod notification;
pub mod services;
pub mod store;

mod integration_tests;

pub use config::{AppConfig, CatalogSettings, CheckoutSettings, ConfigError};
pub use services::{ServiceError, ServiceResult, Storefront};
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, StoreResult};
