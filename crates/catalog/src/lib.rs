//! Catalog domain module: products, their inventory records and the
//! administrative actions that mutate them.
//!
//! Pure domain logic (no IO, no HTTP, no storage).

pub mod actions;
pub mod filter;
pub mod inventory;
pub mod product;

pub use actions::{InventoryAction, ProductAction};
pub use filter::{ProductFilter, categories};
pub use inventory::{InsufficientStock, Inventory, StockStatus, reserve_all};
pub use product::{PRICE_LIMIT, Product, ProductDetails, ProductId, Season};
