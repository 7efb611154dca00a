use axum::{Router, routing::get};

pub mod admin;
pub mod cart;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/products", products::router())
        .nest("/inventory", inventory::router())
        .nest("/customers", customers::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
}
