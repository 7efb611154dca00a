use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_customers::{CustomerId, NewCustomer};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(register_customer))
        .route("/:id", get(get_customer).put(update_customer).delete(purge_customer))
        .route("/:id/orders", get(customer_orders))
}

pub async fn register_customer(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.customers.register(body).await {
        Ok(customer) => (StatusCode::CREATED, Json(customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_customers(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.storefront.customers.list().await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(customer_id) = id.parse::<CustomerId>() else {
        return errors::invalid_id("customer");
    };

    match services.storefront.customers.get(customer_id).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<NewCustomer>, JsonRejection>,
) -> axum::response::Response {
    let Ok(customer_id) = id.parse::<CustomerId>() else {
        return errors::invalid_id("customer");
    };
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.customers.update(customer_id, body).await {
        Ok(customer) => (StatusCode::OK, Json(customer)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn customer_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(customer_id) = id.parse::<CustomerId>() else {
        return errors::invalid_id("customer");
    };

    match services.storefront.customers.orders(customer_id).await {
        Ok(orders) => (StatusCode::OK, Json(dto::orders_to_views(&orders))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Deletes the customer's cart lines, orders and the customer itself.
pub async fn purge_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(customer_id) = id.parse::<CustomerId>() else {
        return errors::invalid_id("customer");
    };

    match services.storefront.customers.purge(customer_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
