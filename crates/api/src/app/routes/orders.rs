use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storefront_infra::services::CheckoutRequest;
use storefront_sales::{OrderId, OrderStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/:id", get(get_order))
        .route("/:id/confirm", post(confirm_order))
        .route("/:id/ship", post(ship_order))
        .route("/:id/deliver", post(deliver_order))
        .route("/:id/cancel", post(cancel_order))
}

/// Without `items` in the body, the customer's cart is checked out.
pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.checkout.place(body).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::OrderView::from(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::OrdersQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.storefront.orders.list(params.customer_id).await {
        Ok(orders) => (StatusCode::OK, Json(dto::orders_to_views(&orders))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(order_id) = id.parse::<OrderId>() else {
        return errors::invalid_id("order");
    };

    match services.storefront.orders.get(order_id).await {
        Ok(order) => (StatusCode::OK, Json(dto::OrderView::from(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn confirm_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, id, OrderStatus::Confirmed).await
}

pub async fn ship_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, id, OrderStatus::Shipped).await
}

pub async fn deliver_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, id, OrderStatus::Delivered).await
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    transition(services, id, OrderStatus::Cancelled).await
}

async fn transition(services: Arc<AppServices>, id: String, to: OrderStatus) -> axum::response::Response {
    let Ok(order_id) = id.parse::<OrderId>() else {
        return errors::invalid_id("order");
    };

    match services.storefront.orders.transition(order_id, to).await {
        Ok(order) => (StatusCode::OK, Json(dto::OrderView::from(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
