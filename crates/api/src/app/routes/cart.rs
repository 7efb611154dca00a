use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use storefront_sales::CartLineId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_lines).delete(clear_cart))
        .route("/summary", get(summary))
        .route("/items", post(add_item))
        .route("/items/:id", put(update_item).delete(remove_item))
}

pub async fn list_lines(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::CustomerQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.storefront.carts.lines(params.customer_id).await {
        Ok(lines) => (StatusCode::OK, Json(lines)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::CustomerQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.storefront.carts.summary(params.customer_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Adds to the existing line for the same product, if any. 201 when a line was created.
pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::AddCartItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services
        .storefront
        .carts
        .add(body.customer_id, body.product_id, body.quantity)
        .await
    {
        Ok((line, created)) => {
            let status = if created { StatusCode::CREATED } else { StatusCode::OK };
            (status, Json(json!({ "line": line, "created": created }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateCartItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(line_id) = id.parse::<CartLineId>() else {
        return errors::invalid_id("cart line");
    };
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.carts.update_quantity(line_id, body.quantity).await {
        Ok(line) => (StatusCode::OK, Json(line)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(line_id) = id.parse::<CartLineId>() else {
        return errors::invalid_id("cart line");
    };

    match services.storefront.carts.remove(line_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::CustomerQuery>, QueryRejection>,
) -> axum::response::Response {
    let params = match dto::query(params) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.storefront.carts.clear(params.customer_id).await {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
