use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storefront_catalog::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory))
        .route("/:product_id", get(get_inventory).put(set_stock))
        .route("/:product_id/adjust", post(adjust_stock))
}

pub async fn list_inventory(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.storefront.catalog.list_stock().await {
        Ok(rows) => {
            let views: Vec<dto::InventoryView> = rows.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.storefront.catalog.get_stock(product_id).await {
        Ok(report) => (StatusCode::OK, Json(dto::InventoryView::from(report))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::SetStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services
        .storefront
        .catalog
        .set_stock(product_id, body.stock_available)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(dto::InventoryView::from(report))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.catalog.adjust_stock(product_id, body.delta).await {
        Ok(report) => (StatusCode::OK, Json(dto::InventoryView::from(report))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
