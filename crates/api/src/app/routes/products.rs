use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use storefront_catalog::{ProductDetails, ProductId};
use storefront_infra::services::NewProduct;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(categories))
        .route("/count", get(count_products))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ProductQuery>, QueryRejection>,
) -> axum::response::Response {
    let filter = match dto::query(params).and_then(dto::ProductQuery::into_filter) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.storefront.catalog.list_products(&filter).await {
        Ok(rows) => {
            let views: Vec<dto::ProductView> = rows
                .into_iter()
                .map(|(product, stock)| dto::ProductView::new(product, Some(stock)))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn count_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ProductQuery>, QueryRejection>,
) -> axum::response::Response {
    let filter = match dto::query(params).and_then(dto::ProductQuery::into_filter) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.storefront.catalog.count_products(&filter).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.storefront.catalog.categories().await {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.catalog.create_product(body).await {
        Ok((product, inventory)) => (
            StatusCode::CREATED,
            Json(dto::ProductView::new(product, Some(inventory.stock_available()))),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.storefront.catalog.get_stock(product_id).await {
        Ok(report) => {
            let stock = report.inventory.stock_available();
            (StatusCode::OK, Json(dto::ProductView::new(report.product, Some(stock)))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    payload: Result<Json<ProductDetails>, JsonRejection>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };
    let details = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.catalog.update_product(product_id, details).await {
        Ok(product) => (StatusCode::OK, Json(dto::ProductView::new(product, None))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Soft delete; the product stays readable by id with `is_active: false`.
pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return errors::invalid_id("product");
    };

    match services.storefront.catalog.delete_product(product_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
