use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storefront_infra::services::AdminAction;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/actions", get(list_actions))
        .route("/actions/:name", post(run_action))
        .route("/reset-catalog", post(reset_catalog))
}

pub async fn list_actions() -> axum::response::Response {
    (StatusCode::OK, Json(AdminAction::names())).into_response()
}

pub async fn run_action(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
    payload: Result<Json<dto::AdminActionRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.admin.run(&name, &body.ids).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn reset_catalog(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::ResetCatalogRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.storefront.maintenance.reset_catalog(body.confirm).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
