//! Request/response DTOs and JSON mapping helpers.
//!
//! Money fields serialize as decimal strings (`"120.00"`), which is what
//! `rust_decimal` does by default.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_catalog::{Product, ProductFilter, ProductId, Season, StockStatus};
use storefront_core::AggregateRoot;
use storefront_customers::CustomerId;
use storefront_infra::services::StockReport;
use storefront_sales::{Order, OrderId, OrderItem, OrderStatus};

use crate::app::errors;

/// Unwrap a JSON body, turning extractor rejections into `validation_error`.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()))
}

/// Same as [`body`] for query strings.
pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, axum::response::Response> {
    params
        .map(|Query(v)| v)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `GET /products` query. Blank values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub season: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
}

impl ProductQuery {
    pub fn into_filter(self) -> Result<ProductFilter, axum::response::Response> {
        let season = match self.season.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<Season>().map_err(|_| {
                errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("unknown season '{raw}'"),
                )
            })?),
            None => None,
        };
        Ok(ProductFilter {
            category: self.category,
            season,
            search: self.search,
            in_stock: self.in_stock.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub stock_available: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub customer_id: CustomerId,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub customer_id: Option<CustomerId>,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AddCartItemRequest {
    pub customer_id: CustomerId,
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdminActionRequest {
    #[serde(default)]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetCatalogRequest {
    #[serde(default)]
    pub confirm: bool,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub sale_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_available: Option<i64>,
}

impl ProductView {
    pub fn new(product: Product, stock_available: Option<i64>) -> Self {
        Self {
            sale_price: product.sale_price(),
            product,
            stock_available,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InventoryView {
    pub product_id: ProductId,
    pub product_name: String,
    pub stock_available: i64,
    pub status: StockStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<StockReport> for InventoryView {
    fn from(r: StockReport) -> Self {
        Self {
            product_id: r.product.id,
            product_name: r.product.name().to_string(),
            stock_available: r.inventory.stock_available(),
            status: r.status,
            updated_at: r.inventory.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub line_no: u32,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Always present for a placed order; placement rejects totals that overflow.
    pub subtotal: Option<Decimal>,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            line_no: item.line_no,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity.get(),
            unit_price: item.unit_price,
            subtotal: item.subtotal().ok(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_id: Option<CustomerId>,
    pub status: OrderStatus,
    pub payment_method: String,
    pub items: Vec<OrderItemView>,
    pub total_amount: Decimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: *order.id(),
            customer_id: order.customer_id(),
            status: order.status(),
            payment_method: order.payment_method().to_string(),
            items: order.items().iter().map(OrderItemView::from).collect(),
            total_amount: order.total_amount(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            version: order.version(),
        }
    }
}

pub fn orders_to_views(orders: &[Order]) -> Vec<OrderView> {
    orders.iter().map(OrderView::from).collect()
}
