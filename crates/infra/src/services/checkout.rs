use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use storefront_catalog::ProductId;
use storefront_core::{AggregateRoot, DomainError, Quantity};
use storefront_customers::CustomerId;
use storefront_sales::{
    CartLineId, Order, OrderEvent, OrderId, PlaceOrder, coalesce, resolve_payment_method, snapshot_items,
};

use super::{ServiceError, ServiceResult};
use crate::config::CheckoutSettings;
use crate::notification::{EventPublisher, StorefrontEvent};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Place an order. Without `items` the customer's cart is checked out and the
/// consumed lines are removed in the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub items: Option<Vec<CheckoutItem>>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    publisher: EventPublisher,
    settings: CheckoutSettings,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher, settings: CheckoutSettings) -> Self {
        Self {
            store,
            publisher,
            settings,
        }
    }

    pub async fn place(&self, request: CheckoutRequest) -> ServiceResult<Order> {
        let customer_id = request.customer_id;
        if self.store.get_customer(customer_id).await?.is_none() {
            return Err(ServiceError::not_found(format!("customer {customer_id}")));
        }

        let (demands, consumed) = match request.items {
            Some(items) => (direct_demands(&items)?, Vec::new()),
            None => self.cart_demands(customer_id).await?,
        };
        let demands = coalesce(&demands)?;

        let ids: Vec<ProductId> = demands.iter().map(|(id, _)| *id).collect();
        let products = self.store.get_products(&ids).await?;
        let items = snapshot_items(&demands, &products)?;

        let payment_method = resolve_payment_method(
            request.payment_method.as_deref(),
            &self.settings.default_payment_method,
        );
        let (order, placed) = Order::place(PlaceOrder {
            order_id: OrderId::generate(),
            customer_id,
            payment_method,
            items,
            occurred_at: Utc::now(),
        })?;

        self.store.commit_order(&order, &consumed).await?;
        info!(
            order_id = %placed.order_id,
            customer_id = %customer_id,
            items = placed.items.len(),
            total = %placed.total_amount,
            from_cart = !consumed.is_empty(),
            "order placed"
        );

        self.publisher.publish(
            order.id().0,
            "sales.order",
            order.version(),
            StorefrontEvent::Order(OrderEvent::Placed(placed)),
        );
        Ok(order)
    }

    async fn cart_demands(
        &self,
        customer_id: CustomerId,
    ) -> ServiceResult<(Vec<(ProductId, Quantity)>, Vec<CartLineId>)> {
        let lines = self.store.list_lines(customer_id).await?;
        if lines.is_empty() {
            return Err(DomainError::validation("cart is empty").into());
        }
        Ok(lines.iter().map(|l| ((l.product_id, l.quantity), l.id)).unzip())
    }
}

fn direct_demands(items: &[CheckoutItem]) -> ServiceResult<Vec<(ProductId, Quantity)>> {
    if items.is_empty() {
        return Err(DomainError::validation("order must contain at least one item").into());
    }
    items
        .iter()
        .map(|item| -> ServiceResult<(ProductId, Quantity)> {
            Ok((item.product_id, Quantity::new(item.quantity)?))
        })
        .collect()
}
