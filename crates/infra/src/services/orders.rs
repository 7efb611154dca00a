use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use storefront_core::{AggregateRoot, ExpectedVersion};
use storefront_customers::CustomerId;
use storefront_sales::{Order, OrderEvent, OrderId, OrderStatus};

use super::{ServiceError, ServiceResult};
use crate::notification::{EventPublisher, StorefrontEvent};
use crate::store::Store;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    publisher: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher) -> Self {
        Self { store, publisher }
    }

    pub async fn get(&self, id: OrderId) -> ServiceResult<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {id}")))
    }

    /// Newest first, optionally for one customer.
    pub async fn list(&self, customer_id: Option<CustomerId>) -> ServiceResult<Vec<Order>> {
        Ok(self.store.list_orders(customer_id).await?)
    }

    /// Move an order through the status machine.
    ///
    /// The save is conditional on the version that was read, so two racing
    /// transitions cannot both win.
    pub async fn transition(&self, id: OrderId, to: OrderStatus) -> ServiceResult<Order> {
        let mut order = self.get(id).await?;
        let expected = ExpectedVersion::Exact(order.version());
        let changed = order.transition(to, Utc::now())?;
        self.store.save_status(&order, expected).await?;
        info!(
            order_id = %id,
            from = changed.from.as_str(),
            to = changed.to.as_str(),
            "order status changed"
        );

        self.publisher.publish(
            id.0,
            "sales.order",
            order.version(),
            StorefrontEvent::Order(OrderEvent::StatusChanged(changed)),
        );
        Ok(order)
    }

    pub async fn confirm(&self, id: OrderId) -> ServiceResult<Order> {
        self.transition(id, OrderStatus::Confirmed).await
    }

    pub async fn ship(&self, id: OrderId) -> ServiceResult<Order> {
        self.transition(id, OrderStatus::Shipped).await
    }

    pub async fn deliver(&self, id: OrderId) -> ServiceResult<Order> {
        self.transition(id, OrderStatus::Delivered).await
    }

    pub async fn cancel(&self, id: OrderId) -> ServiceResult<Order> {
        self.transition(id, OrderStatus::Cancelled).await
    }
}
