use std::sync::Mutex;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use storefront_core::AggregateRoot;
use storefront_customers::{Customer, CustomerId};
use storefront_sales::{Order, OrderId, OrderStatus, OrderStatusChanged};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Receiver of finalized domain facts (order confirmation, status updates, welcome).
///
/// Implementations must not assume they can veto anything: by the time they are
/// called the data is committed.
pub trait NotificationSink: Send + Sync {
    fn notify_order_created(&self, order: &Order) -> Result<(), NotificationError>;

    fn notify_status_changed(&self, change: &OrderStatusChanged) -> Result<(), NotificationError>;

    fn notify_customer_registered(&self, customer: &Customer) -> Result<(), NotificationError>;
}

/// Default sink: writes each notification to the log.
#[derive(Debug, Clone)]
pub struct LoggingNotificationSink {
    from: String,
}

impl LoggingNotificationSink {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl NotificationSink for LoggingNotificationSink {
    fn notify_order_created(&self, order: &Order) -> Result<(), NotificationError> {
        info!(
            from = %self.from,
            order_id = %order.id(),
            customer_id = ?order.customer_id(),
            total_amount = %order.total_amount(),
            items = order.items().len(),
            "order confirmation sent"
        );
        Ok(())
    }

    fn notify_status_changed(&self, change: &OrderStatusChanged) -> Result<(), NotificationError> {
        info!(
            from = %self.from,
            order_id = %change.order_id,
            customer_id = %change.customer_id,
            status_from = %change.from,
            status_to = %change.to,
            "order status update sent"
        );
        Ok(())
    }

    fn notify_customer_registered(&self, customer: &Customer) -> Result<(), NotificationError> {
        info!(
            from = %self.from,
            customer_id = %customer.id,
            to = %customer.email,
            sms = customer.phone.as_deref().unwrap_or("-"),
            "welcome message sent"
        );
        Ok(())
    }
}

/// A notification recorded by [`InMemoryNotificationSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    OrderCreated {
        order_id: OrderId,
        total_amount: Decimal,
    },
    StatusChanged {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
    CustomerRegistered {
        customer_id: CustomerId,
        email: String,
        phone: Option<String>,
    },
}

/// Recording sink for tests/dev. Can be told to fail every delivery.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every delivery fails (nothing is recorded).
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, n: Notification) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Delivery("sink configured to fail".into()));
        }
        self.sent
            .lock()
            .map_err(|_| NotificationError::Delivery("sink lock poisoned".into()))?
            .push(n);
        Ok(())
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify_order_created(&self, order: &Order) -> Result<(), NotificationError> {
        self.record(Notification::OrderCreated {
            order_id: *order.id(),
            total_amount: order.total_amount(),
        })
    }

    fn notify_status_changed(&self, change: &OrderStatusChanged) -> Result<(), NotificationError> {
        self.record(Notification::StatusChanged {
            order_id: change.order_id,
            from: change.from,
            to: change.to,
        })
    }

    fn notify_customer_registered(&self, customer: &Customer) -> Result<(), NotificationError> {
        self.record(Notification::CustomerRegistered {
            customer_id: customer.id,
            email: customer.email.clone(),
            phone: customer.phone.clone(),
        })
    }
}
