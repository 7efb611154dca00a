use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use storefront_core::AggregateId;
use storefront_customers::CustomerEvent;
use storefront_events::{Event, EventBus, EventEnvelope, InMemoryEventBus};
use storefront_sales::OrderEvent;

/// Every event the storefront publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorefrontEvent {
    Order(OrderEvent),
    Customer(CustomerEvent),
}

impl Event for StorefrontEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StorefrontEvent::Order(e) => e.event_type(),
            StorefrontEvent::Customer(e) => e.event_type(),
        }
    }

    fn schema_version(&self) -> u32 {
        match self {
            StorefrontEvent::Order(e) => e.schema_version(),
            StorefrontEvent::Customer(e) => e.schema_version(),
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StorefrontEvent::Order(e) => e.occurred_at(),
            StorefrontEvent::Customer(e) => e.occurred_at(),
        }
    }
}

pub type StorefrontEnvelope = EventEnvelope<StorefrontEvent>;
pub type StorefrontBus = InMemoryEventBus<StorefrontEnvelope>;

/// Post-commit publisher. Publishing is best effort.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    bus: Arc<StorefrontBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<StorefrontBus>) -> Self {
        Self { bus }
    }

    /// Wrap and publish. A failure is logged and swallowed; the caller's commit stands.
    pub fn publish(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &'static str,
        sequence_number: u64,
        event: StorefrontEvent,
    ) {
        let event_type = event.event_type();
        let envelope = EventEnvelope::wrap(aggregate_id, aggregate_type, sequence_number, event);
        if let Err(err) = self.bus.publish(envelope) {
            warn!(
                aggregate_id = %aggregate_id,
                event_type,
                error = ?err,
                "failed to publish event; notification dropped"
            );
        }
    }
}
