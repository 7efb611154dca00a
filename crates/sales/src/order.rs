use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storefront_catalog::ProductId;
use storefront_core::{Aggregate, AggregateRoot, DomainError, DomainResult, Quantity, id_newtype};
use storefront_customers::CustomerId;
use storefront_events::{Event, execute};

id_newtype!(
    /// Order identifier.
    OrderId
);

/// Order status lifecycle.
///
/// `Pending -> Confirmed -> Shipped -> Delivered`, with `Cancelled` reachable
/// from `Pending` or `Confirmed` only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Order item: a frozen copy of the product name and price at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    pub unit_price: Decimal,
}

impl OrderItem {
    /// Fails with a validation error instead of overflowing.
    pub fn subtotal(&self) -> DomainResult<Decimal> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity.get()))
            .ok_or_else(|| {
                DomainError::validation(format!("subtotal of line {} is too large", self.line_no))
            })
    }
}

/// Sum of item subtotals. The only place an order total is computed.
pub fn order_total(items: &[OrderItem]) -> DomainResult<Decimal> {
    items.iter().try_fold(Decimal::ZERO, |total, item| {
        total
            .checked_add(item.subtotal()?)
            .ok_or_else(|| DomainError::validation("order total is too large"))
    })
}

/// Aggregate root: Order.
///
/// Items, total and payment label are fixed by the `Placed` event; afterwards
/// only the status (and version) move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    customer_id: Option<CustomerId>,
    status: OrderStatus,
    payment_method: String,
    items: Vec<OrderItem>,
    total_amount: Decimal,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
}

/// Stored state of an order, used by stores to rebuild the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub payment_method: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            customer_id: None,
            status: OrderStatus::Pending,
            payment_method: String::new(),
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            created_at: None,
            updated_at: None,
            version: 0,
        }
    }

    pub fn from_snapshot(s: OrderSnapshot) -> Self {
        Self {
            id: s.id,
            customer_id: Some(s.customer_id),
            status: s.status,
            payment_method: s.payment_method,
            items: s.items,
            total_amount: s.total_amount,
            created_at: Some(s.created_at),
            updated_at: Some(s.updated_at),
            version: s.version,
        }
    }

    /// Run `PlaceOrder` against a fresh aggregate.
    pub fn place(cmd: PlaceOrder) -> Result<(Self, OrderPlaced), DomainError> {
        let mut order = Order::empty(cmd.order_id);
        let events = execute(&mut order, &OrderCommand::Place(cmd))?;
        match events.into_iter().next() {
            Some(OrderEvent::Placed(placed)) => Ok((order, placed)),
            _ => Err(DomainError::invariant("placing an order must emit OrderPlaced")),
        }
    }

    /// Rebuild a freshly placed order from its `OrderPlaced` event.
    pub fn from_placed(placed: &OrderPlaced) -> Self {
        let mut order = Order::empty(placed.order_id);
        order.apply(&OrderEvent::Placed(placed.clone()));
        order
    }

    /// Move to `to` if the status machine allows it.
    pub fn transition(
        &mut self,
        to: OrderStatus,
        occurred_at: DateTime<Utc>,
    ) -> Result<OrderStatusChanged, DomainError> {
        let cmd = ChangeStatus {
            order_id: self.id,
            to,
            occurred_at,
        };
        let events = execute(self, &OrderCommand::ChangeStatus(cmd))?;
        match events.into_iter().next() {
            Some(OrderEvent::StatusChanged(changed)) => Ok(changed),
            _ => Err(DomainError::invariant("status change must emit OrderStatusChanged")),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.version > 0
    }

    /// `None` only before the order has been placed.
    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub payment_method: String,
    pub items: Vec<OrderItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    Place(PlaceOrder),
    ChangeStatus(ChangeStatus),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub payment_method: String,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    Placed(OrderPlaced),
    StatusChanged(OrderStatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "sales.order.placed",
            OrderEvent::StatusChanged(_) => "sales.order.status_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Placed(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::Placed(e) => {
                self.id = e.order_id;
                self.customer_id = Some(e.customer_id);
                self.status = OrderStatus::Pending;
                self.payment_method = e.payment_method.clone();
                self.items = e.items.clone();
                self.total_amount = e.total_amount;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.updated_at = Some(e.occurred_at);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::Place(cmd) => self.handle_place(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already exists"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        if cmd.items.iter().any(|i| i.unit_price < Decimal::ZERO) {
            return Err(DomainError::validation("unit_price cannot be negative"));
        }
        let payment_method = cmd.payment_method.trim();
        if payment_method.is_empty() {
            return Err(DomainError::validation("payment method cannot be empty"));
        }

        let total_amount = order_total(&cmd.items)?;

        Ok(vec![OrderEvent::Placed(OrderPlaced {
            order_id: cmd.order_id,
            customer_id: cmd.customer_id,
            payment_method: payment_method.to_string(),
            items: cmd.items.clone(),
            total_amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        let Some(customer_id) = self.customer_id.filter(|_| self.is_placed()) else {
            return Err(DomainError::not_found(format!("order {}", cmd.order_id)));
        };
        self.ensure_order_id(cmd.order_id)?;

        if !self.status.can_transition_to(cmd.to) {
            return Err(DomainError::invariant(format!(
                "cannot move order from {} to {}",
                self.status, cmd.to
            )));
        }

        Ok(vec![OrderEvent::StatusChanged(OrderStatusChanged {
            order_id: cmd.order_id,
            customer_id,
            from: self.status,
            to: cmd.to,
            occurred_at: cmd.occurred_at,
        })])
    }
}
