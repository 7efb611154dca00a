//! Sales domain module: carts, orders and the pure parts of checkout.
//!
//! Business rules only (no IO, no HTTP, no storage). Orders are aggregates with
//! `handle`/`apply`; carts are plain in-memory aggregates that the stores rebuild
//! from their lines.

pub mod actions;
pub mod cart;
pub mod checkout;
pub mod order;

pub use actions::{CartAction, OrderAction};
pub use cart::{Cart, CartLine, CartLineId, CartSummary, CartSummaryLine};
pub use checkout::{coalesce, resolve_payment_method, snapshot_items};
pub use order::{
    ChangeStatus, Order, OrderCommand, OrderEvent, OrderId, OrderItem, OrderPlaced, OrderSnapshot,
    OrderStatus, OrderStatusChanged, PlaceOrder, order_total,
};
