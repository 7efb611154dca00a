//! Domain events and their in-process distribution.
//!
//! Aggregates emit typed events; application services wrap committed events in an
//! [`EventEnvelope`] and publish them on an [`EventBus`] so that side effects
//! (notifications) run outside the transaction that produced them.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::execute;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
