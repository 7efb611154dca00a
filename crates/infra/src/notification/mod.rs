//! Transactional notifications.
//!
//! Services publish committed events on the in-process bus; the
//! [`NotificationWorker`] consumes them on its own thread and calls a
//! [`NotificationSink`]. Nothing here can undo a commit: sink and publish
//! failures are logged and dropped.

pub mod event;
pub mod sink;
pub mod worker;

pub use event::{EventPublisher, StorefrontBus, StorefrontEnvelope, StorefrontEvent};
pub use sink::{
    InMemoryNotificationSink, LoggingNotificationSink, Notification, NotificationError,
    NotificationSink,
};
pub use worker::{NotificationWorker, WorkerHandle};
