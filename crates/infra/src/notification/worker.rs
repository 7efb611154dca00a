use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use storefront_customers::{Customer, CustomerEvent};
use storefront_events::{EventBus, Subscription};
use storefront_sales::{Order, OrderEvent};

use super::event::{StorefrontBus, StorefrontEnvelope, StorefrontEvent};
use super::sink::{NotificationError, NotificationSink};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Notification worker loop.
///
/// - Subscribes to the storefront bus at spawn time
/// - Routes each event to the matching sink method
/// - Logs sink failures and keeps going
/// - Supports graceful shutdown
#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    pub fn spawn(
        bus: &Arc<StorefrontBus>,
        sink: Arc<dyn NotificationSink>,
    ) -> std::io::Result<WorkerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<StorefrontEnvelope> = bus.subscribe();

        let join = thread::Builder::new()
            .name("notification-worker".to_string())
            .spawn(move || worker_loop(sub, shutdown_rx, sink.as_ref()))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop(
    sub: Subscription<StorefrontEnvelope>,
    shutdown_rx: mpsc::Receiver<()>,
    sink: &dyn NotificationSink,
) {
    let tick = Duration::from_millis(250);

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                let event_type = envelope.event_type().to_string();
                if let Err(err) = deliver(sink, envelope.into_payload()) {
                    warn!(event_type = %event_type, error = %err, "notification sink failed");
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("notification worker stopped");
}

fn deliver(sink: &dyn NotificationSink, event: StorefrontEvent) -> Result<(), NotificationError> {
    match event {
        StorefrontEvent::Order(OrderEvent::Placed(placed)) => {
            sink.notify_order_created(&Order::from_placed(&placed))
        }
        StorefrontEvent::Order(OrderEvent::StatusChanged(change)) => {
            sink.notify_status_changed(&change)
        }
        StorefrontEvent::Customer(CustomerEvent::Registered(e)) => {
            sink.notify_customer_registered(&Customer {
                id: e.customer_id,
                name: e.name,
                email: e.email,
                phone: e.phone,
                created_at: e.occurred_at,
            })
        }
    }
}
