use crate::config::NotificationBusConfig;
use crate::messaging::event::EventMessage;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::broadcast;

/// In-process fan-out of ledger events to subscribed dashboard sessions.
///
/// Each subscriber gets a bounded buffer; when a slow or disconnected
/// dashboard falls behind, its oldest events are dropped rather than
/// blocking `publish` (the dashboard can always re-fetch state). Delivery
/// is at-least-once and snapshots are idempotent by record id + status.
pub struct NotificationBus {
    sender: broadcast::Sender<EventMessage>,
}

impl NotificationBus {
    /// Create a new bus with the given per-subscriber buffer capacity
    pub fn new(buffer_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all events. The subscription never terminates on its
    /// own; dropping the handle unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an event to all current subscribers. Fire-and-forget: never
    /// blocks, and a send with no subscribers is not an error. Returns the
    /// number of subscribers the event was queued for.
    pub fn publish(&self, message: EventMessage) -> usize {
        let routing_key = message.routing_key();
        match self.sender.send(message) {
            Ok(receivers) => {
                debug!("Published event {} to {} subscribers", routing_key, receivers);
                receivers
            }
            Err(_) => {
                // No live subscribers; the ledgers are the source of truth,
                // so nothing is lost.
                debug!("Published event {} with no subscribers", routing_key);
                0
            }
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live event subscription held by one dashboard session
pub struct Subscription {
    receiver: broadcast::Receiver<EventMessage>,
}

impl Subscription {
    /// Receive the next event. Skips over dropped events when this
    /// subscriber has lagged, and returns None once the bus is gone.
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(dropped)) => {
                    warn!("Subscriber lagged, dropped {} oldest events", dropped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Create a notification bus from configuration
pub fn create_notification_bus(config: &NotificationBusConfig) -> Arc<NotificationBus> {
    Arc::new(NotificationBus::new(config.buffer_capacity))
}
