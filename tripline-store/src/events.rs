use tokio::sync::broadcast;
use tracing::debug;
use tripline_shared::BookingEvent;

/// Fan-out channel for booking lifecycle events. Publishing is
/// fire-and-forget: an empty subscriber set is normal, not an error.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: BookingEvent) {
        let kind = event.kind();
        let booking_id = event.booking_id();
        match self.tx.send(event) {
            Ok(subscribers) => {
                debug!(kind, %booking_id, subscribers, "event published");
            }
            Err(_) => {
                debug!(kind, %booking_id, "event published with no subscribers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
