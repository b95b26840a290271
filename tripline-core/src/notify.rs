use async_trait::async_trait;
use tripline_shared::BookingEvent;

/// Downstream consumer of booking lifecycle events. Delivery channels and
/// message formatting live outside this engine.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &BookingEvent);
}

/// Default dispatcher: writes the event to the log and nothing else.
pub struct LogNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogNotificationDispatcher {
    async fn dispatch(&self, event: &BookingEvent) {
        tracing::info!(
            kind = event.kind(),
            booking_id = %event.booking_id(),
            "notification dispatched"
        );
    }
}
