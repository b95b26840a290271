use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seat_count: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub total_amount: i32,
    pub transaction_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seats_released: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingExpiredEvent {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    pub seats_released: i32,
    pub timestamp: i64,
}

/// Envelope published on the event bus and relayed to SSE subscribers.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    BookingCreated(BookingCreatedEvent),
    BookingConfirmed(BookingConfirmedEvent),
    BookingCancelled(BookingCancelledEvent),
    BookingExpired(BookingExpiredEvent),
}

impl BookingEvent {
    pub fn booking_id(&self) -> Uuid {
        match self {
            BookingEvent::BookingCreated(e) => e.booking_id,
            BookingEvent::BookingConfirmed(e) => e.booking_id,
            BookingEvent::BookingCancelled(e) => e.booking_id,
            BookingEvent::BookingExpired(e) => e.booking_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BookingEvent::BookingCreated(_) => "booking_created",
            BookingEvent::BookingConfirmed(_) => "booking_confirmed",
            BookingEvent::BookingCancelled(_) => "booking_cancelled",
            BookingEvent::BookingExpired(_) => "booking_expired",
        }
    }
}
