use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tripline_inventory::InventoryError;
use tripline_ticket::ReservationError;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus};

/// Booking store with source-state-guarded transitions. Every status
/// mutation goes through one of the methods here while the map's write
/// lock is held, so a transition only happens if the booking is still in
/// the expected source state — a sweeper and a user action racing on the
/// same booking cannot overwrite each other.
pub struct BookingManager {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl BookingManager {
    pub fn new() -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, booking: Booking) {
        self.bookings.write().await.insert(booking.id, booking);
    }

    pub async fn get(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .read()
            .await
            .get(&booking_id)
            .cloned()
            .ok_or(BookingError::NotFound(booking_id))
    }

    /// PENDING -> CONFIRMED.
    pub async fn confirm(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(booking_id, &[BookingStatus::Pending], BookingStatus::Confirmed)
            .await
    }

    /// PENDING|CONFIRMED -> CANCELLED.
    pub async fn cancel(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.transition(
            booking_id,
            &[BookingStatus::Pending, BookingStatus::Confirmed],
            BookingStatus::Cancelled,
        )
        .await
    }

    /// Timeout transition PENDING -> EXPIRED. Returns Ok(None) without
    /// touching the booking unless it is still PENDING and past its
    /// deadline; a booking the user confirmed or cancelled moments earlier
    /// is skipped, not overwritten.
    pub async fn expire_if_due(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        if booking.status != BookingStatus::Pending || !booking.is_past_deadline(now) {
            return Ok(None);
        }

        booking.update_status(BookingStatus::Expired);
        Ok(Some(booking.clone()))
    }

    /// Ids of PENDING bookings whose deadline passed before `now`.
    pub async fn pending_due(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.bookings
            .read()
            .await
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.is_past_deadline(now))
            .map(|b| b.id)
            .collect()
    }

    async fn transition(
        &self,
        booking_id: Uuid,
        allowed_from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        if !allowed_from.contains(&booking.status) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to,
            });
        }

        booking.update_status(to);
        Ok(booking.clone())
    }
}

impl Default for BookingManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid booking transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking {0} hold has lapsed")]
    HoldLapsed(Uuid),

    #[error("Seats unavailable: {}", .seats.join(", "))]
    SeatUnavailable { seats: Vec<String> },

    #[error("A booking needs at least one seat")]
    NoSeats,

    #[error("Seat {0} requested more than once")]
    DuplicateSeat(String),

    #[error("Payment failed: {0}")]
    PaymentFailure(String),

    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_booking(hold: Duration) -> Booking {
        Booking::new(Uuid::new_v4(), Uuid::new_v4(), "USD", hold)
    }

    #[tokio::test]
    async fn test_confirm_then_cancel_lifecycle() {
        let manager = BookingManager::new();
        let booking = pending_booking(Duration::minutes(15));
        let id = booking.id;
        manager.insert(booking).await;

        let confirmed = manager.confirm(id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        // Confirmed bookings can still be cancelled (refund path).
        let cancelled = manager.cancel(id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_confirm_requires_pending() {
        let manager = BookingManager::new();
        let booking = pending_booking(Duration::minutes(15));
        let id = booking.id;
        manager.insert(booking).await;

        manager.cancel(id).await.unwrap();
        let err = manager.confirm(id).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::Cancelled,
                to: BookingStatus::Confirmed
            }
        ));
    }

    #[tokio::test]
    async fn test_expire_if_due_skips_confirmed_booking() {
        let manager = BookingManager::new();
        let booking = pending_booking(Duration::seconds(-1));
        let id = booking.id;
        manager.insert(booking).await;

        manager.confirm(id).await.unwrap();

        // Sweeper sees an expired-looking booking that was just confirmed:
        // must leave it alone.
        let swept = manager.expire_if_due(id, Utc::now()).await.unwrap();
        assert!(swept.is_none());
        assert_eq!(manager.get(id).await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_expire_if_due_skips_booking_within_deadline() {
        let manager = BookingManager::new();
        let booking = pending_booking(Duration::minutes(15));
        let id = booking.id;
        manager.insert(booking).await;

        let swept = manager.expire_if_due(id, Utc::now()).await.unwrap();
        assert!(swept.is_none());
    }

    #[tokio::test]
    async fn test_pending_due_lists_only_lapsed_pending() {
        let manager = BookingManager::new();

        let due = pending_booking(Duration::seconds(-1));
        let due_id = due.id;
        manager.insert(due).await;

        let live = pending_booking(Duration::minutes(15));
        manager.insert(live).await;

        let terminal = pending_booking(Duration::seconds(-1));
        let terminal_id = terminal.id;
        manager.insert(terminal).await;
        manager.cancel(terminal_id).await.unwrap();

        let ids = manager.pending_due(Utc::now()).await;
        assert_eq!(ids, vec![due_id]);
    }

    #[tokio::test]
    async fn test_unknown_booking_is_not_found() {
        let manager = BookingManager::new();
        let err = manager.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
    }
}
