use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tripline_inventory::{InventoryError, SeatInventory, SeatType};
use uuid::Uuid;

use crate::models::{Ticket, TicketStatus};

#[derive(Default)]
struct TicketTable {
    tickets: HashMap<Uuid, Ticket>,
    /// One entry per seat currently held or sold. Absence of the key is
    /// what "AVAILABLE" means; dropping the entry on expire/cancel frees
    /// the seat for the next reservation.
    active_seats: HashMap<(Uuid, String), Uuid>,
}

/// Per-ticket reservation state. A single table lock covers the ticket map
/// and the active-seat index, so two concurrent reserve calls for the same
/// seat serialize here and at most one can win. Lock order is fixed: table
/// lock first, then the per-schedule inventory lock.
pub struct ReservationManager {
    inventory: Arc<SeatInventory>,
    table: Mutex<TicketTable>,
}

impl ReservationManager {
    pub fn new(inventory: Arc<SeatInventory>) -> Self {
        Self {
            inventory,
            table: Mutex::new(TicketTable::default()),
        }
    }

    pub fn inventory(&self) -> &Arc<SeatInventory> {
        &self.inventory
    }

    /// Hold a seat for `hold` time. Fails with `SeatUnavailable` when the
    /// seat is already held/sold or the schedule has no capacity left.
    pub async fn reserve(
        &self,
        schedule_id: Uuid,
        seat_number: &str,
        seat_type: SeatType,
        price: i32,
        hold: Duration,
        booking_id: Option<Uuid>,
    ) -> Result<Ticket, ReservationError> {
        self.reserve_until(
            schedule_id,
            seat_number,
            seat_type,
            price,
            Utc::now() + hold,
            booking_id,
        )
        .await
    }

    /// Hold a seat until an absolute deadline. Bookings use this so every
    /// ticket in a booking shares the booking's own deadline.
    pub async fn reserve_until(
        &self,
        schedule_id: Uuid,
        seat_number: &str,
        seat_type: SeatType,
        price: i32,
        reserved_until: DateTime<Utc>,
        booking_id: Option<Uuid>,
    ) -> Result<Ticket, ReservationError> {
        let mut table = self.table.lock().await;

        let key = (schedule_id, seat_number.to_string());
        if table.active_seats.contains_key(&key) {
            return Err(ReservationError::SeatUnavailable {
                schedule_id,
                seat_number: seat_number.to_string(),
            });
        }

        match self.inventory.try_reserve_seats(schedule_id, 1).await {
            Ok(()) => {}
            Err(InventoryError::InsufficientCapacity { .. }) => {
                return Err(ReservationError::SeatUnavailable {
                    schedule_id,
                    seat_number: seat_number.to_string(),
                });
            }
            Err(e) => return Err(ReservationError::Inventory(e)),
        }

        let ticket = Ticket::reserve(
            schedule_id,
            seat_number,
            seat_type,
            price,
            reserved_until,
            booking_id,
        );
        table.active_seats.insert(key, ticket.id);
        table.tickets.insert(ticket.id, ticket.clone());

        tracing::debug!(
            ticket_id = %ticket.id,
            schedule_id = %schedule_id,
            seat_number,
            "seat reserved"
        );
        Ok(ticket)
    }

    pub async fn get(&self, ticket_id: Uuid) -> Result<Ticket, ReservationError> {
        let table = self.table.lock().await;
        table
            .tickets
            .get(&ticket_id)
            .cloned()
            .ok_or(ReservationError::NotFound(ticket_id))
    }

    /// Snapshot of the given tickets, in the order requested. Unknown ids
    /// are skipped.
    pub async fn get_many(&self, ticket_ids: &[Uuid]) -> Vec<Ticket> {
        let table = self.table.lock().await;
        ticket_ids
            .iter()
            .filter_map(|id| table.tickets.get(id).cloned())
            .collect()
    }

    /// RESERVED -> CONFIRMED. Fails when the ticket is in any other state
    /// or its hold deadline has already passed. Seats stay deducted.
    pub async fn confirm(&self, ticket_id: Uuid) -> Result<Ticket, ReservationError> {
        self.confirm_inner(ticket_id, true).await
    }

    /// RESERVED -> CONFIRMED on the booking settlement path. The booking's
    /// own deadline guard has already run, so a per-ticket deadline that
    /// lapsed while the charge was in flight does not block settlement.
    pub async fn confirm_for_booking(&self, ticket_id: Uuid) -> Result<Ticket, ReservationError> {
        self.confirm_inner(ticket_id, false).await
    }

    async fn confirm_inner(
        &self,
        ticket_id: Uuid,
        enforce_deadline: bool,
    ) -> Result<Ticket, ReservationError> {
        let now = Utc::now();
        let mut table = self.table.lock().await;
        let ticket = table
            .tickets
            .get_mut(&ticket_id)
            .ok_or(ReservationError::NotFound(ticket_id))?;

        if ticket.status != TicketStatus::Reserved {
            return Err(ReservationError::InvalidState {
                from: ticket.status,
                to: TicketStatus::Confirmed,
            });
        }
        if enforce_deadline && ticket.hold_expired(now) {
            return Err(ReservationError::HoldLapsed(ticket_id));
        }

        ticket.set_status(TicketStatus::Confirmed);
        self.inventory.confirm_seats(ticket.schedule_id, 1);
        Ok(ticket.clone())
    }

    /// Timeout-driven RESERVED -> EXPIRED. Idempotent: returns Ok(None)
    /// without touching anything unless the ticket is still RESERVED and
    /// its deadline passed before `now` (the sweeper's clock).
    pub async fn expire(
        &self,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Ticket>, ReservationError> {
        let mut table = self.table.lock().await;
        let ticket = table
            .tickets
            .get(&ticket_id)
            .ok_or(ReservationError::NotFound(ticket_id))?;

        if ticket.status != TicketStatus::Reserved || !ticket.hold_expired(now) {
            return Ok(None);
        }

        let schedule_id = ticket.schedule_id;
        self.inventory.release_seats(schedule_id, 1).await?;

        let ticket = table
            .tickets
            .get_mut(&ticket_id)
            .ok_or(ReservationError::NotFound(ticket_id))?;
        ticket.set_status(TicketStatus::Expired);
        let key = (schedule_id, ticket.seat_number.clone());
        let snapshot = ticket.clone();
        table.active_seats.remove(&key);

        tracing::debug!(ticket_id = %ticket_id, "reserved ticket expired");
        Ok(Some(snapshot))
    }

    /// Explicit RESERVED|CONFIRMED -> CANCELLED. Releases the seat back to
    /// inventory in both cases.
    pub async fn cancel(&self, ticket_id: Uuid) -> Result<Ticket, ReservationError> {
        let mut table = self.table.lock().await;
        let ticket = table
            .tickets
            .get(&ticket_id)
            .ok_or(ReservationError::NotFound(ticket_id))?;

        if !ticket.status.occupies_seat() {
            return Err(ReservationError::InvalidState {
                from: ticket.status,
                to: TicketStatus::Cancelled,
            });
        }

        let schedule_id = ticket.schedule_id;
        self.inventory.release_seats(schedule_id, 1).await?;

        let ticket = table
            .tickets
            .get_mut(&ticket_id)
            .ok_or(ReservationError::NotFound(ticket_id))?;
        ticket.set_status(TicketStatus::Cancelled);
        let key = (schedule_id, ticket.seat_number.clone());
        let snapshot = ticket.clone();
        table.active_seats.remove(&key);

        Ok(snapshot)
    }

    /// Ids of standalone RESERVED holds whose deadline passed before
    /// `now`. Input for the sweeper; the guarded `expire` re-checks each
    /// one. Booking-owned tickets are excluded — those expire through
    /// their booking's cascade, never out from under it.
    pub async fn reserved_due(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let table = self.table.lock().await;
        table
            .tickets
            .values()
            .filter(|t| {
                t.status == TicketStatus::Reserved && t.booking_id.is_none() && t.hold_expired(now)
            })
            .map(|t| t.id)
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Seat {seat_number} on schedule {schedule_id} is unavailable")]
    SeatUnavailable {
        schedule_id: Uuid,
        seat_number: String,
    },

    #[error("Ticket not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid ticket transition from {from:?} to {to:?}")]
    InvalidState {
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Hold on ticket {0} has already lapsed")]
    HoldLapsed(Uuid),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
