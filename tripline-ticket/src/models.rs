use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tripline_inventory::SeatType;
use uuid::Uuid;

/// Ticket status. AVAILABLE is implicit — a seat without a ticket row in
/// {RESERVED, CONFIRMED} is free.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Reserved,
    Confirmed,
    Expired,
    Cancelled,
}

impl TicketStatus {
    /// Statuses that occupy the (schedule, seat) slot.
    pub fn occupies_seat(&self) -> bool {
        matches!(self, TicketStatus::Reserved | TicketStatus::Confirmed)
    }
}

/// A single seat sold (or held) on a schedule. Created on reservation,
/// never hard-deleted: terminal tickets are retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub seat_number: String,
    pub seat_type: SeatType,
    pub price: i32,
    pub status: TicketStatus,
    pub reserved_until: Option<DateTime<Utc>>,
    pub booking_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub(crate) fn reserve(
        schedule_id: Uuid,
        seat_number: &str,
        seat_type: SeatType,
        price: i32,
        reserved_until: DateTime<Utc>,
        booking_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            schedule_id,
            seat_number: seat_number.to_string(),
            seat_type,
            price,
            status: TicketStatus::Reserved,
            reserved_until: Some(reserved_until),
            booking_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn hold_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.reserved_until, Some(deadline) if deadline < now)
    }

    pub(crate) fn set_status(&mut self, status: TicketStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
