use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tripline_inventory::SeatType;
use tripline_shared::MaskedEmail;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

/// One requested seat in a booking attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatSelection {
    pub seat_number: String,
    pub seat_type: SeatType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passenger {
    pub first_name: String,
    pub last_name: String,
    pub seat_number: String,
}

/// A customer's purchase-in-progress. Owns its tickets: cancellation and
/// expiry cascade to every referenced ticket. Terminal bookings are kept
/// for audit, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub booking_reference: String,
    pub user_id: Uuid,
    pub schedule_id: Uuid,
    /// Ticket ids in the order the seats were requested.
    pub ticket_ids: Vec<Uuid>,
    pub passengers: Vec<Passenger>,
    pub contact_email: Option<MaskedEmail>,
    pub total_amount: i32,
    pub currency: String,
    pub status: BookingStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(user_id: Uuid, schedule_id: Uuid, currency: &str, hold: Duration) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4();
        Self {
            id,
            booking_reference: reference_from(id),
            user_id,
            schedule_id,
            ticket_ids: Vec::new(),
            passengers: Vec::new(),
            contact_email: None,
            total_amount: 0,
            currency: currency.to_string(),
            status: BookingStatus::Pending,
            expires_at: now + hold,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a reserved ticket on this booking.
    pub fn attach_ticket(&mut self, ticket_id: Uuid, price: i32) {
        self.ticket_ids.push(ticket_id);
        self.total_amount += price;
        self.updated_at = Utc::now();
    }

    pub fn update_status(&mut self, status: BookingStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

fn reference_from(id: Uuid) -> String {
    format!("TL-{}", &id.simple().to_string()[..8].to_uppercase())
}
