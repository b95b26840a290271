use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat class on a vehicle. Identifiers like "12A" stay opaque strings;
/// the type only drives pricing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatType {
    Economy,
    Business,
    BerthLower,
    BerthUpper,
}

/// A scheduled departure on a route. Provided by route planning; this
/// engine owns only `available_seats`, and mutates it exclusively through
/// `SeatInventory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub route_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub base_price: i32,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(
        route_id: Uuid,
        departure_time: DateTime<Utc>,
        arrival_time: DateTime<Utc>,
        total_seats: i32,
        base_price: i32,
        currency: &str,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            route_id,
            departure_time,
            arrival_time,
            total_seats,
            available_seats: total_seats,
            base_price,
            currency: currency.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Point-in-time availability snapshot returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleAvailability {
    pub schedule_id: Uuid,
    pub total_seats: i32,
    pub available_seats: i32,
    pub is_active: bool,
    pub departure_time: DateTime<Utc>,
}

impl From<&Schedule> for ScheduleAvailability {
    fn from(s: &Schedule) -> Self {
        Self {
            schedule_id: s.id,
            total_seats: s.total_seats,
            available_seats: s.available_seats,
            is_active: s.is_active,
            departure_time: s.departure_time,
        }
    }
}
