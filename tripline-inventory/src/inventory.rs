use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::schedule::{Schedule, ScheduleAvailability};

/// Shared seat-counter store. `available_seats` is the only cross-ticket
/// shared counter in the system, so every mutation goes through the atomic
/// reserve/release operations here — never through direct field writes.
///
/// Each schedule sits behind its own mutex; the outer map lock is held only
/// long enough to clone the entry handle, so contention on one busy
/// departure does not serialize the rest.
pub struct SeatInventory {
    schedules: RwLock<HashMap<Uuid, Arc<Mutex<Schedule>>>>,
}

impl SeatInventory {
    pub fn new() -> Self {
        Self {
            schedules: RwLock::new(HashMap::new()),
        }
    }

    /// Register a schedule coming from route planning.
    pub async fn register(&self, schedule: Schedule) -> Uuid {
        let id = schedule.id;
        self.schedules
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(schedule)));
        id
    }

    async fn entry(&self, schedule_id: Uuid) -> Result<Arc<Mutex<Schedule>>, InventoryError> {
        self.schedules
            .read()
            .await
            .get(&schedule_id)
            .cloned()
            .ok_or(InventoryError::NotFound(schedule_id))
    }

    /// Snapshot of the full schedule record.
    pub async fn get(&self, schedule_id: Uuid) -> Result<Schedule, InventoryError> {
        let entry = self.entry(schedule_id).await?;
        let schedule = entry.lock().await;
        Ok(schedule.clone())
    }

    pub async fn availability(
        &self,
        schedule_id: Uuid,
    ) -> Result<ScheduleAvailability, InventoryError> {
        let entry = self.entry(schedule_id).await?;
        let schedule = entry.lock().await;
        Ok(ScheduleAvailability::from(&*schedule))
    }

    /// Atomically deduct `count` seats. No partial allocation: either all
    /// `count` seats are deducted or the counter is untouched.
    pub async fn try_reserve_seats(
        &self,
        schedule_id: Uuid,
        count: i32,
    ) -> Result<(), InventoryError> {
        debug_assert!(count > 0);
        let entry = self.entry(schedule_id).await?;
        let mut schedule = entry.lock().await;

        if !schedule.is_active {
            return Err(InventoryError::Inactive(schedule_id));
        }
        if schedule.available_seats < count {
            return Err(InventoryError::InsufficientCapacity {
                requested: count,
                available: schedule.available_seats,
            });
        }

        schedule.available_seats -= count;
        schedule.updated_at = Utc::now();
        Ok(())
    }

    /// Return `count` seats to the pool (hold expired or cancelled).
    pub async fn release_seats(
        &self,
        schedule_id: Uuid,
        count: i32,
    ) -> Result<(), InventoryError> {
        debug_assert!(count > 0);
        let entry = self.entry(schedule_id).await?;
        let mut schedule = entry.lock().await;

        if schedule.available_seats + count > schedule.total_seats {
            // Counter corruption: more seats released than were ever
            // deducted. Never a normal path.
            tracing::error!(
                schedule_id = %schedule_id,
                available = schedule.available_seats,
                total = schedule.total_seats,
                count,
                "seat release would exceed total capacity"
            );
            return Err(InventoryError::CapacityExceeded {
                schedule_id,
                available: schedule.available_seats,
                total: schedule.total_seats,
            });
        }

        schedule.available_seats += count;
        schedule.updated_at = Utc::now();
        Ok(())
    }

    /// Confirmation keeps seats deducted; the counter is untouched.
    pub fn confirm_seats(&self, _schedule_id: Uuid, _count: i32) {}
}

impl Default for SeatInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Schedule not found: {0}")]
    NotFound(Uuid),

    #[error("Schedule not open for sale: {0}")]
    Inactive(Uuid),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i32 },

    #[error("Seat counter exceeded capacity on schedule {schedule_id}: {available}/{total}")]
    CapacityExceeded {
        schedule_id: Uuid,
        available: i32,
        total: i32,
    },
}
