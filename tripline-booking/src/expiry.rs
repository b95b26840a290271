use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::orchestrator::BookingOrchestrator;

/// Outcome of one sweeper pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepReport {
    pub bookings_expired: usize,
    pub tickets_expired: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.bookings_expired == 0 && self.tickets_expired == 0
    }
}

impl BookingOrchestrator {
    /// One pass over timed-out holds: expires lapsed PENDING bookings
    /// (cascading to their tickets), then any orphaned seat holds made
    /// outside a booking. A failure on one entity is logged and the sweep
    /// moves on; entities that changed state since the scan are skipped by
    /// the transition guards, never overwritten.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for booking_id in self.pending_due(now).await {
            match self.expire_booking(booking_id, now).await {
                Ok(Some(_)) => report.bookings_expired += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        booking_id = %booking_id,
                        error = %e,
                        "sweep failed to expire booking"
                    );
                }
            }
        }

        for ticket_id in self.reservations().reserved_due(now).await {
            match self.reservations().expire(ticket_id, now).await {
                Ok(Some(_)) => report.tickets_expired += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        ticket_id = %ticket_id,
                        error = %e,
                        "sweep failed to expire ticket"
                    );
                }
            }
        }

        report
    }
}
