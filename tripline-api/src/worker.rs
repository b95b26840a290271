use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;
use tripline_booking::BookingOrchestrator;

/// Periodic expiry sweeper. The sole authority for timeout-driven
/// transitions: each tick releases lapsed holds back to inventory. On
/// shutdown the in-flight sweep finishes before the task exits, so no
/// entity is left mid-transition.
pub async fn start_expiry_sweeper(
    orchestrator: Arc<BookingOrchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Expiry sweeper started, sweeping every {:?}", period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = orchestrator.sweep(Utc::now()).await;
                if !report.is_empty() {
                    info!(
                        bookings_expired = report.bookings_expired,
                        tickets_expired = report.tickets_expired,
                        "sweep released timed-out holds"
                    );
                }
            }
            _ = shutdown.changed() => {
                info!("Expiry sweeper stopping");
                break;
            }
        }
    }
}
