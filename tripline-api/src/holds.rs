use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Duration;
use serde::Deserialize;
use tripline_inventory::SeatType;
use tripline_ticket::Ticket;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/holds/seat", post(create_seat_hold))
}

#[derive(Debug, Deserialize)]
struct SeatHoldRequest {
    schedule_id: Uuid,
    seat_number: String,
    seat_type: SeatType,
}

/// Short-lived seat hold outside of a booking, e.g. while a customer is
/// still filling in passenger details. The sweeper reclaims it when the
/// configured seat hold lapses.
async fn create_seat_hold(
    State(state): State<AppState>,
    Json(req): Json<SeatHoldRequest>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let schedule = state.inventory.get(req.schedule_id).await?;
    let price = state
        .pricing
        .seat_price(schedule.base_price, req.seat_type);
    let hold = Duration::seconds(state.business_rules.seat_hold_seconds as i64);

    let ticket = state
        .orchestrator
        .reservations()
        .reserve(
            req.schedule_id,
            &req.seat_number,
            req.seat_type,
            price,
            hold,
            None,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ticket)))
}
