use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tripline_inventory::{Schedule, ScheduleAvailability};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/schedules", post(create_schedule))
        .route("/v1/schedules/{id}/availability", get(schedule_availability))
}

#[derive(Debug, Deserialize)]
struct CreateScheduleRequest {
    route_id: Uuid,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    total_seats: i32,
    base_price: i32,
    currency: Option<String>,
}

/// Intake from the route-planning feed. Everything except available_seats
/// is read-only from this service's perspective afterwards.
async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<Schedule>), ApiError> {
    if req.total_seats <= 0 {
        return Err(ApiError::Validation(
            "total_seats must be positive".to_string(),
        ));
    }
    if req.base_price < 0 {
        return Err(ApiError::Validation(
            "base_price must not be negative".to_string(),
        ));
    }
    if req.arrival_time <= req.departure_time {
        return Err(ApiError::Validation(
            "arrival_time must be after departure_time".to_string(),
        ));
    }

    let currency = req
        .currency
        .unwrap_or_else(|| state.business_rules.currency.clone());
    let schedule = Schedule::new(
        req.route_id,
        req.departure_time,
        req.arrival_time,
        req.total_seats,
        req.base_price,
        &currency,
    );
    let snapshot = schedule.clone();
    state.inventory.register(schedule).await;

    tracing::info!(schedule_id = %snapshot.id, seats = snapshot.total_seats, "schedule registered");
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn schedule_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleAvailability>, ApiError> {
    let snapshot = state.inventory.availability(id).await?;
    Ok(Json(snapshot))
}
