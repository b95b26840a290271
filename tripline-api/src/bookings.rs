use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tripline_booking::{Booking, Passenger, SeatSelection};
use tripline_core::Payment;
use tripline_shared::MaskedEmail;
use tripline_ticket::Ticket;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    user_id: Uuid,
    schedule_id: Uuid,
    seats: Vec<SeatSelection>,
    #[serde(default)]
    passengers: Vec<Passenger>,
    contact_email: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking: Booking,
    tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize)]
struct ConfirmBookingResponse {
    booking: Booking,
    tickets: Vec<Ticket>,
    payment: Option<Payment>,
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let booking = state
        .orchestrator
        .create_booking(
            req.user_id,
            req.schedule_id,
            &req.seats,
            req.passengers,
            req.contact_email.map(MaskedEmail::new),
        )
        .await?;

    let tickets = state
        .orchestrator
        .reservations()
        .get_many(&booking.ticket_ids)
        .await;

    Ok((StatusCode::CREATED, Json(BookingResponse { booking, tickets })))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let (booking, tickets) = state.orchestrator.get_booking(id).await?;
    Ok(Json(BookingResponse { booking, tickets }))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmBookingResponse>, ApiError> {
    let booking = state.orchestrator.confirm_booking(id).await?;
    let tickets = state
        .orchestrator
        .reservations()
        .get_many(&booking.ticket_ids)
        .await;
    let payment = state.orchestrator.payment_for(id).await;

    Ok(Json(ConfirmBookingResponse {
        booking,
        tickets,
        payment,
    }))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state.orchestrator.cancel_booking(id).await?;
    let tickets = state
        .orchestrator
        .reservations()
        .get_many(&booking.ticket_ids)
        .await;
    Ok(Json(BookingResponse { booking, tickets }))
}
