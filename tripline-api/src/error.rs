use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tripline_booking::BookingError;
use tripline_inventory::InventoryError;
use tripline_ticket::ReservationError;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    /// 409 carrying the seat numbers the caller has to re-pick.
    SeatUnavailable(Vec<String>),
    PaymentRequired(String),
    Internal(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::SeatUnavailable(seats) => (
                StatusCode::CONFLICT,
                json!({ "error": "Requested seats are unavailable", "seats": seats }),
            ),
            ApiError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, json!({ "error": msg })),
            ApiError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            ApiError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(id) => Self::NotFound(format!("Booking not found: {id}")),
            e @ (BookingError::InvalidTransition { .. } | BookingError::HoldLapsed(_)) => {
                Self::Conflict(e.to_string())
            }
            BookingError::SeatUnavailable { seats } => Self::SeatUnavailable(seats),
            e @ (BookingError::NoSeats | BookingError::DuplicateSeat(_)) => {
                Self::Validation(e.to_string())
            }
            e @ BookingError::PaymentFailure(_) => Self::PaymentRequired(e.to_string()),
            BookingError::Reservation(inner) => inner.into(),
            BookingError::Inventory(inner) => inner.into(),
        }
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::SeatUnavailable { seat_number, .. } => {
                Self::SeatUnavailable(vec![seat_number])
            }
            ReservationError::NotFound(id) => Self::NotFound(format!("Ticket not found: {id}")),
            e @ (ReservationError::InvalidState { .. } | ReservationError::HoldLapsed(_)) => {
                Self::Conflict(e.to_string())
            }
            ReservationError::Inventory(inner) => inner.into(),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(id) => Self::NotFound(format!("Schedule not found: {id}")),
            e @ (InventoryError::Inactive(_) | InventoryError::InsufficientCapacity { .. }) => {
                Self::Conflict(e.to_string())
            }
            // Counter corruption is a bug, not a client error.
            e @ InventoryError::CapacityExceeded { .. } => Self::Internal(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}
