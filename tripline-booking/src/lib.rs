pub mod expiry;
pub mod manager;
pub mod models;
pub mod orchestrator;

pub use expiry::SweepReport;
pub use manager::{BookingError, BookingManager};
pub use models::{Booking, BookingStatus, Passenger, SeatSelection};
pub use orchestrator::{BookingOrchestrator, BookingPolicy, MockPaymentGateway};
