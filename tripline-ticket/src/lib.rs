pub mod manager;
pub mod models;

pub use manager::{ReservationError, ReservationManager};
pub use models::{Ticket, TicketStatus};
