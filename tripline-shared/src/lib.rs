pub mod events;
pub mod pii;

pub use events::BookingEvent;
pub use pii::MaskedEmail;
