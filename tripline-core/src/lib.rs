pub mod notify;
pub mod payment;

pub use notify::{LogNotificationDispatcher, NotificationDispatcher};
pub use payment::{Payment, PaymentGateway, PaymentOutcome, PaymentStatus};
