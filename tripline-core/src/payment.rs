use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    /// The gateway settled the charge after the booking had already been
    /// expired by the sweeper. The money must be refunded; the booking is
    /// not resurrected.
    SuccessButBookingExpired,
}

/// Payment record kept per booking for audit and reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i32,
    pub currency: String,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn pending(booking_id: Uuid, amount: i32, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            currency: currency.to_string(),
            status: PaymentStatus::Pending,
            transaction_id: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    pub fn settle(&mut self, transaction_id: String) {
        self.status = PaymentStatus::Completed;
        self.transaction_id = Some(transaction_id);
        self.paid_at = Some(Utc::now());
    }

    pub fn fail(&mut self) {
        self.status = PaymentStatus::Failed;
    }
}

/// Successful charge response from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub transaction_id: String,
}

/// Contract boundary to the payment provider. The booking orchestrator
/// treats any Err (including its own timeout around the call) as a failed
/// charge and cancels the booking.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(
        &self,
        booking_id: Uuid,
        amount: i32,
        currency: &str,
    ) -> Result<PaymentOutcome, Box<dyn std::error::Error + Send + Sync>>;
}
