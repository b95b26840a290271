use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tripline_core::{NotificationDispatcher, Payment, PaymentGateway, PaymentOutcome, PaymentStatus};
use tripline_inventory::PricingPolicy;
use tripline_shared::events::{
    BookingCancelledEvent, BookingConfirmedEvent, BookingCreatedEvent, BookingExpiredEvent,
};
use tripline_shared::{BookingEvent, MaskedEmail};
use tripline_store::EventBus;
use tripline_ticket::{ReservationError, ReservationManager, Ticket};
use uuid::Uuid;

use crate::manager::{BookingError, BookingManager};
use crate::models::{Booking, BookingStatus, Passenger, SeatSelection};

#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Deadline granted to a PENDING booking and to every seat hold made
    /// on its behalf.
    pub booking_hold: Duration,
    /// Upper bound on one payment-gateway call; an elapsed timeout counts
    /// as a failed charge.
    pub payment_timeout: std::time::Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            booking_hold: Duration::minutes(15),
            payment_timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// Drives the booking lifecycle across the reservation manager, the seat
/// inventory, and the payment gateway. Seats are never locked while a
/// charge is in flight — tickets simply stay RESERVED, and every status
/// transition re-checks its source state afterwards.
pub struct BookingOrchestrator {
    bookings: BookingManager,
    tickets: Arc<ReservationManager>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationDispatcher>,
    bus: EventBus,
    payments: Mutex<HashMap<Uuid, Payment>>,
    policy: BookingPolicy,
    pricing: PricingPolicy,
}

impl BookingOrchestrator {
    pub fn new(
        tickets: Arc<ReservationManager>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationDispatcher>,
        bus: EventBus,
        policy: BookingPolicy,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            bookings: BookingManager::new(),
            tickets,
            gateway,
            notifier,
            bus,
            payments: Mutex::new(HashMap::new()),
            policy,
            pricing,
        }
    }

    pub fn reservations(&self) -> &Arc<ReservationManager> {
        &self.tickets
    }

    /// Reserve every requested seat and create a PENDING booking, or
    /// reserve nothing at all. Seats are attempted in the caller's order;
    /// the first failure rolls back prior reservations in reverse order
    /// and reports the seat that could not be had.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        schedule_id: Uuid,
        seats: &[SeatSelection],
        passengers: Vec<Passenger>,
        contact_email: Option<MaskedEmail>,
    ) -> Result<Booking, BookingError> {
        if seats.is_empty() {
            return Err(BookingError::NoSeats);
        }
        let mut seen = HashSet::new();
        for selection in seats {
            if !seen.insert(selection.seat_number.as_str()) {
                return Err(BookingError::DuplicateSeat(selection.seat_number.clone()));
            }
        }

        let schedule = self.tickets.inventory().get(schedule_id).await?;
        let mut booking = Booking::new(
            user_id,
            schedule_id,
            &schedule.currency,
            self.policy.booking_hold,
        );
        booking.passengers = passengers;
        booking.contact_email = contact_email;

        let mut reserved: Vec<Ticket> = Vec::new();
        for selection in seats {
            let price = self
                .pricing
                .seat_price(schedule.base_price, selection.seat_type);
            let attempt = self
                .tickets
                .reserve_until(
                    schedule_id,
                    &selection.seat_number,
                    selection.seat_type,
                    price,
                    booking.expires_at,
                    Some(booking.id),
                )
                .await;

            match attempt {
                Ok(ticket) => {
                    booking.attach_ticket(ticket.id, ticket.price);
                    reserved.push(ticket);
                }
                Err(ReservationError::SeatUnavailable { seat_number, .. }) => {
                    self.roll_back(&reserved).await;
                    return Err(BookingError::SeatUnavailable {
                        seats: vec![seat_number],
                    });
                }
                Err(e) => {
                    self.roll_back(&reserved).await;
                    return Err(e.into());
                }
            }
        }

        self.bookings.insert(booking.clone()).await;
        tracing::info!(
            booking_id = %booking.id,
            reference = %booking.booking_reference,
            seats = booking.ticket_ids.len(),
            "booking created"
        );
        self.emit(BookingEvent::BookingCreated(BookingCreatedEvent {
            booking_id: booking.id,
            user_id,
            schedule_id,
            seat_count: booking.ticket_ids.len() as i32,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(booking)
    }

    /// Charge the booking and settle the outcome. On success every ticket
    /// is confirmed and seats stay deducted; on gateway failure or timeout
    /// the booking is cancelled and its seats released.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let booking = self.bookings.get(booking_id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }
        if booking.is_past_deadline(Utc::now()) {
            return Err(BookingError::HoldLapsed(booking_id));
        }

        self.payments.lock().await.insert(
            booking_id,
            Payment::pending(booking_id, booking.total_amount, &booking.currency),
        );

        let charge = tokio::time::timeout(
            self.policy.payment_timeout,
            self.gateway
                .charge(booking_id, booking.total_amount, &booking.currency),
        )
        .await;

        match charge {
            Ok(Ok(outcome)) => self.settle_confirmed(booking_id, outcome).await,
            Ok(Err(e)) => self.settle_failed(booking_id, e.to_string()).await,
            Err(_) => {
                self.settle_failed(booking_id, "payment gateway timed out".to_string())
                    .await
            }
        }
    }

    async fn settle_confirmed(
        &self,
        booking_id: Uuid,
        outcome: PaymentOutcome,
    ) -> Result<Booking, BookingError> {
        // The charge ran without holding any locks, so the sweeper may
        // have expired the booking in the meantime. The guarded transition
        // decides who won.
        match self.bookings.confirm(booking_id).await {
            Ok(confirmed) => {
                for ticket_id in &confirmed.ticket_ids {
                    if let Err(e) = self.tickets.confirm_for_booking(*ticket_id).await {
                        tracing::error!(
                            booking_id = %booking_id,
                            ticket_id = %ticket_id,
                            error = %e,
                            "ticket confirmation failed on a confirmed booking"
                        );
                    }
                }
                self.tickets
                    .inventory()
                    .confirm_seats(confirmed.schedule_id, confirmed.ticket_ids.len() as i32);

                if let Some(payment) = self.payments.lock().await.get_mut(&booking_id) {
                    payment.settle(outcome.transaction_id.clone());
                }

                tracing::info!(
                    booking_id = %booking_id,
                    transaction_id = %outcome.transaction_id,
                    "booking confirmed"
                );
                self.emit(BookingEvent::BookingConfirmed(BookingConfirmedEvent {
                    booking_id,
                    user_id: confirmed.user_id,
                    schedule_id: confirmed.schedule_id,
                    total_amount: confirmed.total_amount,
                    transaction_id: Some(outcome.transaction_id),
                    timestamp: Utc::now().timestamp(),
                }))
                .await;

                Ok(confirmed)
            }
            Err(_) => {
                // Charge landed after the sweeper expired the booking: the
                // money goes to the refund queue, the booking stays gone.
                if let Some(payment) = self.payments.lock().await.get_mut(&booking_id) {
                    payment.status = PaymentStatus::SuccessButBookingExpired;
                    payment.transaction_id = Some(outcome.transaction_id.clone());
                }
                tracing::error!(
                    booking_id = %booking_id,
                    transaction_id = %outcome.transaction_id,
                    "charge settled for an expired booking, refund required"
                );

                let current = self.bookings.get(booking_id).await?;
                Err(BookingError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Confirmed,
                })
            }
        }
    }

    async fn settle_failed(
        &self,
        booking_id: Uuid,
        reason: String,
    ) -> Result<Booking, BookingError> {
        if let Some(payment) = self.payments.lock().await.get_mut(&booking_id) {
            payment.fail();
        }

        // Only cancel if the booking is still ours to cancel; if the
        // sweeper expired it mid-charge the seats are already released.
        if let Ok(cancelled) = self.bookings.cancel(booking_id).await {
            let released = self.release_tickets(&cancelled).await;
            tracing::warn!(
                booking_id = %booking_id,
                reason = %reason,
                "payment failed, booking cancelled"
            );
            self.emit(BookingEvent::BookingCancelled(BookingCancelledEvent {
                booking_id,
                user_id: cancelled.user_id,
                schedule_id: cancelled.schedule_id,
                seats_released: released,
                timestamp: Utc::now().timestamp(),
            }))
            .await;
        }

        Err(BookingError::PaymentFailure(reason))
    }

    /// Explicit cancellation, allowed from PENDING and from CONFIRMED
    /// (refund path). All tickets are cancelled and their seats released.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let cancelled = self.bookings.cancel(booking_id).await?;
        let released = self.release_tickets(&cancelled).await;

        {
            let mut payments = self.payments.lock().await;
            if let Some(payment) = payments.get_mut(&booking_id) {
                if payment.status == PaymentStatus::Completed {
                    payment.status = PaymentStatus::Refunded;
                    tracing::info!(booking_id = %booking_id, "completed payment marked for refund");
                }
            }
        }

        tracing::info!(booking_id = %booking_id, released, "booking cancelled");
        self.emit(BookingEvent::BookingCancelled(BookingCancelledEvent {
            booking_id,
            user_id: cancelled.user_id,
            schedule_id: cancelled.schedule_id,
            seats_released: released,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(cancelled)
    }

    /// Timeout transition driven by the sweeper. A no-op (Ok(None)) unless
    /// the booking is still PENDING and past its deadline.
    pub async fn expire_booking(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>, BookingError> {
        let Some(expired) = self.bookings.expire_if_due(booking_id, now).await? else {
            return Ok(None);
        };

        let mut released = 0;
        for ticket_id in &expired.ticket_ids {
            match self.tickets.expire(*ticket_id, now).await {
                Ok(Some(_)) => released += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        booking_id = %booking_id,
                        ticket_id = %ticket_id,
                        error = %e,
                        "ticket expiry failed during booking expiry"
                    );
                }
            }
        }

        tracing::info!(booking_id = %booking_id, released, "booking expired");
        self.emit(BookingEvent::BookingExpired(BookingExpiredEvent {
            booking_id,
            user_id: expired.user_id,
            schedule_id: expired.schedule_id,
            seats_released: released,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(Some(expired))
    }

    pub async fn get_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<(Booking, Vec<Ticket>), BookingError> {
        let booking = self.bookings.get(booking_id).await?;
        let tickets = self.tickets.get_many(&booking.ticket_ids).await;
        Ok((booking, tickets))
    }

    pub async fn payment_for(&self, booking_id: Uuid) -> Option<Payment> {
        self.payments.lock().await.get(&booking_id).cloned()
    }

    pub(crate) async fn pending_due(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.bookings.pending_due(now).await
    }

    /// Reverse-order rollback of a partially reserved seat set.
    async fn roll_back(&self, reserved: &[Ticket]) {
        for ticket in reserved.iter().rev() {
            if let Err(e) = self.tickets.cancel(ticket.id).await {
                tracing::error!(
                    ticket_id = %ticket.id,
                    error = %e,
                    "rollback of partial booking failed to cancel ticket"
                );
            }
        }
    }

    async fn release_tickets(&self, booking: &Booking) -> i32 {
        let mut released = 0;
        for ticket_id in &booking.ticket_ids {
            match self.tickets.cancel(*ticket_id).await {
                Ok(_) => released += 1,
                Err(e) => {
                    tracing::error!(
                        booking_id = %booking.id,
                        ticket_id = %ticket_id,
                        error = %e,
                        "ticket cancellation failed during booking cancel"
                    );
                }
            }
        }
        released
    }

    async fn emit(&self, event: BookingEvent) {
        self.notifier.dispatch(&event).await;
        self.bus.publish(event);
    }
}

/// Gateway stand-in for tests and the demo configuration. Settles every
/// charge unless built as declining or stalled.
pub struct MockPaymentGateway {
    decline: bool,
    latency: Option<std::time::Duration>,
}

impl MockPaymentGateway {
    pub fn settling() -> Self {
        Self {
            decline: false,
            latency: None,
        }
    }

    pub fn declining() -> Self {
        Self {
            decline: true,
            latency: None,
        }
    }

    pub fn stalled(latency: std::time::Duration) -> Self {
        Self {
            decline: false,
            latency: Some(latency),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(
        &self,
        booking_id: Uuid,
        _amount: i32,
        _currency: &str,
    ) -> Result<PaymentOutcome, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.decline {
            return Err("card declined".into());
        }
        Ok(PaymentOutcome {
            transaction_id: format!("mock_txn_{}", booking_id.simple()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;
    use tripline_core::LogNotificationDispatcher;
    use tripline_inventory::{Schedule, SeatInventory, SeatType};
    use tripline_ticket::TicketStatus;

    async fn setup(
        gateway: MockPaymentGateway,
        policy: BookingPolicy,
    ) -> (Arc<SeatInventory>, Arc<BookingOrchestrator>, EventBus, Uuid) {
        let inventory = Arc::new(SeatInventory::new());
        let departure = Utc::now() + Duration::days(2);
        let schedule = Schedule::new(
            Uuid::new_v4(),
            departure,
            departure + Duration::hours(5),
            10,
            10000,
            "USD",
        );
        let schedule_id = inventory.register(schedule).await;

        let tickets = Arc::new(ReservationManager::new(inventory.clone()));
        let bus = EventBus::default();
        let orchestrator = Arc::new(BookingOrchestrator::new(
            tickets,
            Arc::new(gateway),
            Arc::new(LogNotificationDispatcher),
            bus.clone(),
            policy,
            PricingPolicy::default(),
        ));
        (inventory, orchestrator, bus, schedule_id)
    }

    fn seat(seat_number: &str, seat_type: SeatType) -> SeatSelection {
        SeatSelection {
            seat_number: seat_number.to_string(),
            seat_type,
        }
    }

    async fn available(inventory: &SeatInventory, schedule_id: Uuid) -> i32 {
        inventory.availability(schedule_id).await.unwrap().available_seats
    }

    #[tokio::test]
    async fn test_create_booking_reserves_requested_seats() {
        let (inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        let booking = orchestrator
            .create_booking(
                Uuid::new_v4(),
                schedule_id,
                &[
                    seat("1A", SeatType::Business),
                    seat("12C", SeatType::Economy),
                ],
                vec![Passenger {
                    first_name: "Linh".to_string(),
                    last_name: "Tran".to_string(),
                    seat_number: "1A".to_string(),
                }],
                Some(MaskedEmail::new("linh@example.com")),
            )
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.ticket_ids.len(), 2);
        // 10000 business at 1.5x plus economy base.
        assert_eq!(booking.total_amount, 25000);
        assert_eq!(available(&inventory, schedule_id).await, 8);

        let (_, tickets) = orchestrator.get_booking(booking.id).await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Reserved));
        assert!(tickets.iter().all(|t| t.booking_id == Some(booking.id)));
        // Ticket order follows the request order.
        assert_eq!(tickets[0].seat_number, "1A");
        assert_eq!(tickets[1].seat_number, "12C");
        // Every hold shares the booking deadline.
        assert!(tickets
            .iter()
            .all(|t| t.reserved_until == Some(booking.expires_at)));
    }

    #[tokio::test]
    async fn test_create_booking_is_all_or_nothing() {
        let (inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        // Another customer already holds 4B.
        orchestrator
            .reservations()
            .reserve(
                schedule_id,
                "4B",
                SeatType::Economy,
                10000,
                Duration::minutes(15),
                None,
            )
            .await
            .unwrap();
        assert_eq!(available(&inventory, schedule_id).await, 9);

        let err = orchestrator
            .create_booking(
                Uuid::new_v4(),
                schedule_id,
                &[seat("4A", SeatType::Economy), seat("4B", SeatType::Economy)],
                Vec::new(),
                None,
            )
            .await
            .unwrap_err();

        match err {
            BookingError::SeatUnavailable { seats } => assert_eq!(seats, vec!["4B"]),
            other => panic!("expected SeatUnavailable, got {other:?}"),
        }

        // 4A was rolled back: only the pre-existing hold deducts a seat,
        // and 4A can be reserved again immediately.
        assert_eq!(available(&inventory, schedule_id).await, 9);
        orchestrator
            .reservations()
            .reserve(
                schedule_id,
                "4A",
                SeatType::Economy,
                10000,
                Duration::minutes(15),
                None,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_booking_validates_seat_list() {
        let (_inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        let err = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[], Vec::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NoSeats));

        let err = orchestrator
            .create_booking(
                Uuid::new_v4(),
                schedule_id,
                &[seat("5A", SeatType::Economy), seat("5A", SeatType::Economy)],
                Vec::new(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::DuplicateSeat(s) if s == "5A"));
    }

    #[tokio::test]
    async fn test_confirm_booking_settles_payment_and_keeps_seats_deducted() {
        let (inventory, orchestrator, bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;
        let mut rx = bus.subscribe();

        let booking = orchestrator
            .create_booking(
                Uuid::new_v4(),
                schedule_id,
                &[seat("6A", SeatType::Economy), seat("6B", SeatType::Economy)],
                Vec::new(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(available(&inventory, schedule_id).await, 8);

        let confirmed = orchestrator.confirm_booking(booking.id).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        let (_, tickets) = orchestrator.get_booking(booking.id).await.unwrap();
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Confirmed));
        // Seats stay deducted after confirmation.
        assert_eq!(available(&inventory, schedule_id).await, 8);

        let payment = orchestrator.payment_for(booking.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.transaction_id.unwrap().starts_with("mock_txn_"));
        assert!(payment.paid_at.is_some());

        assert_eq!(rx.recv().await.unwrap().kind(), "booking_created");
        assert_eq!(rx.recv().await.unwrap().kind(), "booking_confirmed");
    }

    #[tokio::test]
    async fn test_confirm_requires_pending_booking() {
        let (_inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        let booking = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[seat("7A", SeatType::Economy)], Vec::new(), None)
            .await
            .unwrap();
        orchestrator.confirm_booking(booking.id).await.unwrap();

        let err = orchestrator.confirm_booking(booking.id).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: BookingStatus::Confirmed,
                to: BookingStatus::Confirmed
            }
        ));
    }

    #[tokio::test]
    async fn test_confirm_after_booking_deadline_fails_without_charging() {
        let (_inventory, orchestrator, _bus, schedule_id) = setup(
            MockPaymentGateway::settling(),
            BookingPolicy {
                booking_hold: Duration::seconds(-1),
                ..BookingPolicy::default()
            },
        )
        .await;

        let booking = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[seat("8A", SeatType::Economy)], Vec::new(), None)
            .await
            .unwrap();

        let err = orchestrator.confirm_booking(booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::HoldLapsed(_)));
        // The gateway was never reached.
        assert!(orchestrator.payment_for(booking.id).await.is_none());
    }

    #[tokio::test]
    async fn test_declined_payment_cancels_booking_and_releases_seats() {
        let (inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::declining(), BookingPolicy::default()).await;

        let booking = orchestrator
            .create_booking(
                Uuid::new_v4(),
                schedule_id,
                &[seat("9A", SeatType::Economy), seat("9B", SeatType::Economy)],
                Vec::new(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(available(&inventory, schedule_id).await, 8);

        let err = orchestrator.confirm_booking(booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::PaymentFailure(_)));

        let (current, tickets) = orchestrator.get_booking(booking.id).await.unwrap();
        assert_eq!(current.status, BookingStatus::Cancelled);
        assert!(tickets.iter().all(|t| t.status == TicketStatus::Cancelled));
        assert_eq!(available(&inventory, schedule_id).await, 10);

        let payment = orchestrator.payment_for(booking.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_stuck_gateway_counts_as_payment_failure() {
        let (inventory, orchestrator, _bus, schedule_id) = setup(
            MockPaymentGateway::stalled(std::time::Duration::from_millis(500)),
            BookingPolicy {
                payment_timeout: std::time::Duration::from_millis(50),
                ..BookingPolicy::default()
            },
        )
        .await;

        let booking = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[seat("10A", SeatType::Economy)], Vec::new(), None)
            .await
            .unwrap();

        let err = orchestrator.confirm_booking(booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::PaymentFailure(reason) if reason.contains("timed out")));
        assert_eq!(available(&inventory, schedule_id).await, 10);
    }

    #[tokio::test]
    async fn test_cancel_confirmed_booking_refunds_payment() {
        let (inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        let booking = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[seat("11A", SeatType::Economy)], Vec::new(), None)
            .await
            .unwrap();
        orchestrator.confirm_booking(booking.id).await.unwrap();
        assert_eq!(available(&inventory, schedule_id).await, 9);

        let cancelled = orchestrator.cancel_booking(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(available(&inventory, schedule_id).await, 10);

        let payment = orchestrator.payment_for(booking.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn test_cancel_terminal_booking_is_invalid() {
        let (_inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        let booking = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[seat("12A", SeatType::Economy)], Vec::new(), None)
            .await
            .unwrap();
        orchestrator.cancel_booking(booking.id).await.unwrap();

        let err = orchestrator.cancel_booking(booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_bookings_for_last_seat_have_one_winner() {
        let (inventory, orchestrator, _bus, schedule_id) =
            setup(MockPaymentGateway::settling(), BookingPolicy::default()).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator
                    .create_booking(
                        Uuid::new_v4(),
                        schedule_id,
                        &[seat("13F", SeatType::Economy)],
                        Vec::new(),
                        None,
                    )
                    .await
            }));
        }

        let mut winners = 0;
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(booking) => {
                    assert_eq!(booking.status, BookingStatus::Pending);
                    winners += 1;
                }
                Err(BookingError::SeatUnavailable { seats }) => {
                    assert_eq!(seats, vec!["13F"]);
                    losers += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(losers, 1);
        assert_eq!(available(&inventory, schedule_id).await, 9);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_charge_landing_after_expiry_is_flagged_for_refund() {
        let (inventory, orchestrator, _bus, schedule_id) = setup(
            MockPaymentGateway::stalled(std::time::Duration::from_millis(400)),
            BookingPolicy {
                booking_hold: Duration::milliseconds(100),
                payment_timeout: std::time::Duration::from_secs(5),
            },
        )
        .await;

        let booking = orchestrator
            .create_booking(Uuid::new_v4(), schedule_id, &[seat("14A", SeatType::Economy)], Vec::new(), None)
            .await
            .unwrap();

        // Confirm starts within the deadline, then stalls in the gateway.
        let confirm = {
            let orchestrator = orchestrator.clone();
            let booking_id = booking.id;
            tokio::spawn(async move { orchestrator.confirm_booking(booking_id).await })
        };

        // The deadline passes and the sweeper runs while the charge is
        // still in flight.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        let report = orchestrator.sweep(Utc::now()).await;
        assert_eq!(report.bookings_expired, 1);

        let err = confirm.await.unwrap().unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));

        let (current, _) = orchestrator.get_booking(booking.id).await.unwrap();
        assert_eq!(current.status, BookingStatus::Expired);
        assert_eq!(available(&inventory, schedule_id).await, 10);

        // The stray charge is parked for manual refund.
        let payment = orchestrator.payment_for(booking.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::SuccessButBookingExpired);
        assert!(payment.transaction_id.is_some());
    }
}
