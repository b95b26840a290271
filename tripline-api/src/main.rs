use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tripline_api::{app, worker, AppState};
use tripline_booking::{BookingOrchestrator, BookingPolicy, MockPaymentGateway};
use tripline_core::LogNotificationDispatcher;
use tripline_inventory::{PricingPolicy, SeatInventory};
use tripline_store::EventBus;
use tripline_ticket::ReservationManager;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tripline_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Tripline API on port {}", config.server.port);

    let rules = config.business_rules.clone();

    let inventory = Arc::new(SeatInventory::new());
    let tickets = Arc::new(ReservationManager::new(inventory.clone()));
    let bus = EventBus::default();
    let pricing = PricingPolicy::default();

    let policy = BookingPolicy {
        booking_hold: chrono::Duration::seconds(rules.booking_hold_seconds as i64),
        payment_timeout: std::time::Duration::from_secs(rules.payment_timeout_seconds),
    };

    // Gateway adapter: the mock settles every charge; swap in a real
    // provider adapter here when one exists.
    let orchestrator = Arc::new(BookingOrchestrator::new(
        tickets,
        Arc::new(MockPaymentGateway::settling()),
        Arc::new(LogNotificationDispatcher),
        bus.clone(),
        policy,
        pricing.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = tokio::spawn(worker::start_expiry_sweeper(
        orchestrator.clone(),
        std::time::Duration::from_secs(rules.sweep_interval_seconds),
        shutdown_rx,
    ));

    let app_state = AppState {
        orchestrator,
        inventory,
        bus,
        business_rules: rules,
        pricing,
    };
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");

    // Let the sweeper finish its current pass before the process exits.
    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
}
