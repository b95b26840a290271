use std::sync::Arc;

use tripline_booking::BookingOrchestrator;
use tripline_inventory::{PricingPolicy, SeatInventory};
use tripline_store::app_config::BusinessRules;
use tripline_store::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BookingOrchestrator>,
    pub inventory: Arc<SeatInventory>,
    pub bus: EventBus,
    pub business_rules: BusinessRules,
    pub pricing: PricingPolicy,
}
