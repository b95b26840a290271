use serde::{Deserialize, Serialize};

use crate::schedule::SeatType;

/// Per-seat-type price multipliers applied to a schedule's base price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub business_multiplier: f64,
    pub berth_lower_multiplier: f64,
    pub berth_upper_multiplier: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            business_multiplier: 1.5,
            berth_lower_multiplier: 1.25,
            berth_upper_multiplier: 1.15,
        }
    }
}

impl PricingPolicy {
    /// Price in minor units for one seat of the given type.
    pub fn seat_price(&self, base_price: i32, seat_type: SeatType) -> i32 {
        let multiplier = match seat_type {
            SeatType::Economy => 1.0,
            SeatType::Business => self.business_multiplier,
            SeatType::BerthLower => self.berth_lower_multiplier,
            SeatType::BerthUpper => self.berth_upper_multiplier,
        };
        (base_price as f64 * multiplier).round() as i32
    }
}
