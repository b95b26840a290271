use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Absolute deadline granted to a PENDING booking (and to the seat
    /// holds created through it).
    pub booking_hold_seconds: u64,
    /// Hold granted to seats reserved outside of a booking.
    pub seat_hold_seconds: u64,
    /// How often the expiry sweeper wakes up.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Upper bound on one payment-gateway call. A stuck charge counts as a
    /// failed one.
    #[serde(default = "default_payment_timeout")]
    pub payment_timeout_seconds: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_sweep_interval() -> u64 {
    30
}

fn default_payment_timeout() -> u64 {
    10
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file is optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. TRIPLINE__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("TRIPLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
