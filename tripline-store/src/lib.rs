pub mod app_config;
pub mod events;

pub use app_config::Config;
pub use events::EventBus;
