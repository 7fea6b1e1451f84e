pub mod api_observability;
pub mod app_config;
pub mod poller_authority;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, LogFormat, ObservabilityConfig};
pub use app_config::AppConfig;
pub use poller_authority::{AuthorityConfig, PollerConfig};
