pub mod models;


pub use models::{
    ApiConfig, AppConfig, AuthorityConfig, LogFormat, ObservabilityConfig, PollerConfig,
};
