//! Observability module
//!
//! Metrics collection and structured event logging for the dispatch engine.

pub mod metrics_collector;
pub mod structured_logger;

pub use metrics_collector::DispatchMetrics;
pub use structured_logger::StructuredLogger;
