//! Structured logging utilities
//!
//! Event-shaped log records for the dispatch engine, so that every front-end
//! facing state change carries the same field names.

use tracing::{error, info};

/// Structured logging utilities
pub struct StructuredLogger;

impl StructuredLogger {
    /// Log a freshly loaded operation view
    pub fn log_operation_loaded(operation_id: i64, item_count: usize, alarmed_count: usize) {
        info!(
            event = "operation_loaded",
            operation_id = operation_id,
            item_count = item_count,
            alarmed_count = alarmed_count,
            "Operation view loaded"
        );
    }

    /// Log the view being emptied
    pub fn log_operation_cleared(operation_id: Option<i64>, reason: &str) {
        info!(
            event = "operation_cleared",
            operation_id = ?operation_id,
            reason = reason,
            "Operation view cleared"
        );
    }

    pub fn log_command_executed(operation_id: i64, resource_id: &str, outcome: &str) {
        info!(
            event = "command_executed",
            operation_id = operation_id,
            resource_id = resource_id,
            outcome = outcome,
            "Dispatch command executed"
        );
    }

    pub fn log_push_event(operation_id: i64, event_type: &str, outcome: &str) {
        info!(
            event = "push_event",
            operation_id = operation_id,
            event_type = event_type,
            outcome = outcome,
            "Push event handled"
        );
    }

    /// Log connection state transitions
    pub fn log_connection_change(state: &str, reason: Option<&str>) {
        info!(
            event = "connection_change",
            state = state,
            reason = reason.unwrap_or(""),
            "Connection state changed"
        );
    }

    /// Log system error
    pub fn log_system_error(component: &str, operation: &str, error: &dyn std::error::Error) {
        error!(
            event = "system_error",
            component = component,
            operation = operation,
            error = %error,
            "System error occurred"
        );
    }
}
