//! Metrics collector for the dispatch synchronization engine
//!
//! Handles are registered once through the `metrics` crate; without an
//! installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use tracing::{debug, warn};

/// Metrics collector for the dispatch synchronization engine
pub struct DispatchMetrics {
    // Poll loop metrics
    poll_ticks_total: Counter,
    poll_ticks_skipped_total: Counter,
    poll_failures_total: Counter,
    operation_reloads_total: Counter,
    operation_reload_duration: Histogram,
    reconnects_total: Counter,

    // Command and push metrics
    commands_total: Counter,
    command_failures_total: Counter,
    push_events_applied_total: Counter,
    push_events_ignored_total: Counter,

    // View metrics
    view_items: Gauge,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            poll_ticks_total: counter!("dispatch_poll_ticks_total"),
            poll_ticks_skipped_total: counter!("dispatch_poll_ticks_skipped_total"),
            poll_failures_total: counter!("dispatch_poll_failures_total"),
            operation_reloads_total: counter!("dispatch_operation_reloads_total"),
            operation_reload_duration: histogram!("dispatch_operation_reload_duration_seconds"),
            reconnects_total: counter!("dispatch_reconnects_total"),
            commands_total: counter!("dispatch_commands_total"),
            command_failures_total: counter!("dispatch_command_failures_total"),
            push_events_applied_total: counter!("dispatch_push_events_applied_total"),
            push_events_ignored_total: counter!("dispatch_push_events_ignored_total"),
            view_items: gauge!("dispatch_view_items"),
        }
    }

    // Poll loop metrics

    pub fn record_poll_tick(&self) {
        self.poll_ticks_total.increment(1);
    }

    /// Record a tick that was skipped because the previous one was still running
    pub fn record_skipped_tick(&self) {
        self.poll_ticks_skipped_total.increment(1);
        debug!("Poll tick skipped, previous tick still running");
    }

    pub fn record_poll_failure(&self, error_class: &str) {
        self.poll_failures_total.increment(1);
        warn!(error_class = error_class, "Poll tick failed");
    }

    pub fn record_operation_reload(&self, operation_id: i64, item_count: usize, duration_seconds: f64) {
        self.operation_reloads_total.increment(1);
        self.operation_reload_duration.record(duration_seconds);
        debug!(
            operation_id = operation_id,
            item_count = item_count,
            duration_seconds = duration_seconds,
            "Operation reloaded"
        );
    }

    pub fn record_reconnect(&self, success: bool) {
        self.reconnects_total.increment(1);
        counter!(
            "dispatch_reconnect_attempts_total",
            "result" => if success { "success" } else { "failure" }
        )
        .increment(1);
    }

    // Command and push metrics

    pub fn record_command(&self, outcome: &str) {
        self.commands_total.increment(1);
        counter!("dispatch_command_outcomes_total", "outcome" => outcome.to_string()).increment(1);
    }

    pub fn record_command_failure(&self, error_class: &str) {
        self.command_failures_total.increment(1);
        warn!(error_class = error_class, "Dispatch command failed");
    }

    pub fn record_push_event(&self, event_type: &str, applied: bool) {
        if applied {
            self.push_events_applied_total.increment(1);
        } else {
            self.push_events_ignored_total.increment(1);
        }
        counter!(
            "dispatch_push_events_total",
            "type" => event_type.to_string(),
            "applied" => applied.to_string()
        )
        .increment(1);
    }

    // View metrics

    pub fn update_view_items(&self, count: usize) {
        self.view_items.set(count as f64);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
