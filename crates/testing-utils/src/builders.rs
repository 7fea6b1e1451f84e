//! Test data builders for creating test entities
//!
//! This module provides builder patterns for creating test data with
//! sensible defaults and easy customization.

use alarm_domain::{
    CatalogResource, DispositionAction, DispositionEvent, Operation, OperationId,
    OperationResource, PushEvent,
};
use chrono::{DateTime, Duration, Utc};

/// Builder for creating test CatalogResource entities
///
/// The default alarm identifiers are `"Musterstadt"` and `"LF <id>"`,
/// so an operation resource named `"FL Musterstadt LF <id>"` matches it.
pub struct CatalogResourceBuilder {
    resource: CatalogResource,
}

impl CatalogResourceBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            resource: CatalogResource {
                id: id.to_string(),
                display_name: id.to_string(),
                site_alarm_identifier: "Musterstadt".to_string(),
                resource_alarm_identifier: format!("LF {id}"),
                is_active: true,
            },
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.resource.display_name = display_name.to_string();
        self
    }

    pub fn with_site_identifier(mut self, identifier: &str) -> Self {
        self.resource.site_alarm_identifier = identifier.to_string();
        self
    }

    pub fn with_resource_identifier(mut self, identifier: &str) -> Self {
        self.resource.resource_alarm_identifier = identifier.to_string();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.resource.is_active = false;
        self
    }

    pub fn build(self) -> CatalogResource {
        self.resource
    }
}

/// Builder for creating test Operation entities
pub struct OperationBuilder {
    operation: Operation,
}

impl OperationBuilder {
    pub fn new(id: OperationId) -> Self {
        Self {
            operation: Operation {
                id,
                operation_number: format!("E-{id:06}"),
                timestamp: Utc::now(),
                resources: vec![],
                is_acknowledged: false,
            },
        }
    }

    pub fn with_operation_number(mut self, number: &str) -> Self {
        self.operation.operation_number = number.to_string();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.operation.timestamp = timestamp;
        self
    }

    pub fn minutes_ago(mut self, minutes: i64) -> Self {
        self.operation.timestamp = Utc::now() - Duration::minutes(minutes);
        self
    }

    /// Add an alarmed resource by its full name
    pub fn with_resource(mut self, full_name: &str) -> Self {
        self.operation
            .resources
            .push(OperationResource::new(full_name));
        self
    }

    /// Add an alarmed resource that matches the default catalog builder output
    pub fn alarming(self, resource_id: &str) -> Self {
        self.with_resource(&format!("FL Musterstadt LF {resource_id}"))
    }

    pub fn acknowledged(mut self) -> Self {
        self.operation.is_acknowledged = true;
        self
    }

    pub fn build(self) -> Operation {
        self.operation
    }
}

/// Push event shorthands
pub fn dispatch_event(operation_id: OperationId, resource_id: &str) -> PushEvent {
    PushEvent::Disposition(DispositionEvent {
        operation_id,
        resource_id: resource_id.to_string(),
        action: DispositionAction::Dispatch,
    })
}

pub fn recall_event(operation_id: OperationId, resource_id: &str) -> PushEvent {
    PushEvent::Disposition(DispositionEvent {
        operation_id,
        resource_id: resource_id.to_string(),
        action: DispositionAction::Recall,
    })
}

pub fn acknowledged_event(operation_id: OperationId) -> PushEvent {
    PushEvent::OperationAcknowledged { operation_id }
}
