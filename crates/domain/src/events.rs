//! 推送事件
//!
//! 远程服务主动推送的派遣相关事件，驱动派遣视图的增量更新

use serde::{Deserialize, Serialize};

use crate::entities::{OperationId, ResourceId};

/// 派遣动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispositionAction {
    Dispatch,
    Recall,
}

/// 某个警情上的资源被派遣或召回
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionEvent {
    pub operation_id: OperationId,
    pub resource_id: ResourceId,
    pub action: DispositionAction,
}

/// 远程服务推送的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    Disposition(DispositionEvent),
    OperationAcknowledged { operation_id: OperationId },
}

impl PushEvent {
    pub fn operation_id(&self) -> OperationId {
        match self {
            PushEvent::Disposition(event) => event.operation_id,
            PushEvent::OperationAcknowledged { operation_id } => *operation_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            PushEvent::Disposition(event) => match event.action {
                DispositionAction::Dispatch => "dispatch",
                DispositionAction::Recall => "recall",
            },
            PushEvent::OperationAcknowledged { .. } => "operation_acknowledged",
        }
    }
}

impl From<DispositionEvent> for PushEvent {
    fn from(event: DispositionEvent) -> Self {
        PushEvent::Disposition(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_event_wire_format() {
        let json = r#"{"type":"disposition","operation_id":42,"resource_id":"LF-1","action":"dispatch"}"#;
        let event: PushEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            PushEvent::Disposition(DispositionEvent {
                operation_id: 42,
                resource_id: "LF-1".to_string(),
                action: DispositionAction::Dispatch,
            })
        );
        assert_eq!(event.operation_id(), 42);
        assert_eq!(event.event_type(), "dispatch");

        let json = r#"{"type":"operation_acknowledged","operation_id":7}"#;
        let event: PushEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, PushEvent::OperationAcknowledged { operation_id: 7 });
    }
}
