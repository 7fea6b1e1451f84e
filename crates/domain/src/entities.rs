use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 警情ID，由远程服务分配
pub type OperationId = i64;

/// 资源ID，对应资源目录中的稳定标识
pub type ResourceId = String;

/// 警情
///
/// 由远程服务创建和维护，引擎只读取。确认之后或出现更新的警情时不再被跟踪。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub operation_number: String,
    pub timestamp: DateTime<Utc>,
    /// 报警机构为本次警情调派的资源，顺序与报警文档一致
    pub resources: Vec<OperationResource>,
    pub is_acknowledged: bool,
}

/// 报警机构为某个警情调派的资源条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResource {
    pub full_name: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub requested_equipment: Vec<String>,
}

impl OperationResource {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            timestamp: None,
            requested_equipment: Vec::new(),
        }
    }
}

/// 资源目录中的可派遣资源（车辆/装备）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResource {
    pub id: ResourceId,
    pub display_name: String,
    /// 报警文档中标识站点的字符串
    pub site_alarm_identifier: String,
    /// 报警文档中标识资源的字符串
    pub resource_alarm_identifier: String,
    pub is_active: bool,
}

impl CatalogResource {
    /// 默认匹配规则：警情资源全名同时包含站点标识和资源标识（忽略大小写）
    ///
    /// 两个标识都为空时不匹配任何条目。
    pub fn matches(&self, resource: &OperationResource) -> bool {
        if self.site_alarm_identifier.is_empty() && self.resource_alarm_identifier.is_empty() {
            return false;
        }

        let full_name = resource.full_name.to_lowercase();
        full_name.contains(&self.site_alarm_identifier.to_lowercase())
            && full_name.contains(&self.resource_alarm_identifier.to_lowercase())
    }
}

/// 派遣视图中的单个资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceViewItem {
    pub resource: CatalogResource,
    /// 已由报警机构调派的资源不能手动派遣或召回
    pub can_dispatch: bool,
    /// 是否已被手动派遣
    pub dispatched: bool,
}

impl ResourceViewItem {
    pub fn new(resource: CatalogResource, can_dispatch: bool) -> Self {
        Self {
            resource,
            can_dispatch,
            dispatched: false,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource.id
    }
}

/// 派遣视图快照，供展示层订阅
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub operation_id: Option<OperationId>,
    pub resources: Vec<ResourceViewItem>,
    /// 每次视图变更递增
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl DispatchSnapshot {
    pub fn empty() -> Self {
        Self {
            operation_id: None,
            resources: Vec::new(),
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn item(&self, resource_id: &str) -> Option<&ResourceViewItem> {
        self.resources
            .iter()
            .find(|item| item.resource_id() == resource_id)
    }

    pub fn dispatched_ids(&self) -> HashSet<&str> {
        self.resources
            .iter()
            .filter(|item| item.dispatched)
            .map(|item| item.resource_id())
            .collect()
    }
}

/// 与远程服务的连接状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    /// 可恢复的连接故障，下一个轮询周期重新绑定
    Disconnected { reason: String },
    /// 致命错误，引擎不再自动恢复
    Faulted { reason: String },
}

impl ConnectionState {
    pub fn is_error(&self) -> bool {
        !matches!(self, ConnectionState::Connected)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ConnectionState::Faulted { .. })
    }
}

/// 切换派遣状态的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleOutcome {
    Dispatched,
    Recalled,
}

impl ToggleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleOutcome::Dispatched => "Dispatched",
            ToggleOutcome::Recalled => "Recalled",
        }
    }

    /// 对应的视图中 `dispatched` 标志
    pub fn dispatched(&self) -> bool {
        matches!(self, ToggleOutcome::Dispatched)
    }
}
