use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use alarm_core::{DispatchError, DispatchResult};
use alarm_domain::{
    CatalogResource, DispatchSnapshot, DispositionAction, DispositionEvent, OperationId,
    ResourceViewItem,
};

/// 推送的派遣事件在视图上的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionOutcome {
    Applied,
    /// 不属于当前警情，或召回的资源不在视图中
    Ignored,
    /// 目标警情正在加载，事件在替换视图时回放
    Buffered,
    /// 派遣的资源不在视图中，需要先从资源目录查找
    NeedsCatalogEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// `unresolved` 是回放时资源不在新视图中的派遣事件，需要从资源目录查找后插入
    Replaced { unresolved: Vec<DispositionEvent> },
    /// 加载期间收到了该警情的确认事件，视图被清空
    Acknowledged,
}

/// 派遣命令发出前观察到的视图版本
///
/// 乐观更新只在该资源此后没有被权威写入（轮询替换或推送事件）覆盖时生效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTicket {
    pub operation_id: OperationId,
    pub resource_id: String,
    pub revision: u64,
}

struct TrackedItem {
    item: ResourceViewItem,
    /// 最近一次权威写入时的版本号
    confirmed_at: u64,
}

struct PendingLoad {
    operation_id: OperationId,
    events: Vec<DispositionEvent>,
    acknowledged: bool,
}

#[derive(Default)]
struct StoreState {
    operation_id: Option<OperationId>,
    items: Vec<TrackedItem>,
    revision: u64,
    loading: Option<PendingLoad>,
}

impl StoreState {
    fn position(&self, resource_id: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|tracked| tracked.item.resource_id() == resource_id)
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn apply_event(&mut self, event: &DispositionEvent, revision: u64) -> bool {
        let Some(index) = self.position(&event.resource_id) else {
            return false;
        };

        match event.action {
            DispositionAction::Dispatch => {
                let tracked = &mut self.items[index];
                tracked.item.dispatched = true;
                tracked.confirmed_at = revision;
            }
            DispositionAction::Recall => {
                self.items.remove(index);
            }
        }
        true
    }

    fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            operation_id: self.operation_id,
            resources: self.items.iter().map(|t| t.item.clone()).collect(),
            revision: self.revision,
            updated_at: Utc::now(),
        }
    }
}

/// 派遣状态存储
///
/// 持有当前警情引用和视图项集合。轮询、推送和命令三条路径上的所有修改
/// 都在同一个互斥区内串行执行，每次修改后发布新的快照。
pub struct DispatchStateStore {
    state: Mutex<StoreState>,
    snapshot_tx: watch::Sender<DispatchSnapshot>,
}

impl DispatchStateStore {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(DispatchSnapshot::empty());
        Self {
            state: Mutex::new(StoreState::default()),
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatchSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// 最近一次发布的快照
    pub fn snapshot(&self) -> DispatchSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub async fn current_operation(&self) -> Option<OperationId> {
        self.state.lock().await.operation_id
    }

    pub async fn item(&self, resource_id: &str) -> Option<ResourceViewItem> {
        let state = self.state.lock().await;
        state
            .position(resource_id)
            .map(|index| state.items[index].item.clone())
    }

    fn publish(&self, state: &StoreState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }

    /// 标记开始加载某个警情，此后该警情的推送事件被缓存
    pub async fn begin_load(&self, operation_id: OperationId) {
        let mut state = self.state.lock().await;
        debug!("开始加载警情 {}", operation_id);
        state.loading = Some(PendingLoad {
            operation_id,
            events: Vec::new(),
            acknowledged: false,
        });
    }

    /// 放弃加载，丢弃缓存的事件
    pub async fn abort_load(&self, operation_id: OperationId) {
        let mut state = self.state.lock().await;
        if state
            .loading
            .as_ref()
            .is_some_and(|load| load.operation_id == operation_id)
        {
            debug!("放弃加载警情 {}", operation_id);
            state.loading = None;
        }
    }

    /// 原子替换整个视图和当前警情
    ///
    /// 加载期间缓存的推送事件按到达顺序回放；若加载期间该警情已被确认则清空视图。
    pub async fn replace(
        &self,
        operation_id: OperationId,
        items: Vec<ResourceViewItem>,
    ) -> ReplaceOutcome {
        let mut state = self.state.lock().await;
        let pending = state
            .loading
            .take()
            .filter(|load| load.operation_id == operation_id);
        let revision = state.bump();

        if pending.as_ref().is_some_and(|load| load.acknowledged) {
            info!("警情 {} 在加载期间已被确认，清空视图", operation_id);
            state.operation_id = None;
            state.items.clear();
            self.publish(&state);
            return ReplaceOutcome::Acknowledged;
        }

        state.operation_id = Some(operation_id);
        state.items = items
            .into_iter()
            .map(|item| TrackedItem {
                item,
                confirmed_at: revision,
            })
            .collect();

        let mut unresolved: Vec<DispositionEvent> = Vec::new();
        if let Some(load) = pending {
            for event in load.events {
                let applied = state.apply_event(&event, revision);
                debug!(
                    operation_id = operation_id,
                    resource_id = %event.resource_id,
                    action = ?event.action,
                    applied = applied,
                    "回放加载期间缓存的推送事件"
                );
                if applied {
                    continue;
                }
                match event.action {
                    DispositionAction::Dispatch => {
                        if !unresolved.iter().any(|e| e.resource_id == event.resource_id) {
                            unresolved.push(event);
                        }
                    }
                    // 之后的召回抵消尚未解析的派遣
                    DispositionAction::Recall => {
                        unresolved.retain(|e| e.resource_id != event.resource_id);
                    }
                }
            }
        }

        self.publish(&state);
        ReplaceOutcome::Replaced { unresolved }
    }

    /// 清空视图并将当前警情置空，返回之前的警情
    pub async fn clear(&self) -> Option<OperationId> {
        let mut state = self.state.lock().await;
        let previous = state.operation_id.take();
        if previous.is_none() && state.items.is_empty() {
            return None;
        }
        state.items.clear();
        state.bump();
        self.publish(&state);
        previous
    }

    /// 设置资源的派遣标志；资源不在视图中时不做任何事
    pub async fn upsert_dispatched(&self, resource_id: &str, dispatched: bool) -> bool {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(resource_id) else {
            return false;
        };
        let revision = state.bump();
        let tracked = &mut state.items[index];
        tracked.item.dispatched = dispatched;
        tracked.confirmed_at = revision;
        self.publish(&state);
        true
    }

    /// 插入推送事件报告的、尚不在视图中的已派遣资源
    ///
    /// 查找目录期间当前警情可能已经变化，此时不插入。资源已存在时只更新标志。
    pub async fn insert_alarmed(&self, operation_id: OperationId, resource: CatalogResource) -> bool {
        let mut state = self.state.lock().await;
        if state.operation_id != Some(operation_id) {
            debug!(
                "警情 {} 已不是当前警情，放弃插入资源 {}",
                operation_id, resource.id
            );
            return false;
        }

        let revision = state.bump();
        match state.position(&resource.id) {
            Some(index) => {
                let tracked = &mut state.items[index];
                tracked.item.dispatched = true;
                tracked.confirmed_at = revision;
            }
            None => {
                let mut item = ResourceViewItem::new(resource, true);
                item.dispatched = true;
                state.items.push(TrackedItem {
                    item,
                    confirmed_at: revision,
                });
            }
        }
        self.publish(&state);
        true
    }

    pub async fn remove(&self, resource_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(index) = state.position(resource_id) else {
            return false;
        };
        state.items.remove(index);
        state.bump();
        self.publish(&state);
        true
    }

    /// 应用推送的派遣/召回事件
    pub async fn apply_disposition(&self, event: &DispositionEvent) -> DispositionOutcome {
        let mut state = self.state.lock().await;

        if let Some(load) = state.loading.as_mut() {
            if load.operation_id == event.operation_id {
                load.events.push(event.clone());
                return DispositionOutcome::Buffered;
            }
        }

        if state.operation_id != Some(event.operation_id) {
            return DispositionOutcome::Ignored;
        }

        let present = state.position(&event.resource_id).is_some();
        match (event.action, present) {
            (DispositionAction::Dispatch, false) => DispositionOutcome::NeedsCatalogEntry,
            (DispositionAction::Recall, false) => DispositionOutcome::Ignored,
            (_, true) => {
                let revision = state.bump();
                state.apply_event(event, revision);
                self.publish(&state);
                DispositionOutcome::Applied
            }
        }
    }

    /// 处理警情确认事件
    ///
    /// 确认的是当前警情时清空视图；确认的是正在加载的警情时，加载完成后清空。
    pub async fn acknowledge(&self, operation_id: OperationId) -> bool {
        let mut state = self.state.lock().await;
        let mut matched = false;

        if let Some(load) = state.loading.as_mut() {
            if load.operation_id == operation_id {
                load.acknowledged = true;
                matched = true;
            }
        }

        if state.operation_id == Some(operation_id) {
            state.operation_id = None;
            state.items.clear();
            state.bump();
            self.publish(&state);
            matched = true;
        }

        matched
    }

    /// 检查命令的前提条件并记录当前版本
    pub async fn command_ticket(
        &self,
        operation_id: OperationId,
        resource_id: &str,
    ) -> DispatchResult<CommandTicket> {
        let state = self.state.lock().await;
        match state.operation_id {
            None => return Err(DispatchError::NoCurrentOperation),
            Some(current) if current != operation_id => {
                return Err(DispatchError::StaleOperation {
                    requested: operation_id,
                    current: Some(current),
                });
            }
            Some(_) => {}
        }

        let index = state
            .position(resource_id)
            .ok_or_else(|| DispatchError::ResourceNotInView {
                id: resource_id.to_string(),
            })?;
        if !state.items[index].item.can_dispatch {
            return Err(DispatchError::ResourceAlarmed {
                id: resource_id.to_string(),
            });
        }

        Ok(CommandTicket {
            operation_id,
            resource_id: resource_id.to_string(),
            revision: state.revision,
        })
    }

    /// 警情是当前警情时记录版本，不检查资源
    pub async fn observe(&self, operation_id: OperationId, resource_id: &str) -> Option<CommandTicket> {
        let state = self.state.lock().await;
        (state.operation_id == Some(operation_id)).then(|| CommandTicket {
            operation_id,
            resource_id: resource_id.to_string(),
            revision: state.revision,
        })
    }

    /// 命令成功后的乐观更新
    ///
    /// 资源在票据之后被权威写入过、已不在视图中或警情已切换时返回 `false`。
    pub async fn apply_optimistic(&self, ticket: &CommandTicket, dispatched: bool) -> bool {
        let mut state = self.state.lock().await;
        if state.operation_id != Some(ticket.operation_id) {
            return false;
        }
        let Some(index) = state.position(&ticket.resource_id) else {
            return false;
        };
        if state.items[index].confirmed_at > ticket.revision {
            debug!(
                resource_id = %ticket.resource_id,
                "资源在命令执行期间已被推送事件更新，跳过乐观更新"
            );
            return false;
        }

        state.items[index].item.dispatched = dispatched;
        state.bump();
        self.publish(&state);
        true
    }
}

impl Default for DispatchStateStore {
    fn default() -> Self {
        Self::new()
    }
}
