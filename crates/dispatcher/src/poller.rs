use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use alarm_core::{DispatchError, DispatchResult, PollerConfig};
use alarm_domain::{DispositionEvent, OperationId};
use alarm_infrastructure::{DispatchMetrics, StructuredLogger};

use crate::loader::ResourceViewLoader;
use crate::store::{DispatchStateStore, ReplaceOutcome};
use crate::supervisor::ConnectionSupervisor;

/// 轮询状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    OperationLoaded(OperationId),
    ErrorBackoff,
}

/// 单个轮询周期的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 上一个周期仍在运行
    Skipped,
    /// 连接故障，等待下一个周期重新绑定
    Backoff,
    Idle,
    Cleared(OperationId),
    Unchanged(OperationId),
    Loaded(OperationId),
    /// 加载期间警情已被确认
    Acknowledged(OperationId),
}

/// 警情轮询器
pub struct OperationPoller {
    config: PollerConfig,
    store: Arc<DispatchStateStore>,
    supervisor: Arc<ConnectionSupervisor>,
    loader: Arc<ResourceViewLoader>,
    metrics: Arc<DispatchMetrics>,
    state: std::sync::Mutex<PollState>,
    tick_guard: Mutex<()>,
}

impl OperationPoller {
    pub fn new(
        config: PollerConfig,
        store: Arc<DispatchStateStore>,
        supervisor: Arc<ConnectionSupervisor>,
        loader: Arc<ResourceViewLoader>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        let initial = if supervisor.needs_rebind() {
            PollState::ErrorBackoff
        } else {
            PollState::Idle
        };

        Self {
            config,
            store,
            supervisor,
            loader,
            metrics,
            state: std::sync::Mutex::new(initial),
            tick_guard: Mutex::new(()),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(PollState::ErrorBackoff)
    }

    fn set_state(&self, next: PollState) {
        if let Ok(mut state) = self.state.lock() {
            if *state != next {
                debug!("轮询状态变更: {:?} -> {:?}", *state, next);
                *state = next;
            }
        }
    }

    /// 执行一个轮询周期
    ///
    /// 只有致命错误返回 `Err`；连接故障清空视图并进入 `ErrorBackoff`。
    pub async fn tick(&self) -> DispatchResult<TickOutcome> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            self.metrics.record_skipped_tick();
            return Ok(TickOutcome::Skipped);
        };
        if self.supervisor.is_faulted() {
            return Ok(TickOutcome::Skipped);
        }
        self.metrics.record_poll_tick();

        // 重新绑定后视图可能已错过推送事件，必须重新加载
        let rebound = self.supervisor.needs_rebind() || self.state() == PollState::ErrorBackoff;
        if rebound {
            if let Err(e) = self.supervisor.reconnect().await {
                return self.handle_failure(e).await;
            }
        }

        match self.refresh(rebound).await {
            Ok(outcome) => {
                self.supervisor.mark_healthy();
                Ok(outcome)
            }
            Err(e) => self.handle_failure(e).await,
        }
    }

    async fn refresh(&self, force_reload: bool) -> DispatchResult<TickOutcome> {
        let bindings = self.supervisor.bindings().await?;
        let candidates = bindings
            .operations
            .list_operation_ids(
                self.config.max_age_minutes,
                self.config.only_non_acknowledged,
                self.config.operation_limit,
            )
            .await?;
        let candidate = candidates.first().copied();
        let current = self.store.current_operation().await;

        let Some(operation_id) = candidate else {
            return Ok(self.go_idle(current, "没有未确认的警情").await);
        };

        if current == Some(operation_id) {
            if !force_reload {
                self.set_state(PollState::OperationLoaded(operation_id));
                return Ok(TickOutcome::Unchanged(operation_id));
            }
            info!("远程服务已重新绑定，重新加载警情 {} 的派遣视图", operation_id);
        } else {
            info!("检测到新的警情 {}，开始加载派遣视图", operation_id);
        }
        self.store.begin_load(operation_id).await;
        let items = match self.loader.load_with(&bindings, operation_id).await {
            Ok(Some(items)) => items,
            Ok(None) => {
                self.store.abort_load(operation_id).await;
                warn!("警情 {} 已不存在，视为没有候选警情", operation_id);
                return Ok(self.go_idle(current, "候选警情不存在").await);
            }
            Err(e) => {
                self.store.abort_load(operation_id).await;
                return Err(e);
            }
        };

        let item_count = items.len();
        match self.store.replace(operation_id, items).await {
            ReplaceOutcome::Replaced { unresolved } => {
                self.set_state(PollState::OperationLoaded(operation_id));
                let inserted = self.resolve_unresolved(operation_id, unresolved).await?;
                self.metrics.update_view_items(item_count + inserted);
                Ok(TickOutcome::Loaded(operation_id))
            }
            ReplaceOutcome::Acknowledged => {
                self.metrics.update_view_items(0);
                self.set_state(PollState::Idle);
                Ok(TickOutcome::Acknowledged(operation_id))
            }
        }
    }

    /// 加载期间派遣、但不在新视图中的资源，从资源目录查找后插入
    async fn resolve_unresolved(
        &self,
        operation_id: OperationId,
        events: Vec<DispositionEvent>,
    ) -> DispatchResult<usize> {
        let mut inserted = 0;
        for event in events {
            match self.loader.find_active_resource(&event.resource_id).await? {
                Some(resource) => {
                    if self.store.insert_alarmed(operation_id, resource).await {
                        inserted += 1;
                    }
                }
                None => debug!(
                    resource_id = %event.resource_id,
                    "加载期间派遣的资源不在活跃资源目录中，忽略"
                ),
            }
        }
        Ok(inserted)
    }

    async fn go_idle(&self, current: Option<OperationId>, reason: &str) -> TickOutcome {
        self.set_state(PollState::Idle);
        if current.is_none() {
            return TickOutcome::Idle;
        }

        let cleared = self.store.clear().await;
        self.metrics.update_view_items(0);
        StructuredLogger::log_operation_cleared(cleared, reason);
        match cleared {
            Some(operation_id) => TickOutcome::Cleared(operation_id),
            None => TickOutcome::Idle,
        }
    }

    async fn handle_failure(&self, e: DispatchError) -> DispatchResult<TickOutcome> {
        let class = format!("{:?}", e.class());
        self.metrics.record_poll_failure(&class);

        if e.is_connectivity() {
            warn!("轮询时与远程服务的连接中断: {}", e);
            self.supervisor.mark_failed(&e);
            self.set_state(PollState::ErrorBackoff);
            let cleared = self.store.clear().await;
            self.metrics.update_view_items(0);
            if cleared.is_some() {
                StructuredLogger::log_operation_cleared(cleared, "连接中断");
            }
            return Ok(TickOutcome::Backoff);
        }

        error!("轮询时发生致命错误: {}", e);
        self.supervisor.mark_faulted(&e);
        Err(e)
    }

    /// 按固定间隔运行轮询，直到收到关闭信号或发生致命错误
    ///
    /// 每个周期在独立任务中执行，不阻塞下一个周期的调度。
    pub async fn run(self: Arc<Self>, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut connection_rx = self.supervisor.subscribe();

        if self.supervisor.is_faulted() {
            error!("连接监督器处于致命错误状态，不启动轮询");
            return;
        }
        info!("警情轮询已启动，间隔 {}ms", self.config.interval_ms);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let poller = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = poller.tick().await {
                            error!("轮询周期失败: {}", e);
                        }
                    });
                }
                changed = connection_rx.changed() => {
                    if changed.is_err() || connection_rx.borrow().is_fatal() {
                        error!("连接监督器报告致命错误，停止轮询");
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("收到关闭信号，停止警情轮询");
                    break;
                }
            }
        }
    }
}
