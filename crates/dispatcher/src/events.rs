use std::sync::Arc;

use tracing::{debug, info, warn};

use alarm_core::DispatchResult;
use alarm_domain::{DispositionEvent, OperationId, PushEvent};
use alarm_infrastructure::{DispatchMetrics, StructuredLogger};

use crate::loader::ResourceViewLoader;
use crate::store::{DispatchStateStore, DispositionOutcome};
use crate::supervisor::ConnectionSupervisor;

/// 推送事件处理器
///
/// 推送事件是两次轮询之间状态变化的权威来源，优先于命令的乐观更新。
pub struct PushEventHandler {
    store: Arc<DispatchStateStore>,
    supervisor: Arc<ConnectionSupervisor>,
    loader: Arc<ResourceViewLoader>,
    metrics: Arc<DispatchMetrics>,
}

impl PushEventHandler {
    pub fn new(
        store: Arc<DispatchStateStore>,
        supervisor: Arc<ConnectionSupervisor>,
        loader: Arc<ResourceViewLoader>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            store,
            supervisor,
            loader,
            metrics,
        }
    }

    pub async fn handle(&self, event: PushEvent) -> DispatchResult<()> {
        let event_type = event.event_type();
        let operation_id = event.operation_id();

        let applied = match event {
            PushEvent::Disposition(disposition) => self.handle_disposition(&disposition).await?,
            PushEvent::OperationAcknowledged { operation_id } => {
                self.handle_acknowledged(operation_id).await
            }
        };

        self.metrics.record_push_event(event_type, applied);
        StructuredLogger::log_push_event(
            operation_id,
            event_type,
            if applied { "applied" } else { "ignored" },
        );
        Ok(())
    }

    async fn handle_disposition(&self, event: &DispositionEvent) -> DispatchResult<bool> {
        match self.store.apply_disposition(event).await {
            DispositionOutcome::Applied => Ok(true),
            DispositionOutcome::Buffered => {
                debug!(
                    operation_id = event.operation_id,
                    resource_id = %event.resource_id,
                    "警情正在加载，推送事件已缓存"
                );
                Ok(true)
            }
            DispositionOutcome::Ignored => {
                debug!(
                    operation_id = event.operation_id,
                    resource_id = %event.resource_id,
                    "推送事件与当前视图无关，忽略"
                );
                Ok(false)
            }
            DispositionOutcome::NeedsCatalogEntry => self.insert_from_catalog(event).await,
        }
    }

    /// 派遣的资源尚不在视图中时，从资源目录查找并插入
    async fn insert_from_catalog(&self, event: &DispositionEvent) -> DispatchResult<bool> {
        let resource = match self.loader.find_active_resource(&event.resource_id).await {
            Ok(resource) => resource,
            Err(e) => {
                if e.is_connectivity() {
                    warn!("查找资源目录时连接中断，下一个轮询周期重新加载视图: {}", e);
                    self.supervisor.mark_failed(&e);
                }
                return Err(e);
            }
        };

        let Some(resource) = resource else {
            debug!(
                resource_id = %event.resource_id,
                "派遣的资源不在活跃资源目录中，忽略"
            );
            return Ok(false);
        };

        Ok(self.store.insert_alarmed(event.operation_id, resource).await)
    }

    async fn handle_acknowledged(&self, operation_id: OperationId) -> bool {
        let matched = self.store.acknowledge(operation_id).await;
        if matched {
            info!("警情 {} 已被确认，清空派遣视图", operation_id);
            self.metrics.update_view_items(0);
        } else {
            debug!("确认的警情 {} 不是当前警情，忽略", operation_id);
        }
        matched
    }
}
