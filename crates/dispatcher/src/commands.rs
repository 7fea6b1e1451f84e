use std::sync::Arc;

use tracing::{debug, error, warn};

use alarm_core::{DispatchError, DispatchResult};
use alarm_domain::{DispositioningAuthority, OperationId, ToggleOutcome};
use alarm_infrastructure::{DispatchMetrics, StructuredLogger};

use crate::store::{CommandTicket, DispatchStateStore};
use crate::supervisor::ConnectionSupervisor;

/// 派遣/召回命令处理器
pub struct CommandHandler {
    store: Arc<DispatchStateStore>,
    supervisor: Arc<ConnectionSupervisor>,
    metrics: Arc<DispatchMetrics>,
}

impl CommandHandler {
    pub fn new(
        store: Arc<DispatchStateStore>,
        supervisor: Arc<ConnectionSupervisor>,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            store,
            supervisor,
            metrics,
        }
    }

    /// 切换当前警情上某个资源的派遣状态
    ///
    /// 警情必须是当前加载的警情，资源必须在视图中且未被报警机构调派。
    /// 远程调用失败时不做乐观更新，也不自动重试。
    pub async fn toggle_dispatch(
        &self,
        operation_id: OperationId,
        resource_id: &str,
    ) -> DispatchResult<ToggleOutcome> {
        let ticket = match self.store.command_ticket(operation_id, resource_id).await {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(
                    operation_id = operation_id,
                    resource_id = resource_id,
                    "忽略派遣命令: {}",
                    e
                );
                return Err(e);
            }
        };

        let outcome = self.execute(operation_id, resource_id).await?;
        self.apply_optimistic(&ticket, outcome).await;
        Ok(outcome)
    }

    /// 切换任意警情上资源的派遣状态，不检查视图
    ///
    /// 警情恰好是当前加载的警情时同样做乐观更新。
    pub async fn toggle_remote(
        &self,
        operation_id: OperationId,
        resource_id: &str,
    ) -> DispatchResult<ToggleOutcome> {
        let ticket = self.store.observe(operation_id, resource_id).await;
        let outcome = self.execute(operation_id, resource_id).await?;
        if let Some(ticket) = ticket {
            self.apply_optimistic(&ticket, outcome).await;
        }
        Ok(outcome)
    }

    async fn apply_optimistic(&self, ticket: &CommandTicket, outcome: ToggleOutcome) {
        let applied = self
            .store
            .apply_optimistic(ticket, outcome.dispatched())
            .await;
        debug!(
            operation_id = ticket.operation_id,
            resource_id = %ticket.resource_id,
            applied = applied,
            "乐观更新派遣标志"
        );
    }

    /// 在独立任务中执行远程调用，不占用轮询和推送路径
    async fn execute(
        &self,
        operation_id: OperationId,
        resource_id: &str,
    ) -> DispatchResult<ToggleOutcome> {
        let bindings = self.supervisor.bindings().await?;
        let remote_resource_id = resource_id.to_string();

        let handle = tokio::spawn(toggle_remote_state(
            bindings.dispositioning,
            operation_id,
            remote_resource_id,
        ));

        let result = handle
            .await
            .map_err(|e| DispatchError::Internal(format!("派遣命令任务异常退出: {e}")))?;

        match &result {
            Ok(outcome) => {
                self.metrics.record_command(outcome.as_str());
                StructuredLogger::log_command_executed(operation_id, resource_id, outcome.as_str());
            }
            Err(e) => {
                self.metrics
                    .record_command_failure(&format!("{:?}", e.class()));
                if e.is_connectivity() {
                    warn!("执行派遣命令时连接中断: {}", e);
                    self.supervisor.mark_failed(e);
                } else {
                    error!(
                        operation_id = operation_id,
                        resource_id = resource_id,
                        "执行派遣命令失败: {}",
                        e
                    );
                }
            }
        }

        result
    }
}

/// 已派遣则召回，否则派遣
async fn toggle_remote_state(
    dispositioning: Arc<dyn DispositioningAuthority>,
    operation_id: OperationId,
    resource_id: String,
) -> DispatchResult<ToggleOutcome> {
    let dispatched = dispositioning.get_dispatched_resources(operation_id).await?;
    if dispatched.iter().any(|id| *id == resource_id) {
        dispositioning.recall(operation_id, &resource_id).await?;
        Ok(ToggleOutcome::Recalled)
    } else {
        dispositioning.dispatch(operation_id, &resource_id).await?;
        Ok(ToggleOutcome::Dispatched)
    }
}
