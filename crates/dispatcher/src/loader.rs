use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use alarm_core::DispatchResult;
use alarm_domain::{CatalogResource, OperationId, ResourceViewItem};
use alarm_infrastructure::{DispatchMetrics, StructuredLogger};

use crate::projection::{apply_dispatched, project};
use crate::supervisor::{Bindings, ConnectionSupervisor};

/// 按警情ID生成派遣视图，不修改任何状态
pub struct ResourceViewLoader {
    supervisor: Arc<ConnectionSupervisor>,
    metrics: Arc<DispatchMetrics>,
}

impl ResourceViewLoader {
    pub fn new(supervisor: Arc<ConnectionSupervisor>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            supervisor,
            metrics,
        }
    }

    /// 警情不存在时返回 `None`
    pub async fn load(&self, operation_id: OperationId) -> DispatchResult<Option<Vec<ResourceViewItem>>> {
        let bindings = self.supervisor.bindings().await?;
        self.load_with(&bindings, operation_id).await
    }

    pub async fn load_with(
        &self,
        bindings: &Bindings,
        operation_id: OperationId,
    ) -> DispatchResult<Option<Vec<ResourceViewItem>>> {
        let start_time = Instant::now();

        let Some(operation) = bindings.operations.get_operation_by_id(operation_id).await? else {
            debug!("警情 {} 不存在", operation_id);
            return Ok(None);
        };

        let catalog = self.supervisor.catalog().await?;
        let active = catalog.get_all_active_resources().await?;
        let alarmed = catalog.get_filtered_resources(&operation.resources).await?;
        let mut items = project(&active, &alarmed, |c, r| catalog.is_match(c, r));

        let dispatched: HashSet<String> = bindings
            .dispositioning
            .get_dispatched_resources(operation.id)
            .await?
            .into_iter()
            .collect();
        apply_dispatched(&mut items, &dispatched);

        let alarmed_count = items.iter().filter(|item| !item.can_dispatch).count();
        StructuredLogger::log_operation_loaded(operation.id, items.len(), alarmed_count);
        self.metrics.record_operation_reload(
            operation.id,
            items.len(),
            start_time.elapsed().as_secs_f64(),
        );

        Ok(Some(items))
    }

    /// 在活跃资源目录中按ID查找资源
    ///
    /// 用于派遣事件报告的资源尚不在视图中的情况。
    pub async fn find_active_resource(&self, resource_id: &str) -> DispatchResult<Option<CatalogResource>> {
        let catalog = self.supervisor.catalog().await?;
        let resources = catalog.get_all_active_resources().await?;
        Ok(resources.into_iter().find(|r| r.id == resource_id))
    }
}
