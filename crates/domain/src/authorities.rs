//! 远程服务抽象
//!
//! 警情服务、派遣服务和资源目录的访问接口，具体传输方式由基础设施层实现

use std::sync::Arc;

use alarm_core::DispatchResult;
use async_trait::async_trait;

use crate::entities::{CatalogResource, Operation, OperationId, OperationResource, ResourceId};

/// 警情服务
#[async_trait]
pub trait OperationAuthority: Send + Sync {
    /// 按时间倒序列出警情ID
    async fn list_operation_ids(
        &self,
        max_age_minutes: i64,
        only_non_acknowledged: bool,
        limit: usize,
    ) -> DispatchResult<Vec<OperationId>>;

    async fn get_operation_by_id(&self, id: OperationId) -> DispatchResult<Option<Operation>>;
}

/// 派遣服务
#[async_trait]
pub trait DispositioningAuthority: Send + Sync {
    /// 返回手动派遣到该警情的资源ID
    async fn get_dispatched_resources(
        &self,
        operation_id: OperationId,
    ) -> DispatchResult<Vec<ResourceId>>;

    async fn dispatch(&self, operation_id: OperationId, resource_id: &str) -> DispatchResult<()>;

    async fn recall(&self, operation_id: OperationId, resource_id: &str) -> DispatchResult<()>;
}

/// 资源目录
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn get_all_resources(&self) -> DispatchResult<Vec<CatalogResource>>;

    /// 返回警情资源中能在目录里找到对应条目的子集，即报警机构已调派的资源
    async fn get_filtered_resources(
        &self,
        resources: &[OperationResource],
    ) -> DispatchResult<Vec<OperationResource>>;

    async fn get_all_active_resources(&self) -> DispatchResult<Vec<CatalogResource>> {
        let resources = self.get_all_resources().await?;
        Ok(resources.into_iter().filter(|r| r.is_active).collect())
    }

    /// 判断目录资源是否对应某个警情资源
    fn is_match(&self, catalog: &CatalogResource, resource: &OperationResource) -> bool {
        catalog.matches(resource)
    }
}

/// 远程服务绑定的建立方式
///
/// 每次重新绑定都会调用，返回的句柄在下一次绑定前一直有效。
#[async_trait]
pub trait AuthorityConnector: Send + Sync {
    async fn connect_operations(&self) -> DispatchResult<Arc<dyn OperationAuthority>>;

    async fn connect_dispositioning(&self) -> DispatchResult<Arc<dyn DispositioningAuthority>>;

    /// 资源目录按次打开，不在绑定中长期持有
    async fn connect_catalog(&self) -> DispatchResult<Arc<dyn ResourceCatalog>>;
}
