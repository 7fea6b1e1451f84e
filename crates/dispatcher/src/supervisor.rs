use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use alarm_core::{DispatchError, DispatchResult};
use alarm_domain::{
    AuthorityConnector, ConnectionState, DispositioningAuthority, OperationAuthority,
    ResourceCatalog,
};
use alarm_infrastructure::{DispatchMetrics, StructuredLogger};

/// 当前有效的远程服务绑定
#[derive(Clone)]
pub struct Bindings {
    pub operations: Arc<dyn OperationAuthority>,
    pub dispositioning: Arc<dyn DispositioningAuthority>,
}

/// 连接监督器
///
/// 持有警情服务和派遣服务的绑定以及错误标志。绑定只在轮询周期开始时
/// 重新建立，发现故障时只设置标志。
pub struct ConnectionSupervisor {
    connector: Arc<dyn AuthorityConnector>,
    bindings: RwLock<Option<Bindings>>,
    failed: AtomicBool,
    state_tx: watch::Sender<ConnectionState>,
    metrics: Arc<DispatchMetrics>,
}

impl ConnectionSupervisor {
    pub fn new(connector: Arc<dyn AuthorityConnector>, metrics: Arc<DispatchMetrics>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected {
            reason: "尚未建立连接".to_string(),
        });
        Self {
            connector,
            bindings: RwLock::new(None),
            failed: AtomicBool::new(true),
            state_tx,
            metrics,
        }
    }

    /// 首次绑定，失败时只设置错误标志
    pub async fn connect(&self) {
        match self.reconnect().await {
            Ok(()) => {}
            Err(e) if e.is_connectivity() => {
                warn!("首次连接远程服务失败，将在下一个轮询周期重试: {}", e);
            }
            Err(e) => {
                error!("首次连接远程服务时发生致命错误: {}", e);
                self.mark_faulted(&e);
            }
        }
    }

    /// 重新建立两个绑定，成功后一次性替换
    pub async fn reconnect(&self) -> DispatchResult<()> {
        debug!("重新建立远程服务绑定");
        let result = async {
            let operations = self.connector.connect_operations().await?;
            let dispositioning = self.connector.connect_dispositioning().await?;
            Ok::<_, DispatchError>(Bindings {
                operations,
                dispositioning,
            })
        }
        .await;

        match result {
            Ok(bindings) => {
                *self.bindings.write().await = Some(bindings);
                self.failed.store(false, Ordering::SeqCst);
                self.metrics.record_reconnect(true);
                self.publish(ConnectionState::Connected);
                info!("远程服务绑定已建立");
                Ok(())
            }
            Err(e) => {
                self.metrics.record_reconnect(false);
                if e.is_connectivity() {
                    self.mark_failed(&e);
                }
                Err(e)
            }
        }
    }

    pub fn needs_rebind(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub async fn bindings(&self) -> DispatchResult<Bindings> {
        self.bindings
            .read()
            .await
            .clone()
            .ok_or_else(|| DispatchError::Connectivity("尚未建立远程服务绑定".to_string()))
    }

    /// 打开一个短期使用的资源目录绑定
    pub async fn catalog(&self) -> DispatchResult<Arc<dyn ResourceCatalog>> {
        self.connector.connect_catalog().await
    }

    /// 记录可恢复的连接故障，下一个轮询周期重新绑定
    pub fn mark_failed(&self, error: &DispatchError) {
        self.failed.store(true, Ordering::SeqCst);
        self.publish(ConnectionState::Disconnected {
            reason: error.to_string(),
        });
    }

    pub fn mark_healthy(&self) {
        if !self.needs_rebind() {
            self.publish(ConnectionState::Connected);
        }
    }

    /// 记录致命错误，此后状态不再改变
    pub fn mark_faulted(&self, error: &DispatchError) {
        StructuredLogger::log_system_error("supervisor", "fault", error);
        self.publish(ConnectionState::Faulted {
            reason: error.to_string(),
        });
    }

    pub fn is_faulted(&self) -> bool {
        self.state_tx.borrow().is_fatal()
    }

    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn publish(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if current.is_fatal() || *current == next {
                return false;
            }
            *current = next.clone();
            true
        });

        if changed {
            match &next {
                ConnectionState::Connected => StructuredLogger::log_connection_change("connected", None),
                ConnectionState::Disconnected { reason } => {
                    StructuredLogger::log_connection_change("disconnected", Some(reason))
                }
                ConnectionState::Faulted { reason } => {
                    StructuredLogger::log_connection_change("faulted", Some(reason))
                }
            }
        }
    }
}
