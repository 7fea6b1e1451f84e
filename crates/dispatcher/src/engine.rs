use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use alarm_core::{DispatchError, DispatchResult, PollerConfig};
use alarm_domain::{
    AuthorityConnector, ConnectionState, DispatchSnapshot, OperationId, PushEvent,
    ResourceViewItem, ToggleOutcome,
};
use alarm_infrastructure::DispatchMetrics;

use crate::commands::CommandHandler;
use crate::events::PushEventHandler;
use crate::loader::ResourceViewLoader;
use crate::poller::{OperationPoller, PollState, TickOutcome};
use crate::store::DispatchStateStore;
use crate::supervisor::ConnectionSupervisor;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 派遣同步引擎
///
/// 持有派遣状态存储，组合轮询器、连接监督器、命令处理器和推送事件处理器。
/// 远程服务通过注入的 [`AuthorityConnector`] 访问。
pub struct DispatchEngine {
    store: Arc<DispatchStateStore>,
    supervisor: Arc<ConnectionSupervisor>,
    loader: Arc<ResourceViewLoader>,
    poller: Arc<OperationPoller>,
    commands: Arc<CommandHandler>,
    events: Arc<PushEventHandler>,
    event_tx: mpsc::Sender<PushEvent>,
    event_rx: Mutex<Option<mpsc::Receiver<PushEvent>>>,
}

impl DispatchEngine {
    /// 创建引擎并建立首次绑定；绑定失败时引擎以 `ErrorBackoff` 状态启动
    pub async fn new(
        connector: Arc<dyn AuthorityConnector>,
        config: PollerConfig,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        let store = Arc::new(DispatchStateStore::new());
        let supervisor = Arc::new(ConnectionSupervisor::new(connector, Arc::clone(&metrics)));
        supervisor.connect().await;

        let loader = Arc::new(ResourceViewLoader::new(
            Arc::clone(&supervisor),
            Arc::clone(&metrics),
        ));
        let poller = Arc::new(OperationPoller::new(
            config,
            Arc::clone(&store),
            Arc::clone(&supervisor),
            Arc::clone(&loader),
            Arc::clone(&metrics),
        ));
        let commands = Arc::new(CommandHandler::new(
            Arc::clone(&store),
            Arc::clone(&supervisor),
            Arc::clone(&metrics),
        ));
        let events = Arc::new(PushEventHandler::new(
            Arc::clone(&store),
            Arc::clone(&supervisor),
            Arc::clone(&loader),
            metrics,
        ));
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            store,
            supervisor,
            loader,
            poller,
            commands,
            events,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// 启动轮询任务和推送事件监听任务
    pub async fn start(
        &self,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> DispatchResult<Vec<JoinHandle<()>>> {
        let Some(event_rx) = self.event_rx.lock().await.take() else {
            return Err(DispatchError::Internal("派遣引擎已经启动".to_string()));
        };

        let events_shutdown = shutdown_rx.resubscribe();
        let poll_task = tokio::spawn(Arc::clone(&self.poller).run(shutdown_rx));
        let event_task = tokio::spawn(Self::listen(
            Arc::clone(&self.events),
            event_rx,
            events_shutdown,
        ));

        info!("派遣引擎已启动");
        Ok(vec![poll_task, event_task])
    }

    async fn listen(
        events: Arc<PushEventHandler>,
        mut event_rx: mpsc::Receiver<PushEvent>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        warn!("推送事件通道已关闭");
                        break;
                    };
                    if let Err(e) = events.handle(event).await {
                        error!("处理推送事件失败: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("收到关闭信号，停止推送事件监听");
                    break;
                }
            }
        }
    }

    /// 推送事件入口，供传输层转发远程服务的回调
    pub fn event_sender(&self) -> mpsc::Sender<PushEvent> {
        self.event_tx.clone()
    }

    /// 直接应用一个推送事件
    pub async fn handle_event(&self, event: PushEvent) -> DispatchResult<()> {
        self.events.handle(event).await
    }

    /// 立即执行一个轮询周期
    pub async fn poll_once(&self) -> DispatchResult<TickOutcome> {
        self.poller.tick().await
    }

    /// 切换当前警情上某个资源的派遣状态
    pub async fn toggle_dispatch(&self, resource_id: &str) -> DispatchResult<ToggleOutcome> {
        let operation_id = self
            .store
            .current_operation()
            .await
            .ok_or(DispatchError::NoCurrentOperation)?;
        self.commands.toggle_dispatch(operation_id, resource_id).await
    }

    pub async fn toggle_operation_resource(
        &self,
        operation_id: OperationId,
        resource_id: &str,
    ) -> DispatchResult<ToggleOutcome> {
        self.commands.toggle_remote(operation_id, resource_id).await
    }

    pub async fn operation_resources(
        &self,
        operation_id: OperationId,
    ) -> DispatchResult<Option<Vec<ResourceViewItem>>> {
        let result = self.loader.load(operation_id).await;
        if let Err(e) = &result {
            if e.is_connectivity() {
                self.supervisor.mark_failed(e);
            }
        }
        result
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatchSnapshot> {
        self.store.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe()
    }

    pub fn poll_state(&self) -> PollState {
        self.poller.state()
    }

    pub fn store(&self) -> &Arc<DispatchStateStore> {
        &self.store
    }
}
