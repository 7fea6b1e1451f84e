use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// 关闭信号
///
/// 派遣引擎的轮询和推送监听任务以及HTTP接口都订阅同一个信号。
#[derive(Clone)]
pub struct ShutdownManager {
    signal: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (signal, _) = broadcast::channel(4);
        Self {
            signal,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 订阅关闭信号，已关闭时返回的接收器立即就绪
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        let rx = self.signal.subscribe();
        if self.is_shutdown() {
            let (tx, rx) = broadcast::channel(1);
            let _ = tx.send(());
            return rx;
        }
        rx
    }

    /// 触发关闭，重复调用无效果
    pub fn shutdown(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            debug!("关闭信号已经发出过");
            return;
        }
        let receivers = self.signal.send(()).unwrap_or(0);
        info!("关闭信号已发送给 {} 个组件", receivers);
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// 组件停止情况
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    pub stopped: Vec<&'static str>,
    pub failed: Vec<&'static str>,
    pub aborted: Vec<&'static str>,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.aborted.is_empty()
    }
}

/// 应用启动的后台任务，按组件名登记
#[derive(Default)]
pub struct ComponentTasks {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl ComponentTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, component: &'static str, handle: JoinHandle<()>) {
        self.tasks.push((component, handle));
    }

    pub fn extend(&mut self, component: &'static str, handles: Vec<JoinHandle<()>>) {
        self.tasks
            .extend(handles.into_iter().map(|handle| (component, handle)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// 等待所有组件任务退出
    ///
    /// 超过 `grace` 仍未退出的任务会被中止，以免进程挂起。
    pub async fn join(self, grace: Duration) -> StopReport {
        let deadline = Instant::now() + grace;
        let mut report = StopReport::default();

        for (component, mut handle) in self.tasks {
            match timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {
                    debug!("组件 {} 已停止", component);
                    report.stopped.push(component);
                }
                Ok(Err(e)) => {
                    warn!("组件 {} 的任务异常退出: {}", component, e);
                    report.failed.push(component);
                }
                Err(_) => {
                    warn!("组件 {} 未在 {:?} 内停止，强制中止", component, grace);
                    handle.abort();
                    report.aborted.push(component);
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_every_component_receives_the_signal() {
        let manager = ShutdownManager::new();
        let mut poller = manager.subscribe();
        let mut api = manager.subscribe();
        assert!(!manager.is_shutdown());

        manager.shutdown();
        manager.shutdown();

        assert!(manager.is_shutdown());
        assert!(timeout(Duration::from_millis(100), poller.recv()).await.is_ok());
        assert!(timeout(Duration::from_millis(100), api.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_late_subscriber_stops_immediately() {
        let manager = ShutdownManager::new();
        manager.shutdown();

        let mut rx = manager.subscribe();
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_join_collects_stopped_components() {
        let manager = ShutdownManager::new();
        let mut tasks = ComponentTasks::new();
        for component in ["engine", "engine", "api"] {
            let mut rx = manager.subscribe();
            tasks.push(
                component,
                tokio::spawn(async move {
                    let _ = rx.recv().await;
                }),
            );
        }
        assert_eq!(tasks.len(), 3);

        manager.shutdown();
        let report = tasks.join(Duration::from_secs(1)).await;

        assert!(report.is_clean());
        assert_eq!(report.stopped, vec!["engine", "engine", "api"]);
    }

    #[tokio::test]
    async fn test_join_aborts_component_ignoring_the_signal() {
        let manager = ShutdownManager::new();
        let mut tasks = ComponentTasks::new();
        let mut rx = manager.subscribe();
        tasks.push(
            "engine",
            tokio::spawn(async move {
                let _ = rx.recv().await;
            }),
        );
        tasks.push(
            "api",
            tokio::spawn(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }),
        );

        manager.shutdown();
        let report = tasks.join(Duration::from_millis(100)).await;

        assert_eq!(report.stopped, vec!["engine"]);
        assert_eq!(report.aborted, vec!["api"]);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_join_reports_panicked_component() {
        let mut tasks = ComponentTasks::new();
        tasks.extend(
            "engine",
            vec![tokio::spawn(async { panic!("poll loop crashed") })],
        );

        let report = tasks.join(Duration::from_secs(1)).await;

        assert_eq!(report.failed, vec!["engine"]);
    }
}
