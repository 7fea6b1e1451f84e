use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info, warn};

use alarm_api::{create_app, AppState};
use alarm_core::AppConfig;
use alarm_dispatcher::DispatchEngine;
use alarm_domain::AuthorityConnector;
use alarm_infrastructure::{DispatchMetrics, HttpAuthorityConnector};

use crate::shutdown::{ComponentTasks, StopReport};

/// 收到关闭信号后各组件的停止宽限期
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// 主应用程序
///
/// 组装远程服务连接器、派遣引擎和HTTP接口。
pub struct Application {
    config: AppConfig,
    engine: Arc<DispatchEngine>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!(
            "初始化应用程序，警情服务: {}，派遣服务: {}，资源目录: {}",
            config.authorities.operation_service_url,
            config.authorities.dispositioning_service_url,
            config.authorities.catalog_service_url
        );

        let connector: Arc<dyn AuthorityConnector> =
            Arc::new(HttpAuthorityConnector::new(config.authorities.clone()));
        Ok(Self::with_connector(config, connector).await)
    }

    /// 使用指定的连接器创建应用实例
    pub async fn with_connector(config: AppConfig, connector: Arc<dyn AuthorityConnector>) -> Self {
        let metrics = Arc::new(DispatchMetrics::new());
        let engine = Arc::new(DispatchEngine::new(connector, config.poller.clone(), metrics).await);

        Self { config, engine }
    }

    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// 运行应用程序，直到收到关闭信号
    ///
    /// 收到信号后等待各组件退出，超过宽限期的组件被中止。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<StopReport> {
        info!("启动派遣引擎");
        let mut tasks = ComponentTasks::new();
        tasks.extend(
            "engine",
            self.engine
                .start(shutdown_rx.resubscribe())
                .await
                .context("启动派遣引擎失败")?,
        );

        if self.config.api.enabled {
            let api_shutdown = shutdown_rx.resubscribe();
            let engine = Arc::clone(&self.engine);
            let config = self.config.clone();

            tasks.push(
                "api",
                tokio::spawn(async move {
                    if let Err(e) = run_api(engine, &config, api_shutdown).await {
                        error!("API服务器运行失败: {}", e);
                    }
                }),
            );
        } else {
            info!("HTTP接口已禁用");
        }

        let _ = shutdown_rx.recv().await;
        info!("等待 {} 个组件任务停止", tasks.len());
        let report = tasks.join(SHUTDOWN_GRACE).await;

        if report.is_clean() {
            info!("所有组件已停止");
        } else {
            warn!(
                "组件未正常停止，异常: {:?}，中止: {:?}",
                report.failed, report.aborted
            );
        }
        Ok(report)
    }
}

/// 运行API服务器
async fn run_api(
    engine: Arc<DispatchEngine>,
    config: &AppConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = create_app(AppState::new(engine), config.api.cors_enabled);

    let listener = TcpListener::bind(&config.api.bind_address)
        .await
        .with_context(|| format!("绑定地址失败: {}", config.api.bind_address))?;

    info!("API服务器启动在 http://{}", config.api.bind_address);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("API服务器收到关闭信号");
        })
        .await
        .context("API服务器运行失败")?;

    info!("API服务器已停止");
    Ok(())
}
