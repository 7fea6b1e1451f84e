use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use tokio::signal;
use tracing::{error, info, warn};

use alarm_core::{init_logging, AppConfig, LogFormat};
use alarm_dispatch::app::Application;
use alarm_dispatch::shutdown::ShutdownManager;

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("alarm-dispatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("警情资源派遣状态同步服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时按默认路径查找"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，覆盖配置文件")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，覆盖配置文件")
                .value_parser(["json", "pretty"]),
        )
        .arg(
            Arg::new("no-api")
                .long("no-api")
                .help("不启动HTTP接口")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    // 加载配置
    let mut config = AppConfig::load(config_path).with_context(|| match config_path {
        Some(path) => format!("加载配置文件失败: {path}"),
        None => "加载默认配置失败".to_string(),
    })?;

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.observability.log_level = level.clone();
    }
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.observability.log_format = format.parse::<LogFormat>()?;
    }
    if matches.get_flag("no-api") {
        config.api.enabled = false;
    }

    // 初始化日志系统
    init_logging(
        &config.observability.log_level,
        config.observability.log_format,
    )?;

    info!("启动警情资源派遣同步服务");
    info!("配置文件: {}", config_path.unwrap_or("<默认>"));

    // 创建应用实例
    let app = Arc::new(Application::new(config).await?);

    // 创建优雅关闭管理器
    let shutdown_manager = ShutdownManager::new();

    // 启动应用
    let app_handle = {
        let shutdown_rx = shutdown_manager.subscribe();
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            app.run(shutdown_rx).await
        })
    };

    // 等待关闭信号
    wait_for_shutdown_signal().await?;

    info!("收到关闭信号，开始优雅关闭...");
    shutdown_manager.shutdown();

    // 组件停止受宽限期约束，这里不再单独设超时
    match app_handle.await {
        Ok(Ok(report)) if report.is_clean() => info!("应用已优雅关闭"),
        Ok(Ok(report)) => warn!("应用关闭时有 {} 个组件被中止", report.aborted.len()),
        Ok(Err(e)) => error!("应用运行失败: {e}"),
        Err(e) => error!("应用任务异常退出: {e}"),
    }

    info!("警情资源派遣同步服务已退出");
    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("安装SIGTERM信号处理器失败")?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("安装Ctrl+C信号处理器失败")?;
                info!("收到Ctrl+C信号");
            }
            _ = terminate.recv() => {
                info!("收到SIGTERM信号");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .context("安装Ctrl+C信号处理器失败")?;
        info!("收到Ctrl+C信号");
    }

    Ok(())
}
