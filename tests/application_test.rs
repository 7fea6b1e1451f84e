use std::sync::Arc;
use std::time::Duration;

use alarm_core::{AppConfig, PollerConfig};
use alarm_dispatch::app::Application;
use alarm_dispatch::shutdown::ShutdownManager;
use alarm_testing_utils::{
    dispatch_event, CatalogResourceBuilder, IntegrationTestSetup, MockAuthorities,
    MockDispositioningAuthority, MockOperationAuthority, MockResourceCatalog, OperationBuilder,
    TestEnv,
};

fn authorities() -> MockAuthorities {
    MockAuthorities::new(
        MockOperationAuthority::with_operations(vec![OperationBuilder::new(7).minutes_ago(1).build()]),
        MockDispositioningAuthority::new(),
        MockResourceCatalog::with_resources(vec![
            CatalogResourceBuilder::new("A").build(),
            CatalogResourceBuilder::new("B").build(),
        ]),
    )
}

fn test_config(api_enabled: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.poller = PollerConfig {
        interval_ms: 20,
        ..PollerConfig::default()
    };
    config.api.enabled = api_enabled;
    config.api.bind_address = "127.0.0.1:0".to_string();
    config
}

#[tokio::test]
async fn test_application_loads_operation_and_shuts_down() {
    IntegrationTestSetup::init_logging();
    let authorities = authorities();
    let app = Arc::new(
        Application::with_connector(test_config(false), Arc::new(authorities.connector.clone()))
            .await,
    );
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    let engine = Arc::clone(app.engine());
    let loaded = TestEnv::wait_for(
        || {
            let engine = Arc::clone(&engine);
            async move { engine.snapshot().operation_id == Some(7) }
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(loaded);

    // 推送事件经引擎的事件通道生效
    engine
        .event_sender()
        .send(dispatch_event(7, "A"))
        .await
        .unwrap();
    let dispatched = TestEnv::wait_for(
        || {
            let engine = Arc::clone(&engine);
            async move {
                engine
                    .snapshot()
                    .item("A")
                    .map(|item| item.dispatched)
                    .unwrap_or(false)
            }
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(dispatched);

    shutdown.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("application did not stop in time")
        .unwrap()
        .unwrap();
    assert!(result.is_clean());
    assert_eq!(result.stopped, vec!["engine", "engine"]);
}

#[tokio::test]
async fn test_application_with_api_stops_on_shutdown() {
    let authorities = authorities();
    let app = Arc::new(
        Application::with_connector(test_config(true), Arc::new(authorities.connector.clone()))
            .await,
    );
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("application did not stop in time")
        .unwrap()
        .unwrap();
    assert!(result.is_clean());
    assert_eq!(result.stopped, vec!["engine", "engine", "api"]);
}

#[tokio::test]
async fn test_application_survives_unreachable_authorities() {
    let authorities = authorities();
    authorities.connector.set_unreachable(true);
    let app = Arc::new(
        Application::with_connector(test_config(false), Arc::new(authorities.connector.clone()))
            .await,
    );
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = Arc::clone(&app);
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(app.engine().connection_state().is_error());
    assert!(app.engine().snapshot().operation_id.is_none());

    // 远程服务恢复后下一个周期重新绑定
    authorities.connector.set_unreachable(false);
    let engine = Arc::clone(app.engine());
    let recovered = TestEnv::wait_for(
        || {
            let engine = Arc::clone(&engine);
            async move { engine.snapshot().operation_id == Some(7) }
        },
        Duration::from_secs(2),
    )
    .await;
    assert!(recovered);
    assert!(!app.engine().connection_state().is_error());

    shutdown.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
}
