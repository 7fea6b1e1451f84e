use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use alarm_api::{create_app, AppState};
use alarm_core::PollerConfig;
use alarm_dispatcher::DispatchEngine;
use alarm_infrastructure::DispatchMetrics;
use alarm_testing_utils::{
    CatalogResourceBuilder, InjectedFailure, MockAuthorities, MockDispositioningAuthority,
    MockOperationAuthority, MockResourceCatalog, OperationBuilder,
};

fn authorities() -> MockAuthorities {
    MockAuthorities::new(
        MockOperationAuthority::with_operations(vec![OperationBuilder::new(7)
            .minutes_ago(5)
            .alarming("B")
            .build()]),
        MockDispositioningAuthority::new(),
        MockResourceCatalog::with_resources(vec![
            CatalogResourceBuilder::new("A").build(),
            CatalogResourceBuilder::new("B").build(),
            CatalogResourceBuilder::new("X").inactive().build(),
        ]),
    )
}

async fn setup(authorities: &MockAuthorities) -> (Arc<DispatchEngine>, Router) {
    let engine = Arc::new(
        DispatchEngine::new(
            Arc::new(authorities.connector.clone()),
            PollerConfig::default(),
            Arc::new(DispatchMetrics::new()),
        )
        .await,
    );
    let app = create_app(AppState::new(Arc::clone(&engine)), true);
    (engine, app)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let authorities = authorities();
    let (_engine, app) = setup(&authorities).await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connection"]["state"], "connected");
    assert_eq!(body["service"], "alarm-dispatch");
}

#[tokio::test]
async fn test_health_check_reports_degraded_connection() {
    let authorities = authorities();
    authorities.connector.set_unreachable(true);
    let (_engine, app) = setup(&authorities).await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["connection"]["state"], "disconnected");
}

#[tokio::test]
async fn test_dispatch_view_before_and_after_poll() {
    let authorities = authorities();
    let (engine, app) = setup(&authorities).await;

    let (status, body) = send(&app, "GET", "/api/dispatch", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["success"].as_bool().unwrap());
    assert!(body["data"]["operation_id"].is_null());
    assert_eq!(body["data"]["resources"].as_array().unwrap().len(), 0);
    assert_eq!(body["data"]["poll_state"], "idle");

    engine.poll_once().await.unwrap();

    let (status, body) = send(&app, "GET", "/api/dispatch", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["operation_id"], 7);
    assert_eq!(body["data"]["poll_state"], "operation_loaded");
    assert_eq!(body["data"]["connection"]["state"], "connected");

    let resources = body["data"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["resource"]["id"], "A");
    assert_eq!(resources[0]["can_dispatch"], true);
    assert_eq!(resources[1]["resource"]["id"], "B");
    assert_eq!(resources[1]["can_dispatch"], false);
}

#[tokio::test]
async fn test_toggle_dispatch_on_loaded_operation() {
    let authorities = authorities();
    let (engine, app) = setup(&authorities).await;
    engine.poll_once().await.unwrap();

    let (status, body) = send(&app, "POST", "/api/dispatch/resources/A/toggle", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Dispatched");
    assert_eq!(authorities.dispositioning.dispatched_ids(7), vec!["A".to_string()]);
    assert!(engine.snapshot().item("A").unwrap().dispatched);

    let (status, body) = send(&app, "POST", "/api/dispatch/resources/A/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Recalled");
    assert!(authorities.dispositioning.dispatched_ids(7).is_empty());
}

#[tokio::test]
async fn test_toggle_dispatch_error_mapping() {
    let authorities = authorities();
    let (engine, app) = setup(&authorities).await;

    // 尚未加载警情
    let (status, body) = send(&app, "POST", "/api/dispatch/resources/A/toggle", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "STALE_REFERENCE");

    engine.poll_once().await.unwrap();

    let (status, body) = send(&app, "POST", "/api/dispatch/resources/Z/toggle", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "RESOURCE_NOT_IN_VIEW");

    let (status, body) = send(&app, "POST", "/api/dispatch/resources/B/toggle", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "RESOURCE_ALARMED");
    assert_eq!(authorities.dispositioning.dispatch_calls(), 0);

    authorities
        .dispositioning
        .set_failure(Some(InjectedFailure::Connectivity));
    let (status, body) = send(&app, "POST", "/api/dispatch/resources/A/toggle", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "CONNECTIVITY");
    assert!(!engine.snapshot().item("A").unwrap().dispatched);
}

#[tokio::test]
async fn test_operation_resources() {
    let authorities = authorities();
    authorities.dispositioning.set_dispatched(7, &["A"]);
    let (_engine, app) = setup(&authorities).await;

    let (status, body) = send(&app, "GET", "/api/operations/7/resources", None).await;

    assert_eq!(status, StatusCode::OK);
    let resources = body["data"].as_array().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["dispatched"], true);
    assert_eq!(resources[1]["can_dispatch"], false);

    let (status, body) = send(&app, "GET", "/api/operations/99/resources", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "NOT_FOUND");
}

#[tokio::test]
async fn test_operation_resources_rejects_invalid_id() {
    let authorities = authorities();
    let (_engine, app) = setup(&authorities).await;

    let (status, _) = send(&app, "GET", "/api/operations/abc/resources", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_toggle_operation_resource_without_loaded_view() {
    let authorities = authorities();
    let (engine, app) = setup(&authorities).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/operations/7/resources/A/toggle",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Dispatched");
    assert_eq!(authorities.dispositioning.dispatched_ids(7), vec!["A".to_string()]);
    assert!(engine.snapshot().operation_id.is_none());
}

#[tokio::test]
async fn test_push_event_webhook() {
    let authorities = authorities();
    let (engine, app) = setup(&authorities).await;
    engine.poll_once().await.unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/api/events",
        Some(json!({
            "type": "disposition",
            "operation_id": 7,
            "resource_id": "A",
            "action": "dispatch"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(body["success"].as_bool().unwrap());

    let (status, _) = send(
        &app,
        "POST",
        "/api/events",
        Some(json!({ "type": "unknown_event", "operation_id": 7 })),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_cors_preflight_allows_only_dispatch_methods() {
    let authorities = authorities();
    let (engine, app) = setup(&authorities).await;

    let preflight = |method: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/api/dispatch/resources/A/toggle")
            .header("origin", "http://leitstelle.local")
            .header("access-control-request-method", method)
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight("POST")).await.unwrap();
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let methods = headers["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("POST"));
    assert!(!methods.contains("DELETE"));
    assert_eq!(headers["access-control-allow-headers"], "content-type");

    // CORS disabled: no allow headers at all
    let plain = create_app(AppState::new(engine), false);
    let response = plain.oneshot(preflight("POST")).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
