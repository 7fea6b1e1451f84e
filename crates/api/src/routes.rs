use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use alarm_dispatcher::DispatchEngine;

use crate::handlers::{
    dispatch::{get_dispatch_view, toggle_dispatch},
    events::receive_push_event,
    health::health_check,
    operations::{get_operation_resources, toggle_operation_resource},
};
use crate::middleware::{cors_layer, request_logging, trace_layer};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DispatchEngine>,
}

impl AppState {
    pub fn new(engine: Arc<DispatchEngine>) -> Self {
        Self { engine }
    }
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 当前派遣视图
        .route("/api/dispatch", get(get_dispatch_view))
        .route(
            "/api/dispatch/resources/{resource_id}/toggle",
            post(toggle_dispatch),
        )
        // 指定警情
        .route("/api/operations/{id}/resources", get(get_operation_resources))
        .route(
            "/api/operations/{id}/resources/{resource_id}/toggle",
            post(toggle_operation_resource),
        )
        // 推送事件回调
        .route("/api/events", post(receive_push_event))
        .with_state(state)
}

/// 创建带中间件的完整应用
pub fn create_app(state: AppState, cors_enabled: bool) -> Router {
    let router = create_routes(state)
        .layer(from_fn(request_logging))
        .layer(trace_layer());

    if cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}
