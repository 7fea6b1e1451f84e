use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;

use alarm_dispatcher::PollState;
use alarm_domain::{ConnectionState, DispatchSnapshot};

use crate::{error::ApiResult, response::success, routes::AppState};

/// 派遣视图响应
#[derive(Debug, Serialize)]
pub struct DispatchViewResponse {
    #[serde(flatten)]
    pub snapshot: DispatchSnapshot,
    pub connection: ConnectionState,
    pub poll_state: String,
}

fn poll_state_name(state: PollState) -> String {
    match state {
        PollState::Idle => "idle".to_string(),
        PollState::OperationLoaded(_) => "operation_loaded".to_string(),
        PollState::ErrorBackoff => "error_backoff".to_string(),
    }
}

/// 获取当前派遣视图
pub async fn get_dispatch_view(State(state): State<AppState>) -> impl IntoResponse {
    let response = DispatchViewResponse {
        snapshot: state.engine.snapshot(),
        connection: state.engine.connection_state(),
        poll_state: poll_state_name(state.engine.poll_state()),
    };
    success(response)
}

/// 切换当前警情上资源的派遣状态
pub async fn toggle_dispatch(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state.engine.toggle_dispatch(&resource_id).await?;
    Ok(success(outcome))
}
