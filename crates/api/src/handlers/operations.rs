use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

use alarm_domain::OperationId;

use crate::{
    error::{ApiError, ApiResult},
    response::success,
    routes::AppState,
};

/// 获取指定警情的资源视图
pub async fn get_operation_resources(
    State(state): State<AppState>,
    Path(id): Path<OperationId>,
) -> ApiResult<impl IntoResponse> {
    let items = state
        .engine
        .operation_resources(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(success(items))
}

/// 切换指定警情上资源的派遣状态
pub async fn toggle_operation_resource(
    State(state): State<AppState>,
    Path((id, resource_id)): Path<(OperationId, String)>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .engine
        .toggle_operation_resource(id, &resource_id)
        .await?;
    Ok(success(outcome))
}
