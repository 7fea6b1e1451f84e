use axum::{extract::State, response::IntoResponse, Json};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use alarm_domain::PushEvent;

use crate::{
    error::{ApiError, ApiResult},
    response::accepted,
    routes::AppState,
};

/// 接收远程服务推送的事件，转交派遣引擎异步处理
pub async fn receive_push_event(
    State(state): State<AppState>,
    Json(event): Json<PushEvent>,
) -> ApiResult<impl IntoResponse> {
    debug!(
        operation_id = event.operation_id(),
        event_type = event.event_type(),
        "收到推送事件"
    );

    match state.engine.event_sender().try_send(event) {
        Ok(()) => Ok(accepted("事件已接收")),
        Err(TrySendError::Full(_)) => {
            warn!("推送事件队列已满，拒绝事件");
            Err(ApiError::Unavailable("推送事件队列已满".to_string()))
        }
        Err(TrySendError::Closed(_)) => {
            Err(ApiError::Unavailable("派遣引擎未在运行".to_string()))
        }
    }
}
