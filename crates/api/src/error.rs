use alarm_core::{DispatchError, ErrorClass};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("派遣错误: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("未找到资源")]
    NotFound,

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("服务不可用: {0}")]
    Unavailable(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Dispatch(DispatchError::ResourceNotInView { .. }) => StatusCode::NOT_FOUND,
            ApiError::Dispatch(e) => match e.class() {
                ErrorClass::StaleReference => StatusCode::CONFLICT,
                ErrorClass::Connectivity => StatusCode::SERVICE_UNAVAILABLE,
                ErrorClass::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Dispatch(DispatchError::ResourceNotInView { .. }) => "RESOURCE_NOT_IN_VIEW",
            ApiError::Dispatch(DispatchError::ResourceAlarmed { .. }) => "RESOURCE_ALARMED",
            ApiError::Dispatch(e) => match e.class() {
                ErrorClass::StaleReference => "STALE_REFERENCE",
                ErrorClass::Connectivity => "CONNECTIVITY",
                ErrorClass::Fatal => "INTERNAL_ERROR",
            },
            ApiError::NotFound => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unavailable(_) => "UNAVAILABLE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, suggestions) = match &self {
            ApiError::Dispatch(DispatchError::ResourceAlarmed { id }) => (
                format!("资源 {id} 已由报警机构调派"),
                vec!["报警机构调派的资源不能手动派遣或召回".to_string()],
            ),
            ApiError::Dispatch(e) if e.is_stale_reference() => (
                e.to_string(),
                vec!["派遣视图已变化，请刷新后重试".to_string()],
            ),
            ApiError::Dispatch(e) if e.is_connectivity() => (
                e.to_string(),
                vec![
                    "与远程服务的连接中断，将在下一个轮询周期自动重连".to_string(),
                    "查看 GET /api/dispatch 中的连接状态".to_string(),
                ],
            ),
            ApiError::Dispatch(_) => (
                "系统内部错误".to_string(),
                vec!["如果问题持续存在，请联系系统管理员".to_string()],
            ),
            ApiError::NotFound => (
                "请求的资源不存在".to_string(),
                vec!["请检查警情ID是否正确".to_string()],
            ),
            ApiError::BadRequest(msg) => (
                format!("请求参数错误: {msg}"),
                vec!["请检查请求格式和参数".to_string()],
            ),
            ApiError::Unavailable(msg) => (msg.clone(), vec![]),
        };

        if status.is_server_error() {
            tracing::error!("请求处理失败: {}", self);
        }

        let body = Json(json!({
            "error": {
                "message": message,
                "type": self.error_type(),
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = vec![
            (ApiError::Dispatch(DispatchError::NoCurrentOperation), StatusCode::CONFLICT),
            (
                ApiError::Dispatch(DispatchError::ResourceAlarmed { id: "A".to_string() }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Dispatch(DispatchError::ResourceNotInView { id: "A".to_string() }),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Dispatch(DispatchError::Communication("reset".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Dispatch(DispatchError::Protocol("bad".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::NotFound, StatusCode::NOT_FOUND),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error}");
        }
    }
}
