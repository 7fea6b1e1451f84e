use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 派遣同步错误类型定义
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("连接错误: {0}")]
    Connectivity(String),

    #[error("服务端点不可达: {endpoint}")]
    EndpointNotFound { endpoint: String },

    #[error("远程通信失败: {0}")]
    Communication(String),

    #[error("当前没有已加载的警情")]
    NoCurrentOperation,

    #[error("警情 {requested} 不是当前加载的警情 (当前: {current:?})")]
    StaleOperation {
        requested: i64,
        current: Option<i64>,
    },

    #[error("资源不在当前视图中: {id}")]
    ResourceNotInView { id: String },

    #[error("资源 {id} 已由报警机构调派，不能手动派遣或召回")]
    ResourceAlarmed { id: String },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("协议错误: {0}")]
    Protocol(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误分类
///
/// 只区分三类：可恢复的连接故障、可忽略的过期引用、以及需要上报的致命错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// 连接丢失，下一个轮询周期重新绑定
    Connectivity,
    /// 引用了已不在视图中的警情或资源，记录日志后忽略
    StaleReference,
    /// 其他一切错误，不在本地恢复
    Fatal,
}

impl DispatchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DispatchError::Connectivity(_)
            | DispatchError::EndpointNotFound { .. }
            | DispatchError::Communication(_) => ErrorClass::Connectivity,
            DispatchError::NoCurrentOperation
            | DispatchError::StaleOperation { .. }
            | DispatchError::ResourceNotInView { .. }
            | DispatchError::ResourceAlarmed { .. } => ErrorClass::StaleReference,
            DispatchError::Serialization(_)
            | DispatchError::Configuration(_)
            | DispatchError::Protocol(_)
            | DispatchError::Internal(_) => ErrorClass::Fatal,
        }
    }

    pub fn is_connectivity(&self) -> bool {
        self.class() == ErrorClass::Connectivity
    }

    pub fn is_stale_reference(&self) -> bool {
        self.class() == ErrorClass::StaleReference
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        DispatchError::Serialization(err.to_string())
    }
}

/// 统一的Result类型
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
