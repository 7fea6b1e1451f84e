//! # Alarm API
//!
//! 派遣同步服务的HTTP接口，供网页等展示层读取派遣视图、切换派遣状态，
//! 并接收远程服务推送的事件。
//!
//! ## 端点
//!
//! - `GET /health`
//! - `GET /api/dispatch`: 当前派遣视图和连接状态
//! - `POST /api/dispatch/resources/{resource_id}/toggle`
//! - `GET /api/operations/{id}/resources`
//! - `POST /api/operations/{id}/resources/{resource_id}/toggle`
//! - `POST /api/events`: 推送事件回调

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use routes::{create_app, create_routes, AppState};
