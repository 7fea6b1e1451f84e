//! 派遣同步服务的基础设施层：统一错误类型、配置加载和日志初始化。

pub mod config;
pub mod errors;
pub mod logging;

pub use config::*;
pub use errors::*;
pub use logging::init_logging;
