use serde::{Deserialize, Serialize};

/// 轮询循环配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// 轮询间隔（毫秒）
    pub interval_ms: u64,
    /// 候选警情的最大时长（分钟），默认7天
    pub max_age_minutes: i64,
    /// 只查询未确认的警情
    pub only_non_acknowledged: bool,
    /// 每次查询的警情数量，目前只支持最新的一个
    pub operation_limit: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_age_minutes: 7 * 24 * 60,
            only_non_acknowledged: true,
            operation_limit: 1,
        }
    }
}

impl PollerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_ms == 0 {
            return Err(anyhow::anyhow!("轮询间隔必须大于0"));
        }

        if self.max_age_minutes <= 0 {
            return Err(anyhow::anyhow!("警情最大时长必须大于0"));
        }

        if self.operation_limit == 0 {
            return Err(anyhow::anyhow!("警情查询数量必须大于0"));
        }

        Ok(())
    }
}

/// 远程服务地址配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    pub operation_service_url: String,
    pub dispositioning_service_url: String,
    pub catalog_service_url: String,
    /// 传输层超时（秒），引擎本身不做超时控制
    pub request_timeout_seconds: u64,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            operation_service_url: "http://localhost:60001".to_string(),
            dispositioning_service_url: "http://localhost:60002".to_string(),
            catalog_service_url: "http://localhost:60003".to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl AuthorityConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let urls = [
            ("operation_service_url", &self.operation_service_url),
            ("dispositioning_service_url", &self.dispositioning_service_url),
            ("catalog_service_url", &self.catalog_service_url),
        ];

        for (name, url) in urls {
            if url.is_empty() {
                return Err(anyhow::anyhow!("{} 不能为空", name));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("{} 必须以 http:// 或 https:// 开头: {}", name, url));
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        Ok(())
    }
}
