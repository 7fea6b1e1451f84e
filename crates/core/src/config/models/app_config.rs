use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    poller_authority::{AuthorityConfig, PollerConfig},
};

/// 默认配置文件搜索路径
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/dispatch.toml",
    "dispatch.toml",
    "/etc/alarm-dispatch/config.toml",
];

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub authorities: AuthorityConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Built-in defaults
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: DISPATCH, separator: `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults = AppConfig::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("poller.interval_ms", defaults.poller.interval_ms)?
            .set_default("poller.max_age_minutes", defaults.poller.max_age_minutes)?
            .set_default(
                "poller.only_non_acknowledged",
                defaults.poller.only_non_acknowledged,
            )?
            .set_default(
                "poller.operation_limit",
                defaults.poller.operation_limit as u64,
            )?
            .set_default(
                "authorities.operation_service_url",
                defaults.authorities.operation_service_url.as_str(),
            )?
            .set_default(
                "authorities.dispositioning_service_url",
                defaults.authorities.dispositioning_service_url.as_str(),
            )?
            .set_default(
                "authorities.catalog_service_url",
                defaults.authorities.catalog_service_url.as_str(),
            )?
            .set_default(
                "authorities.request_timeout_seconds",
                defaults.authorities.request_timeout_seconds,
            )?
            .set_default("api.enabled", defaults.api.enabled)?
            .set_default("api.bind_address", defaults.api.bind_address.as_str())?
            .set_default("api.cors_enabled", defaults.api.cors_enabled)?
            .set_default(
                "observability.log_level",
                defaults.observability.log_level.as_str(),
            )?
            .set_default("observability.log_format", "pretty")?;

        match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow::anyhow!("配置文件不存在: {}", path));
                }
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
            None => {
                if let Some(path) = DEFAULT_CONFIG_PATHS
                    .iter()
                    .find(|path| Path::new(path).exists())
                {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("DISPATCH")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.poller.validate().context("轮询配置验证失败")?;
        self.authorities
            .validate()
            .context("远程服务配置验证失败")?;
        self.api.validate().context("API配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        Ok(())
    }
}
