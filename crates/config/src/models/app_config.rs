use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{client::ClientConfig, observability::ObservabilityConfig};
use crate::validation::ConfigValidator;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SyncerConfig {
    pub client: ClientConfig,
    pub observability: ObservabilityConfig,
}

impl SyncerConfig {
    /// 加载配置：默认值 -> TOML文件 -> SYNCER_ 环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("client.endpoint", "https://external-service.local")?
            .set_default("client.buffer_input", 50)?
            .set_default("client.buffer_batch", 10)?
            .set_default("client.buffer_resort", 3)?
            .set_default("client.check_status_interval_ms", 5000)?
            .set_default("client.shutdown_timeout_seconds", 30)?
            .set_default("observability.log_level", "info")?
            .set_default("observability.log_format", "pretty")?;

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/syncer.toml", "syncer.toml"];

            if let Some(path) = default_paths.iter().find(|path| Path::new(path).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SYNCER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SyncerConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: SyncerConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for SyncerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.client.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}
