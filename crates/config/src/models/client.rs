use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};
use crate::ConfigResult;

/// 同步客户端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// 外部服务地址，仅用于日志
    pub endpoint: String,
    /// 输入通道容量（条目）
    pub buffer_input: usize,
    /// 待发送通道容量（批次）
    pub buffer_batch: usize,
    /// 回流通道容量（批次）
    pub buffer_resort: usize,
    /// 服务被拒绝后重新探测容量的间隔（毫秒）
    pub check_status_interval_ms: u64,
    /// 同一批次最多回流次数，None 表示不限制
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resubmissions: Option<u32>,
    /// 关闭时等待后台任务退出的时间（秒）
    pub shutdown_timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://external-service.local".to_string(),
            buffer_input: 50,
            buffer_batch: 10,
            buffer_resort: 3,
            check_status_interval_ms: 5000,
            max_resubmissions: None,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl ClientConfig {
    pub fn check_status_interval(&self) -> Duration {
        Duration::from_millis(self.check_status_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl ConfigValidator for ClientConfig {
    fn validate(&self) -> ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.endpoint, "client.endpoint")?;
        ValidationUtils::validate_capacity(self.buffer_input, "client.buffer_input")?;
        ValidationUtils::validate_capacity(self.buffer_batch, "client.buffer_batch")?;
        ValidationUtils::validate_capacity(self.buffer_resort, "client.buffer_resort")?;
        ValidationUtils::validate_interval_ms(
            self.check_status_interval_ms,
            "client.check_status_interval_ms",
        )?;

        if self.shutdown_timeout_seconds == 0 {
            return Err(crate::ConfigError::Validation(
                "client.shutdown_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
