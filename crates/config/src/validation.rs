// 验证模块

use crate::{ConfigError, ConfigResult};

pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// 常用字段校验
pub struct ValidationUtils;

impl ValidationUtils {
    /// 验证字符串非空
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// 验证通道容量
    pub fn validate_capacity(capacity: usize, field_name: &str) -> ConfigResult<()> {
        if capacity == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        Ok(())
    }

    /// 验证毫秒间隔，上限一小时
    pub fn validate_interval_ms(interval_ms: u64, field_name: &str) -> ConfigResult<()> {
        if interval_ms == 0 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if interval_ms > 3_600_000 {
            return Err(ConfigError::Validation(format!(
                "{field_name} must be less than or equal to 3600000 ms"
            )));
        }
        Ok(())
    }
}
