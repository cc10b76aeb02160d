use async_trait::async_trait;
use thiserror::Error;

use crate::entities::Batch;
use crate::value_objects::Capacity;

/// 外部服务处理批次时返回的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// 服务过载，批次被拒绝，稍后可以重试
    #[error("批次被外部服务拒绝")]
    Blocked,
    /// 其他未分类错误
    #[error("外部服务错误: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

/// 可以批量处理条目的外部服务
///
/// `get_limits` 返回服务当前允许的批次大小与处理间隔，
/// 任意一项为零表示服务暂时不可用。
#[async_trait]
pub trait ExternalService<T>: Send + Sync {
    async fn get_limits(&self) -> Capacity;
    async fn process(&self, batch: &Batch<T>) -> Result<(), ServiceError>;
}
