use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ports::ServiceError;

/// 外部服务通告的处理能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capacity {
    /// 每批允许的条目数
    pub batch_size: u64,
    /// 批次之间的处理间隔
    pub poll_interval: Duration,
}

impl Capacity {
    pub fn new(batch_size: u64, poll_interval: Duration) -> Self {
        Self {
            batch_size,
            poll_interval,
        }
    }

    /// 服务不可用时返回的 (0, 0)
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.batch_size > 0 && !self.poll_interval.is_zero()
    }
}

/// 单次下游调用的分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success,
    Rejected,
    Other(String),
}

impl From<Result<(), ServiceError>> for DispatchOutcome {
    fn from(result: Result<(), ServiceError>) -> Self {
        match result {
            Ok(()) => DispatchOutcome::Success,
            Err(ServiceError::Blocked) => DispatchOutcome::Rejected,
            Err(ServiceError::Other(details)) => DispatchOutcome::Other(details),
        }
    }
}
