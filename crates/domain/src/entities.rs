use serde::{Deserialize, Serialize};

/// 一批待同步的条目，保持累积顺序
pub type Batch<T> = Vec<T>;

/// 在各阶段之间流转的批次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBatch<T> {
    pub items: Batch<T>,
    /// 已经提交给外部服务的次数
    pub attempts: u32,
}

impl<T> PendingBatch<T> {
    pub fn new(items: Batch<T>) -> Self {
        Self { items, attempts: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 回流次数，首次提交不计入
    pub fn resubmissions(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn into_items(self) -> Batch<T> {
        self.items
    }
}

/// 三个通道的当前积压
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChanStats {
    /// 输入通道中的条目数
    pub input: usize,
    /// 回流通道中的批次数
    pub resort: usize,
    /// 待发送通道中的批次数
    pub batch: usize,
}

impl ChanStats {
    pub fn as_array(&self) -> [usize; 3] {
        [self.input, self.resort, self.batch]
    }
}

/// 同步计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    pub success: u64,
    pub exceptions: u64,
    /// 因未分类错误或超过回流上限而丢弃的批次
    pub discarded: u64,
}
