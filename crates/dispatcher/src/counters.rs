use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use syncer_domain::SyncStats;

/// 同步结果计数器，仅由 dispatcher 写入
#[derive(Debug, Clone, Default)]
pub struct SyncCounters {
    inner: Arc<CountersInner>,
}

#[derive(Debug, Default)]
struct CountersInner {
    success: AtomicU64,
    exceptions: AtomicU64,
    discarded: AtomicU64,
}

impl SyncCounters {
    pub fn record_success(&self) -> u64 {
        self.inner.success.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_exception(&self) -> u64 {
        self.inner.exceptions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_discarded(&self) -> u64 {
        self.inner.discarded.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> SyncStats {
        SyncStats {
            success: self.inner.success.load(Ordering::Relaxed),
            exceptions: self.inner.exceptions.load(Ordering::Relaxed),
            discarded: self.inner.discarded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_monotonic() {
        let counters = SyncCounters::default();
        assert_eq!(counters.record_success(), 1);
        assert_eq!(counters.record_success(), 2);
        assert_eq!(counters.record_exception(), 1);
        assert_eq!(counters.record_discarded(), 1);

        let stats = counters.clone().snapshot();
        assert_eq!(stats.success, 2);
        assert_eq!(stats.exceptions, 1);
        assert_eq!(stats.discarded, 1);
    }
}
