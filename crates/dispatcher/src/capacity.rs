use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use syncer_domain::Capacity;

/// 外部服务容量的共享视图
///
/// 只有 dispatcher（以及启动时的首次探测）写入，组装器在每次刷新前读取。
/// 两个字段各自原子更新，读取方只依赖 `batch_size`。
/// 每次写入都会通知 `subscribe` 返回的接收端。
#[derive(Debug, Clone, Default)]
pub struct SharedCapacity {
    inner: Arc<CapacityInner>,
}

#[derive(Debug)]
struct CapacityInner {
    batch_size: AtomicU64,
    poll_interval_nanos: AtomicU64,
    changed: watch::Sender<()>,
}

impl Default for CapacityInner {
    fn default() -> Self {
        let (changed, _) = watch::channel(());
        Self {
            batch_size: AtomicU64::new(0),
            poll_interval_nanos: AtomicU64::new(0),
            changed,
        }
    }
}

impl SharedCapacity {
    pub fn new(capacity: Capacity) -> Self {
        let shared = Self::default();
        shared.store(capacity);
        shared
    }

    pub fn store(&self, capacity: Capacity) {
        let nanos = u64::try_from(capacity.poll_interval.as_nanos()).unwrap_or(u64::MAX);
        self.inner
            .poll_interval_nanos
            .store(nanos, Ordering::Release);
        self.inner
            .batch_size
            .store(capacity.batch_size, Ordering::Release);
        self.inner.changed.send_replace(());
    }

    /// 订阅容量变更，订阅前的写入不会触发
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.inner.changed.subscribe()
    }

    pub fn load(&self) -> Capacity {
        Capacity {
            batch_size: self.batch_size(),
            poll_interval: Duration::from_nanos(
                self.inner.poll_interval_nanos.load(Ordering::Acquire),
            ),
        }
    }

    pub fn batch_size(&self) -> u64 {
        self.inner.batch_size.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let shared = SharedCapacity::default();
        assert_eq!(shared.load(), Capacity::unavailable());

        let capacity = Capacity::new(5, Duration::from_secs(10));
        shared.store(capacity);
        assert_eq!(shared.load(), capacity);
        assert_eq!(shared.batch_size(), 5);
    }

    #[test]
    fn test_clones_share_state() {
        let shared = SharedCapacity::new(Capacity::new(2, Duration::from_millis(500)));
        let reader = shared.clone();
        shared.store(Capacity::new(7, Duration::from_millis(500)));
        assert_eq!(reader.batch_size(), 7);
    }

    #[tokio::test]
    async fn test_store_notifies_subscribers() {
        let shared = SharedCapacity::default();
        let mut changes = shared.clone().subscribe();
        assert!(!changes.has_changed().unwrap());

        shared.store(Capacity::new(3, Duration::from_secs(1)));
        assert!(changes.has_changed().unwrap());
        changes.changed().await.unwrap();
        assert!(!changes.has_changed().unwrap());
    }
}
