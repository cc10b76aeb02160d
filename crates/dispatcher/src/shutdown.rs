use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

/// 优雅关闭管理器
///
/// 组装器、dispatcher、回流任务以及 `add_new_item` 在每个阻塞点订阅同一个信号。
pub struct ShutdownManager {
    /// 关闭信号发送器
    shutdown_tx: broadcast::Sender<()>,
    /// 是否已经关闭
    is_shutdown: Arc<AtomicBool>,
}

impl ShutdownManager {
    /// 创建新的关闭管理器
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            shutdown_tx,
            is_shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        // 先订阅再检查标志，避免错过订阅前刚发出的信号
        let rx = self.shutdown_tx.subscribe();
        if self.is_shutdown() {
            // 如果已经关闭，创建一个立即触发的接收器
            let (tx, rx) = broadcast::channel(1);
            let _ = tx.send(());
            return rx;
        }
        rx
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            debug!("关闭管理器已经触发过关闭");
            return;
        }

        info!("触发同步器关闭");
        let subscriber_count = self.shutdown_tx.receiver_count();
        debug!("发送关闭信号给 {} 个订阅者", subscriber_count);

        // 发送关闭信号，忽略错误（可能没有接收者）
        let _ = self.shutdown_tx.send(());
    }

    /// 检查是否已经关闭
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ShutdownManager {
    fn clone(&self) -> Self {
        Self {
            shutdown_tx: self.shutdown_tx.clone(),
            is_shutdown: Arc::clone(&self.is_shutdown),
        }
    }
}
