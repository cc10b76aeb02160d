use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use syncer_domain::{Batch, PendingBatch};

use crate::capacity::SharedCapacity;

/// 批次组装器
///
/// 从输入通道逐条读取，累积到当前允许的批次大小后整批发送到待发送通道。
/// 阈值在每次追加后以及容量更新时重新读取；未满的批次不会按时间强制发送。
pub struct BatchAssembler<T> {
    input_rx: mpsc::Receiver<T>,
    batch_tx: mpsc::Sender<PendingBatch<T>>,
    capacity: SharedCapacity,
    capacity_rx: watch::Receiver<()>,
    pending: Batch<T>,
}

impl<T: Send + 'static> BatchAssembler<T> {
    pub fn new(
        input_rx: mpsc::Receiver<T>,
        batch_tx: mpsc::Sender<PendingBatch<T>>,
        capacity: SharedCapacity,
    ) -> Self {
        let capacity_rx = capacity.subscribe();
        Self {
            input_rx,
            batch_tx,
            capacity,
            capacity_rx,
            pending: Vec::new(),
        }
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("批次组装任务已启动");

        loop {
            tokio::select! {
                item = self.input_rx.recv() => {
                    let Some(item) = item else {
                        info!("输入通道已关闭，批次组装任务退出");
                        break;
                    };
                    self.pending.push(item);
                }
                Ok(()) = self.capacity_rx.changed() => {
                    debug!(
                        "外部服务容量已更新: {}，当前累积 {} 条",
                        self.capacity.batch_size(),
                        self.pending.len()
                    );
                }
                _ = shutdown_rx.recv() => {
                    info!("批次组装任务收到停止信号");
                    break;
                }
            }

            if !self.flush_ready(&mut shutdown_rx).await {
                return;
            }
        }

        if !self.pending.is_empty() {
            warn!("批次组装任务退出，丢弃 {} 条未满批次中的条目", self.pending.len());
        }
    }

    /// 发送所有已满的批次；返回 false 表示应当退出
    async fn flush_ready(&mut self, shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
        while let Some(batch) = self.take_ready_batch() {
            let size = batch.len();
            tokio::select! {
                result = self.batch_tx.send(PendingBatch::new(batch)) => {
                    if result.is_err() {
                        warn!("待发送通道已关闭，丢弃 {} 条已组装条目", size);
                        return false;
                    }
                }
                _ = shutdown_rx.recv() => {
                    warn!("批次组装任务在发送时收到停止信号，丢弃 {} 条已组装条目", size);
                    return false;
                }
            }
            debug!("已发送就绪批次: {}", size);
        }
        true
    }

    /// 阈值为零（容量未知）时从不切出批次，也不会切出空批次
    fn take_ready_batch(&mut self) -> Option<Batch<T>> {
        let threshold = usize::try_from(self.capacity.batch_size()).unwrap_or(usize::MAX);
        if threshold == 0 || self.pending.len() < threshold {
            return None;
        }

        if self.pending.len() == threshold {
            return Some(std::mem::take(&mut self.pending));
        }

        // 阈值在累积过程中被调低
        Some(self.pending.drain(..threshold).collect())
    }
}
