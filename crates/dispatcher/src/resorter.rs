use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use syncer_domain::PendingBatch;

/// 把被拒绝的批次原样送回待发送通道
pub struct Resorter<T> {
    resort_rx: mpsc::Receiver<PendingBatch<T>>,
    batch_tx: mpsc::Sender<PendingBatch<T>>,
}

impl<T: Send + 'static> Resorter<T> {
    pub fn new(
        resort_rx: mpsc::Receiver<PendingBatch<T>>,
        batch_tx: mpsc::Sender<PendingBatch<T>>,
    ) -> Self {
        Self {
            resort_rx,
            batch_tx,
        }
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("批次回流任务已启动");

        loop {
            let batch = tokio::select! {
                batch = self.resort_rx.recv() => batch,
                _ = shutdown_rx.recv() => {
                    info!("批次回流任务收到停止信号");
                    break;
                }
            };

            let Some(batch) = batch else {
                info!("回流通道已关闭，批次回流任务退出");
                break;
            };

            let size = batch.len();
            let attempts = batch.attempts;
            tokio::select! {
                result = self.batch_tx.send(batch) => {
                    if result.is_err() {
                        warn!("待发送通道已关闭，丢弃回流批次: {}", size);
                        break;
                    }
                }
                _ = shutdown_rx.recv() => {
                    warn!("批次回流任务在发送时收到停止信号，丢弃回流批次: {}", size);
                    break;
                }
            }
            debug!("批次已回流至待发送通道: {}，已尝试 {} 次", size, attempts);
        }
    }
}
