use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use syncer_config::ClientConfig;
use syncer_domain::{DispatchOutcome, ExternalService, PendingBatch, ServiceError};

use crate::capacity::SharedCapacity;
use crate::counters::SyncCounters;
use crate::hooks::SyncHooks;

/// Dispatcher 当前所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// 从待发送通道读取批次并同步到外部服务
    Consuming,
    /// 批次被拒绝后，按固定间隔重新探测外部服务容量
    Polling,
}

/// 批次同步器
///
/// 单个长期任务在 `Consuming` 与 `Polling` 两个状态间循环，
/// 共享容量不可用时从 `Polling` 开始：
///
/// - 成功：计数并回调，继续消费
/// - 被拒绝：批次送入回流通道，计数并回调，转入 `Polling`，
///   在外部服务重新报告可用容量之前不再读取新的批次
/// - 其他错误：记录日志、计入丢弃并回调，批次不再重试，继续消费
///
/// 同一时间只有一个进行中的外部调用。
pub struct BatchDispatcher<T> {
    service: Arc<dyn ExternalService<T>>,
    batch_rx: mpsc::Receiver<PendingBatch<T>>,
    resort_tx: mpsc::Sender<PendingBatch<T>>,
    capacity: SharedCapacity,
    counters: SyncCounters,
    hooks: SyncHooks<T>,
    check_status_interval: Duration,
    max_resubmissions: Option<u32>,
    state: DispatcherState,
}

impl<T: Send + Sync + 'static> BatchDispatcher<T> {
    pub fn new(
        service: Arc<dyn ExternalService<T>>,
        batch_rx: mpsc::Receiver<PendingBatch<T>>,
        resort_tx: mpsc::Sender<PendingBatch<T>>,
        capacity: SharedCapacity,
        counters: SyncCounters,
        hooks: SyncHooks<T>,
        config: &ClientConfig,
    ) -> Self {
        // 启动探测未拿到容量时组装器不会切出批次，需要先探测
        let state = if capacity.load().is_available() {
            DispatcherState::Consuming
        } else {
            DispatcherState::Polling
        };

        Self {
            service,
            batch_rx,
            resort_tx,
            capacity,
            counters,
            hooks,
            check_status_interval: config.check_status_interval(),
            max_resubmissions: config.max_resubmissions,
            state,
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("初始化批次同步，初始状态: {:?}", self.state);

        loop {
            let next = match self.state {
                DispatcherState::Consuming => self.consume(&mut shutdown_rx).await,
                DispatcherState::Polling => self.poll_limits(&mut shutdown_rx).await,
            };

            match next {
                Some(state) => {
                    debug!("批次同步状态切换: {:?} -> {:?}", self.state, state);
                    self.state = state;
                }
                None => break,
            }
        }

        info!("批次同步任务已退出");
    }

    /// 持续消费直到出现拒绝；返回 None 表示应当退出
    async fn consume(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Option<DispatcherState> {
        loop {
            let batch = tokio::select! {
                batch = self.batch_rx.recv() => batch,
                _ = shutdown_rx.recv() => {
                    info!("批次同步任务收到停止信号");
                    return None;
                }
            };

            let Some(mut batch) = batch else {
                info!("待发送通道已关闭，批次同步任务退出");
                return None;
            };

            batch.attempts += 1;
            debug!("收到批次: {}，第 {} 次尝试", batch.len(), batch.attempts);

            let result = tokio::select! {
                result = self.service.process(&batch.items) => result,
                _ = shutdown_rx.recv() => {
                    warn!("同步过程中收到停止信号，放弃批次: {}", batch.len());
                    return None;
                }
            };

            match DispatchOutcome::from(result) {
                DispatchOutcome::Success => {
                    let total = self.counters.record_success();
                    debug!("批次已同步: {}，累计成功 {}", batch.len(), total);
                    self.hooks.on_success(&batch.items);
                }
                DispatchOutcome::Rejected => {
                    warn!("外部服务拒绝批次: {}，暂停同步", batch.len());
                    self.handle_rejected(batch, shutdown_rx).await?;
                    return Some(DispatcherState::Polling);
                }
                DispatchOutcome::Other(details) => {
                    error!(
                        "外部服务返回未分类错误，丢弃批次: {}，错误: {}",
                        batch.len(),
                        details
                    );
                    self.counters.record_discarded();
                    self.hooks.on_exception(&ServiceError::Other(details));
                }
            }
        }
    }

    async fn handle_rejected(
        &mut self,
        batch: PendingBatch<T>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Option<()> {
        let size = batch.len();

        match self.max_resubmissions {
            Some(max) if batch.attempts > max => {
                error!(
                    "批次已回流 {} 次，超过上限 {}，丢弃批次: {}",
                    batch.resubmissions(),
                    max,
                    size
                );
                self.counters.record_discarded();
            }
            _ => {
                tokio::select! {
                    result = self.resort_tx.send(batch) => {
                        if result.is_err() {
                            warn!("回流通道已关闭，丢弃批次: {}", size);
                            return None;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        warn!("等待回流时收到停止信号，丢弃批次: {}", size);
                        return None;
                    }
                }
                debug!(
                    "批次等待回流: {}，回流通道积压: {}",
                    size,
                    self.resort_tx.max_capacity() - self.resort_tx.capacity()
                );
            }
        }

        self.counters.record_exception();
        self.hooks.on_exception(&ServiceError::Blocked);
        Some(())
    }

    /// 每个检查间隔探测一次容量，直到两个值都为正
    async fn poll_limits(
        &mut self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Option<DispatcherState> {
        let period = self.check_status_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.recv() => {
                    info!("容量探测收到停止信号");
                    return None;
                }
            }

            debug!("检查外部服务状态");
            let limits = tokio::select! {
                limits = self.service.get_limits() => limits,
                _ = shutdown_rx.recv() => {
                    info!("容量探测收到停止信号");
                    return None;
                }
            };

            if limits.is_available() {
                self.capacity.store(limits);
                info!(
                    "外部服务已恢复，批次大小: {}，处理间隔: {:?}",
                    limits.batch_size, limits.poll_interval
                );
                return Some(DispatcherState::Consuming);
            }

            warn!("外部服务不可用");
        }
    }
}
