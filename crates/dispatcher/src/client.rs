use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use syncer_config::{ClientConfig, ConfigValidator};
use syncer_domain::{
    Capacity, ChanStats, ExternalService, PendingBatch, ServiceError, SyncStats, SyncerError,
    SyncerResult,
};

use crate::assembler::BatchAssembler;
use crate::capacity::SharedCapacity;
use crate::counters::SyncCounters;
use crate::dispatcher::BatchDispatcher;
use crate::hooks::SyncHooks;
use crate::resorter::Resorter;
use crate::shutdown::ShutdownManager;

/// 客户端生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Created,
    Running,
    Stopped,
}

enum Lifecycle {
    Created,
    Running { handles: Vec<JoinHandle<()>> },
    Stopped,
}

impl Lifecycle {
    fn status(&self) -> ClientStatus {
        match self {
            Lifecycle::Created => ClientStatus::Created,
            Lifecycle::Running { .. } => ClientStatus::Running,
            Lifecycle::Stopped => ClientStatus::Stopped,
        }
    }
}

/// 启动后写入一次的通道发送端，用于投递条目和统计积压
struct ClientChannels<T> {
    input_tx: mpsc::Sender<T>,
    resort_tx: mpsc::Sender<PendingBatch<T>>,
    batch_tx: mpsc::Sender<PendingBatch<T>>,
}

fn depth<M>(sender: &mpsc::Sender<M>) -> usize {
    sender.max_capacity() - sender.capacity()
}

/// 自适应批量同步客户端
///
/// ```text
/// add_new_item -> input -> [BatchAssembler] -> batch -> [BatchDispatcher] -> 外部服务
///                                                ^               |
///                                                |               v 被拒绝
///                                           [Resorter] <----- resort
/// ```
pub struct SyncClient<T> {
    config: ClientConfig,
    service: Arc<dyn ExternalService<T>>,
    hooks: SyncHooks<T>,
    capacity: SharedCapacity,
    counters: SyncCounters,
    shutdown: ShutdownManager,
    lifecycle: Mutex<Lifecycle>,
    channels: OnceLock<ClientChannels<T>>,
}

impl<T: Send + Sync + 'static> SyncClient<T> {
    pub fn builder(config: ClientConfig) -> SyncClientBuilder<T> {
        SyncClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 启动同步器，重复调用不会产生任何效果
    ///
    /// 在启动任何后台任务之前先探测一次外部服务容量。
    pub async fn run(&self) -> SyncerResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Running { .. } => {
                debug!("同步器已在运行，忽略重复启动");
                return Ok(());
            }
            Lifecycle::Stopped => return Err(SyncerError::Shutdown),
            Lifecycle::Created => {}
        }

        info!("启动同步器，外部服务: {}", self.config.endpoint);

        let initial = self.service.get_limits().await;
        self.capacity.store(initial);
        if initial.is_available() {
            info!(
                "外部服务容量，批次大小: {}，处理间隔: {:?}",
                initial.batch_size, initial.poll_interval
            );
        } else {
            warn!(
                "启动时外部服务不可用，每 {:?} 探测一次容量，条目累积直到容量恢复",
                self.config.check_status_interval()
            );
        }

        let (input_tx, input_rx) = mpsc::channel(self.config.buffer_input);
        let (batch_tx, batch_rx) = mpsc::channel(self.config.buffer_batch);
        let (resort_tx, resort_rx) = mpsc::channel(self.config.buffer_resort);

        self.channels
            .set(ClientChannels {
                input_tx,
                resort_tx: resort_tx.clone(),
                batch_tx: batch_tx.clone(),
            })
            .map_err(|_| SyncerError::Internal("同步通道已经初始化".to_string()))?;

        let assembler = BatchAssembler::new(input_rx, batch_tx.clone(), self.capacity.clone());
        let dispatcher = BatchDispatcher::new(
            Arc::clone(&self.service),
            batch_rx,
            resort_tx,
            self.capacity.clone(),
            self.counters.clone(),
            self.hooks.clone(),
            &self.config,
        );
        let resorter = Resorter::new(resort_rx, batch_tx);

        let handles = vec![
            tokio::spawn(assembler.run(self.shutdown.subscribe())),
            tokio::spawn(dispatcher.run(self.shutdown.subscribe())),
            tokio::spawn(resorter.run(self.shutdown.subscribe())),
        ];

        *lifecycle = Lifecycle::Running { handles };
        info!("同步器已启动");
        Ok(())
    }

    /// 投递一个条目，输入通道已满时等待
    pub async fn add_new_item(&self, item: T) -> SyncerResult<()> {
        if self.shutdown.is_shutdown() {
            return Err(SyncerError::Shutdown);
        }
        let channels = self.channels.get().ok_or(SyncerError::NotStarted)?;

        let mut shutdown_rx = self.shutdown.subscribe();
        tokio::select! {
            result = channels.input_tx.send(item) => {
                result.map_err(|_| SyncerError::channel_closed("input"))
            }
            _ = shutdown_rx.recv() => Err(SyncerError::Shutdown),
        }
    }

    /// 输入、回流、待发送三个通道的当前积压
    pub fn get_chan_stats(&self) -> ChanStats {
        self.channels
            .get()
            .map(|channels| ChanStats {
                input: depth(&channels.input_tx),
                resort: depth(&channels.resort_tx),
                batch: depth(&channels.batch_tx),
            })
            .unwrap_or_default()
    }

    pub fn get_stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// 当前生效的外部服务容量
    pub fn capacity(&self) -> Capacity {
        self.capacity.load()
    }

    pub async fn status(&self) -> ClientStatus {
        self.lifecycle.lock().await.status()
    }

    /// 通知所有后台任务退出并等待，超过 `shutdown_timeout_seconds` 后强制终止
    ///
    /// 内存中尚未同步的条目和批次会被丢弃。
    pub async fn shutdown(&self) -> SyncerResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        let handles = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running { handles } => handles,
            Lifecycle::Created | Lifecycle::Stopped => {
                self.shutdown.shutdown();
                return Ok(());
            }
        };

        self.shutdown.shutdown();

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        match tokio::time::timeout(self.config.shutdown_timeout(), join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!("后台任务异常退出: {}", e);
                    }
                }
            }
            Err(_) => {
                warn!("等待后台任务退出超时，强制终止");
                for handle in abort_handles {
                    handle.abort();
                }
                return Err(SyncerError::timeout_error("等待后台任务退出超时"));
            }
        }

        let leftover = self.get_chan_stats();
        if leftover != ChanStats::default() {
            warn!(
                "同步器关闭时仍有积压，输入: {}，回流: {}，待发送: {}",
                leftover.input, leftover.resort, leftover.batch
            );
        }

        let stats = self.get_stats();
        info!(
            "同步器已关闭，成功: {}，拒绝: {}，丢弃: {}",
            stats.success, stats.exceptions, stats.discarded
        );
        Ok(())
    }
}

impl<T> Drop for SyncClient<T> {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

/// `SyncClient` 构建器
pub struct SyncClientBuilder<T> {
    config: ClientConfig,
    service: Option<Arc<dyn ExternalService<T>>>,
    hooks: SyncHooks<T>,
}

impl<T: Send + Sync + 'static> SyncClientBuilder<T> {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            service: None,
            hooks: SyncHooks::new(),
        }
    }

    pub fn service(mut self, service: Arc<dyn ExternalService<T>>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.with_success(Arc::new(callback));
        self
    }

    pub fn on_exception<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ServiceError) + Send + Sync + 'static,
    {
        self.hooks = self.hooks.with_exception(Arc::new(callback));
        self
    }

    /// 未指定外部服务或配置无效时直接失败
    pub fn build(self) -> SyncerResult<SyncClient<T>> {
        let service = self.service.ok_or(SyncerError::ServiceNotFound)?;
        self.config
            .validate()
            .map_err(|e| SyncerError::config_error(e.to_string()))?;

        Ok(SyncClient {
            config: self.config,
            service,
            hooks: self.hooks,
            capacity: SharedCapacity::default(),
            counters: SyncCounters::default(),
            shutdown: ShutdownManager::new(),
            lifecycle: Mutex::new(Lifecycle::Created),
            channels: OnceLock::new(),
        })
    }
}
