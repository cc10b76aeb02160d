//! 可编排的外部服务测试替身

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use syncer_domain::{Batch, Capacity, ExternalService, ServiceError};

/// 记录每次调用的外部服务
///
/// 先按顺序消费预设结果，耗尽后返回 `fallback`。
/// 使用 `gated` 创建时，每次 `process` 都需要先通过 `release` 放行。
pub struct RecordingService<T> {
    limits: Mutex<Capacity>,
    script: Mutex<VecDeque<Result<(), ServiceError>>>,
    fallback: Mutex<Result<(), ServiceError>>,
    batches: Mutex<Vec<Batch<T>>>,
    limit_queries: AtomicUsize,
    gate: Option<Semaphore>,
}

impl<T: Clone> RecordingService<T> {
    pub fn new(limits: Capacity) -> Self {
        Self {
            limits: Mutex::new(limits),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Ok(())),
            batches: Mutex::new(Vec::new()),
            limit_queries: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// 批次大小为 `batch_size`、始终接受的服务
    pub fn accepting(batch_size: u64) -> Self {
        Self::new(Capacity::new(batch_size, Duration::from_secs(10)))
    }

    /// 批次大小为 `batch_size`、始终拒绝的服务
    pub fn rejecting(batch_size: u64) -> Self {
        Self::accepting(batch_size).with_fallback(Err(ServiceError::Blocked))
    }

    pub fn with_script(self, outcomes: Vec<Result<(), ServiceError>>) -> Self {
        *self.script.lock().unwrap() = outcomes.into();
        self
    }

    pub fn with_fallback(self, outcome: Result<(), ServiceError>) -> Self {
        *self.fallback.lock().unwrap() = outcome;
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub fn set_limits(&self, limits: Capacity) {
        *self.limits.lock().unwrap() = limits;
    }

    pub fn set_fallback(&self, outcome: Result<(), ServiceError>) {
        *self.fallback.lock().unwrap() = outcome;
    }

    /// 按调用顺序返回所有收到的批次
    pub fn batches(&self) -> Vec<Batch<T>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn process_calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn limit_queries(&self) -> usize {
        self.limit_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> ExternalService<T> for RecordingService<T> {
    async fn get_limits(&self) -> Capacity {
        self.limit_queries.fetch_add(1, Ordering::SeqCst);
        *self.limits.lock().unwrap()
    }

    async fn process(&self, batch: &Batch<T>) -> Result<(), ServiceError> {
        self.batches.lock().unwrap().push(batch.clone());

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}
