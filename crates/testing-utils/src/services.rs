use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use syncer_domain::{Batch, Capacity, ExternalService, ServiceError};

/// 始终可用、始终接受批次的外部服务
#[derive(Debug, Clone)]
pub struct CoolService {
    pub process_limit: u64,
    pub duration: Duration,
}

impl CoolService {
    pub fn new(process_limit: u64, duration: Duration) -> Self {
        Self {
            process_limit,
            duration,
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> ExternalService<T> for CoolService {
    async fn get_limits(&self) -> Capacity {
        Capacity::new(self.process_limit, self.duration)
    }

    async fn process(&self, _batch: &Batch<T>) -> Result<(), ServiceError> {
        Ok(())
    }
}

/// 报告可用容量，却拒绝所有批次的外部服务
#[derive(Debug, Clone)]
pub struct BadService {
    pub process_limit: u64,
    pub duration: Duration,
}

impl BadService {
    pub fn new(process_limit: u64, duration: Duration) -> Self {
        Self {
            process_limit,
            duration,
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> ExternalService<T> for BadService {
    async fn get_limits(&self) -> Capacity {
        Capacity::new(self.process_limit, self.duration)
    }

    async fn process(&self, _batch: &Batch<T>) -> Result<(), ServiceError> {
        Err(ServiceError::Blocked)
    }
}

/// 十分之一概率不可用、五分之一概率拒绝批次的外部服务
#[derive(Debug, Clone)]
pub struct RandomService {
    pub process_limit: u64,
    pub duration: Duration,
}

impl RandomService {
    pub fn new(process_limit: u64, duration: Duration) -> Self {
        Self {
            process_limit,
            duration,
        }
    }
}

fn roll(upper: u32) -> u32 {
    rand::rng().random_range(0..upper)
}

#[async_trait]
impl<T: Send + Sync + 'static> ExternalService<T> for RandomService {
    async fn get_limits(&self) -> Capacity {
        if roll(10) == 3 {
            debug!("模拟外部服务暂时不可用");
            return Capacity::unavailable();
        }
        Capacity::new(self.process_limit, self.duration)
    }

    async fn process(&self, batch: &Batch<T>) -> Result<(), ServiceError> {
        if roll(5) == 3 {
            debug!("模拟外部服务拒绝批次: {}", batch.len());
            return Err(ServiceError::Blocked);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cool_service() {
        let service = CoolService::new(2, Duration::from_secs(10));
        let limits = ExternalService::<u32>::get_limits(&service).await;
        assert_eq!(limits, Capacity::new(2, Duration::from_secs(10)));
        assert!(service.process(&vec![1u32, 2]).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_service() {
        let service = BadService::new(3, Duration::from_secs(10));
        let limits = ExternalService::<u32>::get_limits(&service).await;
        assert!(limits.is_available());
        assert_eq!(
            service.process(&vec![1u32, 2, 3]).await,
            Err(ServiceError::Blocked)
        );
    }

    #[tokio::test]
    async fn test_random_service_outcomes_are_classified() {
        let service = RandomService::new(4, Duration::from_secs(1));
        for _ in 0..50 {
            let limits = ExternalService::<u32>::get_limits(&service).await;
            assert!(limits == Capacity::unavailable() || limits.batch_size == 4);

            let result = service.process(&vec![1u32]).await;
            assert!(matches!(result, Ok(()) | Err(ServiceError::Blocked)));
        }
    }
}
