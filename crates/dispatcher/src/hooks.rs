use std::fmt;
use std::sync::Arc;

use syncer_domain::ServiceError;

/// 批次成功同步后的回调
pub type SuccessCallback<T> = Arc<dyn Fn(&[T]) + Send + Sync>;

/// 外部服务返回错误时的回调
pub type ExceptionCallback = Arc<dyn Fn(&ServiceError) + Send + Sync>;

/// 调用方注册的观察回调，启动前设置，之后只读
pub struct SyncHooks<T> {
    success: Option<SuccessCallback<T>>,
    exception: Option<ExceptionCallback>,
}

impl<T> SyncHooks<T> {
    pub fn new() -> Self {
        Self {
            success: None,
            exception: None,
        }
    }

    pub fn with_success(mut self, callback: SuccessCallback<T>) -> Self {
        self.success = Some(callback);
        self
    }

    pub fn with_exception(mut self, callback: ExceptionCallback) -> Self {
        self.exception = Some(callback);
        self
    }

    pub(crate) fn on_success(&self, batch: &[T]) {
        if let Some(callback) = &self.success {
            callback(batch);
        }
    }

    pub(crate) fn on_exception(&self, err: &ServiceError) {
        if let Some(callback) = &self.exception {
            callback(err);
        }
    }
}

impl<T> Default for SyncHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SyncHooks<T> {
    fn clone(&self) -> Self {
        Self {
            success: self.success.clone(),
            exception: self.exception.clone(),
        }
    }
}

impl<T> fmt::Debug for SyncHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHooks")
            .field("success", &self.success.is_some())
            .field("exception", &self.exception.is_some())
            .finish()
    }
}
