use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncerError {
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("外部服务未配置")]
    ServiceNotFound,
    #[error("同步客户端尚未启动")]
    NotStarted,
    #[error("通道已关闭: {0}")]
    ChannelClosed(String),
    #[error("同步客户端已关闭")]
    Shutdown,
    #[error("操作超时: {0}")]
    Timeout(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SyncerResult<T> = Result<T, SyncerError>;

impl SyncerError {
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn channel_closed<S: Into<String>>(channel: S) -> Self {
        Self::ChannelClosed(channel.into())
    }
    pub fn timeout_error<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }
    /// 启动阶段即应终止的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncerError::Configuration(_) | SyncerError::ServiceNotFound | SyncerError::Internal(_)
        )
    }
    pub fn user_message(&self) -> &str {
        match self {
            SyncerError::Configuration(_) => "同步器配置有误",
            SyncerError::ServiceNotFound => "未指定外部服务",
            SyncerError::NotStarted => "同步器尚未启动，请先调用 run",
            SyncerError::Shutdown | SyncerError::ChannelClosed(_) => "同步器已停止，无法继续提交",
            SyncerError::Timeout(_) => "操作超时，请稍后重试",
            SyncerError::Internal(_) => "系统繁忙，请稍后重试",
        }
    }
}

impl From<anyhow::Error> for SyncerError {
    fn from(err: anyhow::Error) -> Self {
        SyncerError::Internal(err.to_string())
    }
}
