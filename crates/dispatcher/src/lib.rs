//! 自适应批量同步
//!
//! 条目经输入通道进入，由组装器按外部服务当前允许的批次大小打包，
//! dispatcher 逐批同步到外部服务。被拒绝的批次经回流通道重新排队，
//! dispatcher 随即暂停消费并周期性探测外部服务容量，确认恢复后继续。

pub mod assembler;
pub mod capacity;
pub mod client;
pub mod counters;
pub mod dispatcher;
pub mod hooks;
pub mod resorter;
pub mod shutdown;

pub use assembler::BatchAssembler;
pub use capacity::SharedCapacity;
pub use client::{ClientStatus, SyncClient, SyncClientBuilder};
pub use counters::SyncCounters;
pub use dispatcher::{BatchDispatcher, DispatcherState};
pub use hooks::{ExceptionCallback, SuccessCallback, SyncHooks};
pub use resorter::Resorter;
pub use shutdown::ShutdownManager;
