//! # Syncer Testing Utils
//!
//! 外部服务的模拟实现和测试辅助工具，供各 crate 的测试以及命令行演示使用。
//!
//! - **Simulated Services**: 固定容量的 `CoolService` / `BadService`，以及随机失败的 `RandomService`
//! - **Mocks**: 记录每次调用、可编排返回结果的 `RecordingService`
//! - **Builders**: 测试用的客户端配置
//!
//! ```toml
//! [dev-dependencies]
//! syncer-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod mocks;
pub mod services;

pub use builders::*;
pub use mocks::*;
pub use services::*;
