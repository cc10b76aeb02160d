pub mod app_config;
pub mod client;
pub mod observability;

pub use app_config::*;
pub use client::*;
pub use observability::*;
