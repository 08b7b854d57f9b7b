//! # 运维支撑模块
//!
//! 分层配置加载与校验、日志初始化以及结构化操作日志。

pub mod config;
pub mod logging;

pub use config::{AppConfig, ConfigValidator, DatabaseSettings, FixtureSettings, IndexSettings, LoggingConfig};
pub use logging::{init_logging, log_operation, OperationRecord, OperationStatus};
