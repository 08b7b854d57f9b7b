//! # 数据库模块
//!
//! 持久化协作方的两种实现：按需建立单连接的 MySQL 存储，以及从 JSON
//! 夹具加载的内存存储。两者都遵守注入的故障模拟开关。

pub mod connection;
pub mod memory;
pub mod models;
pub mod queries;

// 重新导出主要类型
pub use connection::{DatabaseConfig, LazyConnection};
pub use memory::{InMemoryPatientStore, StoreFixtures};
pub use queries::MySqlPatientStore;
