//! 持久化协议（persist）
//!
//! - `StorageDriver`：核心消费的存储驱动协议（读取、聚合与落库）；
//! - `InMemoryStorage`：内存实现，用于测试、示例与 `Detached` 模式。
//!
//! 具体存储后端（如关系型数据库）由上层实现 `StorageDriver` 并注入。
//!
mod memory;
mod storage;

pub use memory::InMemoryStorage;
pub use storage::StorageDriver;
