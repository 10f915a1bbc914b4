//! 暂存写入的仓储数据访问核心（ddd-repository）
//!
//! 在应用与存储驱动之间提供一层“先暂存、后提交”的仓储：
//! - 工作单元（`unit_of_work`）：以激活记录树登记变更，提交时按深度优先顺序执行；
//! - 仓库（`warehouse`）：每种实体类型一份暂存状态，读取时把存储结果与暂存变更合并，
//!   保证同一工作单元内读到自己尚未提交的写入；
//! - 全局条件（`filter`/`propagator`）：向查询图的每个节点恰好一次附加强制条件；
//! - 仓储门面（`repository`）：串联上述组件，并通过 `eventing` 对外通知。
//!
//! 存储后端通过 `persist::StorageDriver` 注入；`InMemoryStorage` 可用于测试与调试。
//!
//! 典型用法：
//! 1. 使用 `#[entity]` 宏定义实体；
//! 2. 创建 `UnitOfWork`，为每种实体构造 `Repository`；
//! 3. 读写仓储（读取可见本工作单元内的暂存写入）；
//! 4. `commit` 落库，或 `discard` 丢弃。
//!
pub mod config;
pub mod entity;
pub mod error;
pub mod eventing;
pub mod filter;
pub mod persist;
pub mod propagator;
pub mod query;
pub mod repository;
pub mod unit_of_work;
pub mod value;
pub mod warehouse;

#[cfg(test)]
mod test_support;

// 允许在本 crate 内部通过 ::ddd_repository 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::ddd_repository 路径。
extern crate self as ddd_repository;
