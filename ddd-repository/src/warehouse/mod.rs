//! 仓库（Warehouse）：每个工作单元内每种实体类型一个实例
//!
//! - `Warehouse`：同步的暂存状态与合并算法；
//! - `RepositoryWarehouse`：连接存储驱动，提供异步读取、聚合与提交执行。
//!
mod repository_warehouse;
mod staged;

pub use repository_warehouse::RepositoryWarehouse;
pub use staged::Warehouse;
