//! 仓储门面（repository）
//!
//! - `Repository`：单实体类型的读写入口，串联全局条件、仓库合并、事件通知与工作单元；
//! - `RelationRepository`：以关系实体保存关联对的仓储；
//! - `ThreeRelationRepository`：以关系实体保存三元组的仓储。
//!
mod aggregate_repository;
mod relation_repository;
mod three_relation_repository;

pub use aggregate_repository::Repository;
pub use relation_repository::{RelationMapping, RelationRepository};
pub use three_relation_repository::{ThreeRelationMapping, ThreeRelationRepository};
