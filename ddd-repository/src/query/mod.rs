//! 查询模型
//!
//! - `Condition`：条件树，可在内存中对实体求值；
//! - `Query`：节点图（子查询/连接可共享节点或成环），附带排序与分页；
//! - `ModifyExpression`：按条件批量修改的字段表达式；
//! - `Paging`：分页结果。
//!
mod condition;
mod graph;
mod modify;
mod paging;

pub use condition::{CompareOperator, Condition, QueryOperator};
pub use graph::{JoinField, JoinItem, JoinType, NodeId, Query, QueryNode, SortEntry, Subquery};
pub use modify::{ModifyEntry, ModifyExpression, ModifyOperation};
pub use paging::{Paging, PagingFilter};
