//! 仓储事件通知协议
//!
//! 写操作完成暂存后通知观察者；读操作合并完成后经 `publish_query`
//! 交给订阅方改写结果（例如按权限过滤），返回 `Some` 时以其替换合并结果。
//!
use crate::{
    entity::Entity,
    error::DomainResult as Result,
    query::{ModifyExpression, Query},
};
use async_trait::async_trait;

#[async_trait]
pub trait EventAnnouncer<E: Entity>: Send + Sync {
    async fn publish_save(&self, _entities: &[E]) -> Result<()> {
        Ok(())
    }

    async fn publish_remove(&self, _entities: &[E]) -> Result<()> {
        Ok(())
    }

    async fn publish_remove_by_condition(&self, _query: &Query) -> Result<()> {
        Ok(())
    }

    async fn publish_modify(&self, _modify: &ModifyExpression, _query: &Query) -> Result<()> {
        Ok(())
    }

    /// 返回 `Some` 时替换查询结果，`None` 保持原结果
    async fn publish_query(&self, _query: &Query, _results: &[E]) -> Result<Option<Vec<E>>> {
        Ok(None)
    }
}

/// 不做任何通知
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnnouncer;

#[async_trait]
impl<E: Entity> EventAnnouncer<E> for NoopAnnouncer {}
