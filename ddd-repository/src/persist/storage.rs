//! 存储驱动协议
//!
//! 核心只通过该协议访问后端存储；驱动自身负责方言、连接与重试策略。
//! 任何错误都被视为不透明失败并原样向上传播。
//!
use crate::{
    entity::{DataLifeSource, Entity, Identity},
    error::DomainResult as Result,
    query::{ModifyExpression, Paging, Query},
    value::Value,
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait StorageDriver<E: Entity>: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<Option<E>>;

    async fn fetch_many(&self, query: &Query) -> Result<Vec<E>>;

    /// 按 `query.paging()` 分页；未设置时返回全部结果作为第一页
    async fn fetch_paging(&self, query: &Query) -> Result<Paging<E>>;

    async fn exists(&self, query: &Query) -> Result<bool>;

    async fn count(&self, query: &Query) -> Result<u64>;

    async fn max(&self, query: &Query, field: &str) -> Result<Option<Value>>;

    async fn min(&self, query: &Query, field: &str) -> Result<Option<Value>>;

    /// 无匹配行时返回 `None`
    async fn sum(&self, query: &Query, field: &str) -> Result<Option<Value>>;

    /// `source` 为 `New` 时插入，`Update` 时更新
    async fn persist_save(&self, entity: &E, source: DataLifeSource) -> Result<()>;

    async fn persist_remove(&self, identity: &Identity) -> Result<()>;

    async fn persist_remove_by_condition(&self, query: &Query) -> Result<()>;

    async fn persist_modify(&self, modify: &ModifyExpression, query: &Query) -> Result<()>;
}

#[async_trait]
impl<E, T> StorageDriver<E> for Arc<T>
where
    E: Entity,
    T: StorageDriver<E> + ?Sized,
{
    async fn fetch(&self, query: &Query) -> Result<Option<E>> {
        (**self).fetch(query).await
    }

    async fn fetch_many(&self, query: &Query) -> Result<Vec<E>> {
        (**self).fetch_many(query).await
    }

    async fn fetch_paging(&self, query: &Query) -> Result<Paging<E>> {
        (**self).fetch_paging(query).await
    }

    async fn exists(&self, query: &Query) -> Result<bool> {
        (**self).exists(query).await
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        (**self).count(query).await
    }

    async fn max(&self, query: &Query, field: &str) -> Result<Option<Value>> {
        (**self).max(query, field).await
    }

    async fn min(&self, query: &Query, field: &str) -> Result<Option<Value>> {
        (**self).min(query, field).await
    }

    async fn sum(&self, query: &Query, field: &str) -> Result<Option<Value>> {
        (**self).sum(query, field).await
    }

    async fn persist_save(&self, entity: &E, source: DataLifeSource) -> Result<()> {
        (**self).persist_save(entity, source).await
    }

    async fn persist_remove(&self, identity: &Identity) -> Result<()> {
        (**self).persist_remove(identity).await
    }

    async fn persist_remove_by_condition(&self, query: &Query) -> Result<()> {
        (**self).persist_remove_by_condition(query).await
    }

    async fn persist_modify(&self, modify: &ModifyExpression, query: &Query) -> Result<()> {
        (**self).persist_modify(modify, query).await
    }
}
