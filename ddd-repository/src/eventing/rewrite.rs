//! 查询结果改写装饰器
//!
//! 包装任意 `EventAnnouncer`，写操作原样委托；
//! 查询结果先交给内层改写，再由 `rewrite` 闭包二次改写。
//!
use super::EventAnnouncer;
use crate::{
    entity::Entity,
    error::DomainResult as Result,
    query::{ModifyExpression, Query},
};
use async_trait::async_trait;

pub struct QueryRewriteAnnouncer<A, F> {
    inner: A,
    rewrite: F,
}

impl<A, F> QueryRewriteAnnouncer<A, F> {
    pub fn new(inner: A, rewrite: F) -> Self {
        Self { inner, rewrite }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<E, A, F> EventAnnouncer<E> for QueryRewriteAnnouncer<A, F>
where
    E: Entity,
    A: EventAnnouncer<E>,
    F: Fn(&Query, &[E]) -> Option<Vec<E>> + Send + Sync,
{
    async fn publish_save(&self, entities: &[E]) -> Result<()> {
        self.inner.publish_save(entities).await
    }

    async fn publish_remove(&self, entities: &[E]) -> Result<()> {
        self.inner.publish_remove(entities).await
    }

    async fn publish_remove_by_condition(&self, query: &Query) -> Result<()> {
        self.inner.publish_remove_by_condition(query).await
    }

    async fn publish_modify(&self, modify: &ModifyExpression, query: &Query) -> Result<()> {
        self.inner.publish_modify(modify, query).await
    }

    async fn publish_query(&self, query: &Query, results: &[E]) -> Result<Option<Vec<E>>> {
        let upstream = self.inner.publish_query(query, results).await?;
        let rewritten = (self.rewrite)(query, upstream.as_deref().unwrap_or(results));
        Ok(rewritten.or(upstream))
    }
}
