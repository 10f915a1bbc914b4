//! 广播通知器（BroadcastAnnouncer）
//!
//! 基于 `tokio::sync::broadcast` 发布 `RepositoryEvent`：
//! - 写操作各发布一条事件；查询不发布；
//! - `subscribe` 返回 `'static` 事件流，便于在 `tokio::spawn` 中消费；
//! - 无订阅者时发送被忽略，不视为错误。
//!
use super::{EventAnnouncer, RepositoryEvent, RepositoryEventKind};
use crate::{
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    query::{ModifyExpression, Query},
};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone)]
pub struct BroadcastAnnouncer {
    tx: broadcast::Sender<RepositoryEvent>,
}

impl BroadcastAnnouncer {
    /// `capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> BoxStream<'static, Result<RepositoryEvent>> {
        let rx = self.tx.subscribe();
        let stream =
            BroadcastStream::new(rx).map(|r| r.map_err(|e| DomainError::announce(e.to_string())));
        Box::pin(stream)
    }

    fn send(&self, event: RepositoryEvent) {
        // 无订阅者时 send 返回错误，这里忽略
        let _ = self.tx.send(event);
    }
}

#[async_trait]
impl<E: Entity> EventAnnouncer<E> for BroadcastAnnouncer {
    async fn publish_save(&self, entities: &[E]) -> Result<()> {
        self.send(
            RepositoryEvent::builder()
                .entity_type(E::TYPE)
                .kind(RepositoryEventKind::Saved)
                .identities(entities.iter().map(|e| e.identity()).collect())
                .build(),
        );
        Ok(())
    }

    async fn publish_remove(&self, entities: &[E]) -> Result<()> {
        self.send(
            RepositoryEvent::builder()
                .entity_type(E::TYPE)
                .kind(RepositoryEventKind::Removed)
                .identities(entities.iter().map(|e| e.identity()).collect())
                .build(),
        );
        Ok(())
    }

    async fn publish_remove_by_condition(&self, query: &Query) -> Result<()> {
        self.send(
            RepositoryEvent::builder()
                .entity_type(E::TYPE)
                .kind(RepositoryEventKind::RemovedByCondition)
                .detail(query.to_string())
                .build(),
        );
        Ok(())
    }

    async fn publish_modify(&self, modify: &ModifyExpression, query: &Query) -> Result<()> {
        self.send(
            RepositoryEvent::builder()
                .entity_type(E::TYPE)
                .kind(RepositoryEventKind::Modified)
                .detail(format!("{query} set {modify}"))
                .build(),
        );
        Ok(())
    }
}
