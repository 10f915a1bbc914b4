use anyhow::Result as AnyResult;
use ddd_repository::eventing::{
    BroadcastAnnouncer, EventAnnouncer, QueryRewriteAnnouncer, RepositoryEventKind,
};
use ddd_repository::persist::InMemoryStorage;
use ddd_repository::query::{Condition, ModifyExpression, Query};
use ddd_repository::repository::Repository;
use ddd_repository::unit_of_work::UnitOfWork;
use ddd_repository_macros::entity;
use futures_util::StreamExt;
use std::sync::Arc;

#[entity(id = i64)]
struct Order {
    total: i64,
}

#[tokio::test]
async fn writes_are_broadcast_to_subscribers() -> AnyResult<()> {
    let announcer = BroadcastAnnouncer::new(16);
    let mut events = announcer.subscribe();
    let uow = Arc::new(UnitOfWork::new());
    let repo = Repository::new(uow, Arc::new(InMemoryStorage::<Order>::new()))?
        .with_announcer(Arc::new(announcer.clone()));

    repo.save(&[Order { id: 1, total: 10 }]).await?;
    repo.modify(ModifyExpression::new().set("total", 0), None)
        .await?;
    repo.remove_by(Some(
        Query::of::<Order>().and(Condition::greater_than("total", 5)),
    ))
    .await?;

    let mut kinds = Vec::new();
    for _ in 0..3 {
        let event = events.next().await.expect("event")?;
        assert_eq!(event.entity_type(), "order");
        kinds.push(event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            RepositoryEventKind::Saved,
            RepositoryEventKind::Modified,
            RepositoryEventKind::RemovedByCondition,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn query_results_can_be_rewritten() -> AnyResult<()> {
    let hide_large = |_: &Query, items: &[Order]| -> Option<Vec<Order>> {
        Some(items.iter().filter(|o| o.total <= 100).cloned().collect())
    };
    let announcer: Arc<dyn EventAnnouncer<Order>> = Arc::new(QueryRewriteAnnouncer::new(
        BroadcastAnnouncer::new(4),
        hide_large,
    ));
    let storage = Arc::new(InMemoryStorage::with_rows([
        Order { id: 1, total: 50 },
        Order { id: 2, total: 500 },
    ]));
    let repo = Repository::new(Arc::new(UnitOfWork::new()), storage)?.with_announcer(announcer);

    let ids: Vec<i64> = repo.get_list(None).await?.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![1]);
    // 聚合不经过改写
    assert_eq!(repo.count(None).await?, 2);
    Ok(())
}
