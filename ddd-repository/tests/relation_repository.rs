use anyhow::Result as AnyResult;
use ddd_repository::error::{DomainError, DomainResult};
use ddd_repository::persist::InMemoryStorage;
use ddd_repository::query::{Condition, PagingFilter, Query};
use ddd_repository::repository::{RelationMapping, RelationRepository, Repository};
use ddd_repository::unit_of_work::UnitOfWork;
use ddd_repository_macros::entity;
use std::sync::Arc;

#[entity(name = "order_tag")]
struct OrderTag {
    order_id: i64,
    tag: String,
}

struct OrderTags;

impl RelationMapping for OrderTags {
    type First = i64;
    type Second = String;
    type Relation = OrderTag;

    fn to_relation(&self, first: &i64, second: &String) -> OrderTag {
        OrderTag {
            id: format!("{first}:{second}"),
            order_id: *first,
            tag: second.clone(),
        }
    }

    fn from_relation(&self, relation: &OrderTag) -> (i64, String) {
        (relation.order_id, relation.tag.clone())
    }

    fn first_condition(&self, first: &[i64]) -> Condition {
        Condition::in_list("order_id", first.iter().copied())
    }

    fn second_condition(&self, second: &[String]) -> Condition {
        Condition::in_list("tag", second.iter().cloned())
    }

    /// 订单查询按 `id` 表达，关系实体上对应 `order_id`
    fn first_condition_by_query(&self, query: &Query) -> Condition {
        order_side(query).rename_fields(&|field: &str| match field {
            "id" => "order_id".to_string(),
            other => other.to_string(),
        })
    }

    fn second_condition_by_query(&self, query: &Query) -> Condition {
        order_side(query).rename_fields(&|field: &str| match field {
            "name" => "tag".to_string(),
            other => other.to_string(),
        })
    }

    /// 标签形如 `"<order>:<tag>"` 时可单侧构造
    fn relation_by_second(&self, second: &String) -> DomainResult<OrderTag> {
        let (order, tag) = second
            .split_once(':')
            .ok_or_else(|| DomainError::validation(format!("`{second}` names no order")))?;
        let order_id = order
            .parse::<i64>()
            .map_err(|e| DomainError::validation(e.to_string()))?;
        Ok(self.to_relation(&order_id, &tag.to_string()))
    }
}

fn order_side(query: &Query) -> Condition {
    query.condition().cloned().unwrap_or_else(Condition::always)
}

fn tags() -> AnyResult<(Arc<UnitOfWork>, Arc<InMemoryStorage<OrderTag>>, RelationRepository<OrderTags>)> {
    let uow = Arc::new(UnitOfWork::new());
    let storage = Arc::new(InMemoryStorage::new());
    let inner = Repository::new(uow.clone(), storage.clone())?;
    Ok((uow, storage, RelationRepository::new(inner, OrderTags)))
}

#[tokio::test]
async fn pairs_are_queried_from_either_side() -> AnyResult<()> {
    let (_, _, repo) = tags()?;
    repo.save(&[
        (1, "urgent".to_string()),
        (1, "gift".to_string()),
        (2, "gift".to_string()),
    ])
    .await?;

    assert_eq!(repo.second_list_by_first(&[1]).await?, vec!["urgent", "gift"]);
    assert_eq!(repo.first_list_by_second(&["gift".to_string()]).await?, vec![1, 2]);

    let page = repo.get_paging(None, PagingFilter::new(1, 2)).await?;
    assert_eq!(page.total_count, 3);
    assert_eq!(page.items.len(), 3);
    Ok(())
}

#[tokio::test]
async fn removing_by_one_side_commits_only_the_survivors() -> AnyResult<()> {
    let (uow, storage, repo) = tags()?;
    repo.save(&[(1, "urgent".to_string()), (2, "gift".to_string())])
        .await?;
    repo.remove_by_first(&[1]).await?;

    let left = repo.get_list(None).await?;
    assert_eq!(left, vec![(2, "gift".to_string())]);

    uow.commit().await?;
    assert_eq!(storage.len(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_inputs_are_no_ops() -> AnyResult<()> {
    let (uow, _, repo) = tags()?;
    repo.save(&[]).await?;
    repo.remove(&[]).await?;
    repo.remove_by_first(&[]).await?;
    repo.remove_by_second(&[]).await?;
    repo.save_by_first(&[]).await?;
    assert_eq!(uow.pending_len(), 0);
    assert!(repo.second_list_by_first(&[]).await?.is_empty());
    assert!(repo.get(None).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn removing_by_an_order_query_rewrites_it_onto_the_relation() -> AnyResult<()> {
    let (uow, storage, repo) = tags()?;
    repo.save(&[
        (1, "urgent".to_string()),
        (2, "gift".to_string()),
        (3, "gift".to_string()),
    ])
    .await?;

    let orders = Query::for_entity("order").and(Condition::in_list("id", [1i64, 3]));
    repo.remove_by_first_query(&orders).await?;
    assert_eq!(repo.get_list(None).await?, vec![(2, "gift".to_string())]);

    let tags = Query::for_entity("tag").and(Condition::equal("name", "gift"));
    repo.remove_by_second_query(&tags).await?;
    assert!(repo.get_list(None).await?.is_empty());

    uow.commit().await?;
    assert!(storage.is_empty());
    Ok(())
}

#[tokio::test]
async fn one_sided_saves_use_the_mapping() -> AnyResult<()> {
    let (_, _, repo) = tags()?;
    repo.save_by_second(&["4:vip".to_string()]).await?;
    assert_eq!(repo.get_list(None).await?, vec![(4, "vip".to_string())]);

    let err = repo.save_by_first(&[4]).await.expect_err("unsupported");
    assert!(matches!(err, DomainError::InvalidState { .. }));

    let err = repo
        .save_by_second(&["untagged".to_string()])
        .await
        .expect_err("malformed");
    assert!(matches!(err, DomainError::Validation { .. }));
    Ok(())
}
