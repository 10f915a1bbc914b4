use anyhow::Result as AnyResult;
use ddd_repository::filter::{
    GlobalConditionFilter, GlobalConditionFilterResult, GlobalConditionRegistry, QueryUsageScene,
};
use ddd_repository::persist::InMemoryStorage;
use ddd_repository::propagator::ConditionPropagator;
use ddd_repository::query::{Condition, JoinType, NodeId, Query, QueryNode};
use ddd_repository::repository::Repository;
use ddd_repository::unit_of_work::UnitOfWork;
use ddd_repository_macros::entity;
use std::sync::{Arc, Mutex};

#[entity(id = i64)]
struct Order {
    tenant: i64,
    total: i64,
}

fn tenant() -> Condition {
    Condition::equal("tenant", 1)
}

/// 记录每次解析请求的实体类型，并对所有节点附加租户条件
fn recording() -> (Arc<Mutex<Vec<String>>>, ConditionPropagator) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let resolver = move |f: &GlobalConditionFilter<'_>| -> Option<GlobalConditionFilterResult> {
        log.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(f.entity_type.to_string());
        Some(GlobalConditionFilterResult::and(tenant()))
    };
    (seen, ConditionPropagator::new(Arc::new(resolver)))
}

#[test]
fn shared_node_is_filtered_once() -> AnyResult<()> {
    let mut query = Query::for_entity("order");
    let customer = query.add_node(QueryNode::new("customer"));
    let line = query.add_node(QueryNode::new("line"));
    query.link_subquery(NodeId::ROOT, "lines", line)?;
    query.link_subquery(line, "buyer", customer)?;
    query.link_join(NodeId::ROOT, JoinType::Inner, vec![], customer)?;

    let (seen, propagator) = recording();
    let query = propagator.propagate(Some(query), "order", QueryUsageScene::Query);

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(seen, vec!["order", "line", "customer"]);
    let node = query.node(customer).expect("customer node");
    assert_eq!(node.condition(), Some(&tenant()));
    Ok(())
}

#[test]
fn join_cycle_terminates() -> AnyResult<()> {
    let mut query = Query::for_entity("order");
    let customer = query.add_node(QueryNode::new("customer"));
    let region = query.add_node(QueryNode::new("region"));
    query.link_join(NodeId::ROOT, JoinType::Left, vec![], customer)?;
    query.link_join(customer, JoinType::Left, vec![], region)?;
    query.link_join(region, JoinType::Left, vec![], NodeId::ROOT)?;

    let (seen, propagator) = recording();
    propagator.propagate(Some(query), "order", QueryUsageScene::Count);

    let seen = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(seen, vec!["order", "customer", "region"]);
    Ok(())
}

#[tokio::test]
async fn scene_specific_rules_apply_to_matching_operations() -> AnyResult<()> {
    let storage = Arc::new(InMemoryStorage::with_rows([
        Order {
            id: 1,
            tenant: 1,
            total: 10,
        },
        Order {
            id: 2,
            tenant: 2,
            total: 20,
        },
    ]));
    let mut registry = GlobalConditionRegistry::new();
    registry.register_for_scene(
        "order",
        QueryUsageScene::Remove,
        GlobalConditionFilterResult::and(tenant()),
    );
    let uow = Arc::new(UnitOfWork::new());
    let repo = Repository::new(uow.clone(), storage.clone())?
        .with_propagator(ConditionPropagator::new(Arc::new(registry)));

    // 删除全部只作用于租户 1，查询不受限制
    repo.remove_by(None).await?;
    assert_eq!(repo.count(None).await?, 1);
    uow.commit().await?;

    let left: Vec<i64> = storage.rows().iter().map(|o| o.tenant).collect();
    assert_eq!(left, vec![2]);
    Ok(())
}
