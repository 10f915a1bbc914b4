/// 工作单元示例
/// 展示暂存写入的读后可见、全局条件、广播通知以及提交落库
use anyhow::Result as AnyResult;
use ddd_repository::eventing::BroadcastAnnouncer;
use ddd_repository::filter::{GlobalConditionFilterResult, GlobalConditionRegistry};
use ddd_repository::persist::InMemoryStorage;
use ddd_repository::propagator::ConditionPropagator;
use ddd_repository::query::{Condition, ModifyExpression, PagingFilter, Query};
use ddd_repository::repository::Repository;
use ddd_repository::unit_of_work::UnitOfWork;
use ddd_repository_macros::entity;
use futures_util::StreamExt;
use std::sync::Arc;

#[entity(id = i64)]
struct Order {
    customer: String,
    total: i64,
    archived: bool,
}

fn order(id: i64, customer: &str, total: i64) -> Order {
    Order {
        id,
        customer: customer.to_string(),
        total,
        archived: false,
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // 存储中已有两条订单，其中一条已归档
    let storage = Arc::new(InMemoryStorage::with_rows([
        order(1, "alice", 100),
        Order {
            archived: true,
            ..order(2, "bob", 300)
        },
    ]));

    // 全局条件：所有操作都看不到已归档订单
    let mut registry = GlobalConditionRegistry::new();
    registry.register(
        "order",
        GlobalConditionFilterResult::and(Condition::equal("archived", false)),
    );

    let announcer = BroadcastAnnouncer::new(32);
    let mut events = announcer.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(Ok(event)) = events.next().await {
            println!(
                "[event] {:?} {} {:?}",
                event.kind(),
                event.entity_type(),
                event.identities()
            );
        }
    });

    let uow = Arc::new(UnitOfWork::new());
    let orders = Repository::new(uow.clone(), storage.clone())?
        .with_propagator(ConditionPropagator::new(Arc::new(registry)))
        .with_announcer(Arc::new(announcer.clone()));

    orders.save(&[order(3, "carol", 50)]).await?;
    println!("sum before commit = {}", orders.sum::<i64>(None, "total").await?);

    orders
        .modify(
            ModifyExpression::new().add("total", 10),
            Some(Query::of::<Order>().equal("customer", "alice")),
        )
        .await?;

    let page = orders
        .get_paging(
            Some(Query::of::<Order>().order_by_desc("total")),
            PagingFilter::new(1, 10),
        )
        .await?;
    for item in &page.items {
        println!("visible: #{} {} {}", item.id, item.customer, item.total);
    }
    println!("avg = {:?}", orders.avg::<i64>(None, "total").await?);

    let summary = uow.commit().await?;
    println!(
        "committed: executed={}, skipped={}",
        summary.executed, summary.skipped
    );
    for row in storage.rows() {
        println!("stored: #{} {} {} archived={}", row.id, row.customer, row.total, row.archived);
    }

    drop(orders);
    drop(announcer);
    let _ = printer.await;
    Ok(())
}
