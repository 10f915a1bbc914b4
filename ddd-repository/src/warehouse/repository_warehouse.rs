//! 仓储仓库：单类型暂存状态 + 存储驱动
//!
//! 读取顺序固定为：加锁生成下推查询 → 释放锁访问存储 → 加锁合并。
//! 锁从不跨越 `.await`；同一工作单元内对同一类型的调用在合并步骤上串行。
//!
use crate::{
    config::WarehouseConfig,
    entity::{DataLifeSource, Entity, Identity},
    error::{DomainError, DomainResult as Result},
    persist::{InMemoryStorage, StorageDriver},
    query::{Condition, ModifyExpression, Paging, Query},
    unit_of_work::{ActivationRecord, RecordExecutor, RecordOutcome},
    value::Numeric,
    warehouse::Warehouse,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct RepositoryWarehouse<E: Entity> {
    staged: Mutex<Warehouse<E>>,
    storage: Arc<dyn StorageDriver<E>>,
    config: WarehouseConfig,
}

impl<E: Entity> RepositoryWarehouse<E> {
    /// `Detached` 模式下忽略传入的驱动，改用本地内存存储承接提交
    pub fn new(storage: Arc<dyn StorageDriver<E>>, config: WarehouseConfig) -> Self {
        let storage: Arc<dyn StorageDriver<E>> = if config.is_detached() {
            Arc::new(InMemoryStorage::<E>::new())
        } else {
            storage
        };
        Self {
            staged: Mutex::new(Warehouse::new()),
            storage,
            config,
        }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// 在锁内读取暂存状态（测试与诊断用）
    pub fn inspect<R>(&self, f: impl FnOnce(&Warehouse<E>) -> R) -> R {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Warehouse<E>> {
        self.staged.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ---------- 生命周期与暂存 ----------

    pub fn life_source(&self, entity: &E) -> Option<DataLifeSource> {
        self.lock().life_source(&entity.identity())
    }

    pub fn set_life_source(&self, entity: &E, source: DataLifeSource) {
        self.lock().set_life_source(entity, source);
    }

    pub fn stage_save(&self, entities: &[E]) -> Result<Vec<Identity>> {
        self.lock().stage_save_all(entities)
    }

    pub fn stage_remove(&self, entities: &[E]) -> Vec<Identity> {
        self.lock().stage_remove_all(entities)
    }

    pub fn stage_remove_by_condition(&self, query: &Query) -> Vec<Identity> {
        self.lock().stage_remove_by_condition(query.condition())
    }

    pub fn stage_modify(&self, modify: ModifyExpression, query: &Query) {
        self.lock().stage_modify(modify, query.condition().cloned());
    }

    // ---------- 读取 ----------

    pub async fn get(&self, query: &Query) -> Result<Option<E>> {
        let store_query = self.lock().store_query(query);
        let row = self.storage.fetch(&store_query).await?;
        Ok(self.lock().merge_one(row, query))
    }

    pub async fn get_list(&self, query: &Query) -> Result<Vec<E>> {
        let store_query = self.lock().store_query(query);
        let rows = self.storage.fetch_many(&store_query).await?;
        Ok(self.lock().merge_many(rows, query))
    }

    pub async fn get_paging(&self, query: &Query) -> Result<Paging<E>> {
        let store_query = self.lock().store_query(query);
        let page = self.storage.fetch_paging(&store_query).await?;
        Ok(self.lock().merge_paging(page, query))
    }

    pub async fn exists(&self, query: &Query) -> Result<bool> {
        let store_query = {
            let staged = self.lock();
            if staged.has_staged_matching(query) {
                return Ok(true);
            }
            staged.store_query(query)
        };
        self.storage.exists(&store_query).await
    }

    pub async fn count(&self, query: &Query) -> Result<u64> {
        let store_query = self.lock().store_query(query);
        let store_count = self.storage.count(&store_query).await?;
        Ok(self.lock().count(store_count, query))
    }

    pub async fn sum<N: Numeric>(&self, query: &Query, field: &str) -> Result<N> {
        let store_query = self.lock().store_query(query);
        let store_sum = self.storage.sum(&store_query, field).await?;
        self.lock().sum(store_sum, query, field)
    }

    pub async fn max<N: Numeric>(&self, query: &Query, field: &str) -> Result<Option<N>> {
        let store_query = self.lock().store_query(query);
        let store_max = self.storage.max(&store_query, field).await?;
        self.lock().max(store_max, query, field)
    }

    pub async fn min<N: Numeric>(&self, query: &Query, field: &str) -> Result<Option<N>> {
        let store_query = self.lock().store_query(query);
        let store_min = self.storage.min(&store_query, field).await?;
        self.lock().min(store_min, query, field)
    }

    /// 平均值统一以 `f64` 计算；字段为空的行不计入，没有数据时返回 `None`
    pub async fn avg<N: Numeric>(&self, query: &Query, field: &str) -> Result<Option<f64>> {
        let valued = query.clone().and(Condition::not_null(field));
        let count = self.count(&valued).await?;
        if count == 0 {
            return Ok(None);
        }
        let sum = self.sum::<N>(&valued, field).await?;
        Ok(Some(sum.to_f64() / count as f64))
    }

    // ---------- 提交 ----------

    async fn flush_save(&self, identity: &Identity) -> Result<RecordOutcome> {
        let pending = self.lock().pending_save(identity);
        let Some((entity, source)) = pending else {
            tracing::debug!(%identity, "nothing pending, save skipped");
            return Ok(RecordOutcome::Skipped);
        };
        self.storage.persist_save(&entity, source).await?;
        self.lock().mark_saved(identity, entity);
        Ok(RecordOutcome::Executed)
    }

    async fn flush_remove(&self, identity: &Identity) -> Result<RecordOutcome> {
        let pending = self.lock().has_pending_removal(identity);
        if !pending {
            tracing::debug!(%identity, "removal already flushed, skipped");
            return Ok(RecordOutcome::Skipped);
        }
        self.storage.persist_remove(identity).await?;
        self.lock().mark_removal_flushed(identity);
        Ok(RecordOutcome::Executed)
    }

    async fn flush_remove_by_condition(&self, query: &Query) -> Result<RecordOutcome> {
        self.storage.persist_remove_by_condition(query).await?;
        self.lock().forget_removed_condition(query.condition());
        Ok(RecordOutcome::Executed)
    }

    async fn flush_modify(&self, modify: &ModifyExpression, query: &Query) -> Result<RecordOutcome> {
        self.storage.persist_modify(modify, query).await?;
        let condition: Option<&Condition> = query.condition();
        self.lock().forget_modification(modify, condition);
        Ok(RecordOutcome::Executed)
    }
}

#[async_trait]
impl<E: Entity> RecordExecutor for RepositoryWarehouse<E> {
    async fn execute(&self, record: &ActivationRecord) -> Result<RecordOutcome> {
        match record {
            ActivationRecord::Save { identity } => self.flush_save(identity).await,
            ActivationRecord::RemoveByIdentity { identity } => self.flush_remove(identity).await,
            ActivationRecord::RemoveByCondition { condition, .. } => {
                self.flush_remove_by_condition(condition).await
            }
            ActivationRecord::ModifyByCondition {
                modify, condition, ..
            } => self.flush_modify(modify, condition).await,
            ActivationRecord::Package { .. } => Err(DomainError::invalid_state(
                "package records are expanded before execution",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarehouseMode;
    use crate::query::Condition;
    use crate::test_support::Order;

    fn deferred(storage: &Arc<InMemoryStorage<Order>>) -> RepositoryWarehouse<Order> {
        RepositoryWarehouse::new(storage.clone(), WarehouseConfig::default())
    }

    #[tokio::test]
    async fn reads_see_staged_writes_without_extra_store_calls() {
        let storage = Arc::new(InMemoryStorage::with_rows([Order::new(1, "a", 100)]));
        let warehouse = deferred(&storage);
        warehouse
            .stage_save(&[Order::new(2, "b", 50)])
            .expect("stage");

        let all = Query::for_entity("order");
        let list = warehouse.get_list(&all).await.expect("list");
        assert_eq!(list.len(), 2);
        assert_eq!(storage.calls("fetch_many"), 1);

        let avg = warehouse.avg::<i64>(&all, "total").await.expect("avg");
        assert_eq!(avg, Some(75.0));
    }

    #[tokio::test]
    async fn avg_without_data_is_none() {
        let storage = Arc::new(InMemoryStorage::<Order>::new());
        let warehouse = deferred(&storage);
        let avg = warehouse
            .avg::<f64>(&Query::for_entity("order"), "total")
            .await
            .expect("avg");
        assert_eq!(avg, None);
    }

    #[tokio::test]
    async fn avg_skips_rows_without_a_value() {
        let storage = Arc::new(InMemoryStorage::with_rows([
            Order::new(1, "a", 10).with_discount(4),
            Order::new(2, "b", 10),
        ]));
        let warehouse = deferred(&storage);
        warehouse
            .stage_save(&[Order::new(3, "c", 10).with_discount(8), Order::new(4, "d", 10)])
            .expect("stage");

        let all = Query::for_entity("order");
        let avg = warehouse.avg::<i64>(&all, "discount").await.expect("avg");
        assert_eq!(avg, Some(6.0));

        let none = all.and(Condition::equal("customer", "b"));
        let avg = warehouse.avg::<i64>(&none, "discount").await.expect("avg");
        assert_eq!(avg, None);
    }

    #[tokio::test]
    async fn exists_short_circuits_on_staged_entries() {
        let storage = Arc::new(InMemoryStorage::<Order>::new());
        let warehouse = deferred(&storage);
        warehouse.stage_save(&[Order::new(1, "a", 1)]).expect("stage");

        let query = Query::for_entity("order").and(Condition::equal("customer", "a"));
        assert!(warehouse.exists(&query).await.expect("exists"));
        assert_eq!(storage.calls("exists"), 0);
    }

    #[tokio::test]
    async fn executes_leaf_records_against_storage() {
        let storage = Arc::new(InMemoryStorage::with_rows([Order::new(1, "a", 10)]));
        let warehouse = deferred(&storage);
        warehouse.get_list(&Query::for_entity("order")).await.expect("load");
        warehouse.stage_save(&[Order::new(1, "a", 11)]).expect("update");

        let save = ActivationRecord::save(Identity::new("order", 1));
        assert_eq!(
            warehouse.execute(&save).await.expect("save"),
            RecordOutcome::Executed
        );
        assert_eq!(
            warehouse.execute(&save).await.expect("again"),
            RecordOutcome::Skipped
        );
        assert_eq!(storage.rows()[0].total, 11);

        let package = ActivationRecord::package();
        assert!(warehouse.execute(&package).await.is_err());
    }

    #[tokio::test]
    async fn detached_mode_never_touches_the_driver() {
        let storage = Arc::new(InMemoryStorage::with_rows([Order::new(1, "a", 10)]));
        let config = WarehouseConfig::builder()
            .mode(WarehouseMode::Detached)
            .build();
        let warehouse = RepositoryWarehouse::new(storage.clone(), config);

        warehouse.stage_save(&[Order::new(2, "b", 20)]).expect("stage");
        let save = ActivationRecord::save(Identity::new("order", 2));
        warehouse.execute(&save).await.expect("materialize");

        let list = warehouse
            .get_list(&Query::for_entity("order"))
            .await
            .expect("list");
        let ids: Vec<i64> = list.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(storage.total_calls(), 0);
    }
}
