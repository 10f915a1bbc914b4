//! 实体仓储门面
//!
//! 绑定一个工作单元、一个存储驱动、全局条件传播器与事件通知器：
//! - 写操作：校验 → 暂存 → 通知 → 向工作单元登记记录；
//! - 读操作：传播全局条件 → 仓库读取与合并 → 可选的查询结果改写。
//!
//! 通知器失败只记录告警，不影响仓储操作本身。
//!
use crate::{
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    eventing::{EventAnnouncer, NoopAnnouncer},
    filter::QueryUsageScene,
    persist::StorageDriver,
    propagator::ConditionPropagator,
    query::{ModifyExpression, Paging, PagingFilter, Query},
    unit_of_work::{ActivationRecord, UnitOfWork},
    value::Numeric,
    warehouse::RepositoryWarehouse,
};
use std::sync::Arc;

pub struct Repository<E: Entity> {
    uow: Arc<UnitOfWork>,
    warehouse: Arc<RepositoryWarehouse<E>>,
    propagator: ConditionPropagator,
    announcer: Arc<dyn EventAnnouncer<E>>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            uow: self.uow.clone(),
            warehouse: self.warehouse.clone(),
            propagator: self.propagator.clone(),
            announcer: self.announcer.clone(),
        }
    }
}

impl<E: Entity> Repository<E> {
    /// 同一工作单元内同一实体类型共享仓库；仓库已存在时忽略 `storage`
    pub fn new(uow: Arc<UnitOfWork>, storage: Arc<dyn StorageDriver<E>>) -> Result<Self> {
        let warehouse = uow.warehouse::<E>(storage)?;
        Ok(Self {
            uow,
            warehouse,
            propagator: ConditionPropagator::default(),
            announcer: Arc::new(NoopAnnouncer),
        })
    }

    pub fn with_propagator(mut self, propagator: ConditionPropagator) -> Self {
        self.propagator = propagator;
        self
    }

    pub fn with_announcer(mut self, announcer: Arc<dyn EventAnnouncer<E>>) -> Self {
        self.announcer = announcer;
        self
    }

    pub fn unit_of_work(&self) -> &Arc<UnitOfWork> {
        &self.uow
    }

    pub fn warehouse(&self) -> &Arc<RepositoryWarehouse<E>> {
        &self.warehouse
    }

    fn prepare(&self, query: Option<Query>, scene: QueryUsageScene) -> Query {
        self.propagator.propagate(query, E::TYPE, scene)
    }

    // ---------- 写入 ----------

    /// 保存实体：全部暂存成功后登记一个保存记录包
    pub async fn save(&self, entities: &[E]) -> Result<()> {
        if entities.is_empty() {
            return Err(DomainError::validation(format!(
                "nothing to save for `{}`",
                E::TYPE
            )));
        }
        if let Some(denied) = entities.iter().find(|e| !e.can_be_save()) {
            return Err(DomainError::validation(format!(
                "{} is not allowed to be saved",
                denied.identity()
            )));
        }

        let identities = self.warehouse.stage_save(entities)?;
        if let Err(e) = self.announcer.publish_save(entities).await {
            tracing::warn!(entity_type = E::TYPE, error = %e, "publish_save failed");
        }
        self.uow.register([ActivationRecord::package_of(
            identities.into_iter().map(ActivationRecord::save),
        )]);
        Ok(())
    }

    /// 删除实体；空输入不做任何事
    pub async fn remove(&self, entities: &[E]) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        if let Some(denied) = entities.iter().find(|e| !e.can_be_remove()) {
            return Err(DomainError::validation(format!(
                "{} is not allowed to be removed",
                denied.identity()
            )));
        }

        let identities = self.warehouse.stage_remove(entities);
        if let Err(e) = self.announcer.publish_remove(entities).await {
            tracing::warn!(entity_type = E::TYPE, error = %e, "publish_remove failed");
        }
        self.uow.register([ActivationRecord::package_of(
            identities
                .into_iter()
                .map(ActivationRecord::remove_by_identity),
        )]);
        Ok(())
    }

    /// 按条件删除（`None` 表示该类型全部可见数据）
    ///
    /// 命中的已更新实体先按标识删除，再登记条件删除。
    pub async fn remove_by(&self, query: Option<Query>) -> Result<()> {
        let query = self.prepare(query, QueryUsageScene::Remove);
        let evicted = self.warehouse.stage_remove_by_condition(&query);
        if let Err(e) = self.announcer.publish_remove_by_condition(&query).await {
            tracing::warn!(
                entity_type = E::TYPE,
                error = %e,
                "publish_remove_by_condition failed"
            );
        }

        let mut package = ActivationRecord::package_of(
            evicted
                .into_iter()
                .map(ActivationRecord::remove_by_identity),
        );
        package.add_child(ActivationRecord::remove_by_condition(E::TYPE, query))?;
        self.uow.register([package]);
        Ok(())
    }

    /// 按条件修改；空修改表达式视为校验错误
    pub async fn modify(&self, modify: ModifyExpression, query: Option<Query>) -> Result<()> {
        if modify.is_empty() {
            return Err(DomainError::validation(format!(
                "empty modify expression for `{}`",
                E::TYPE
            )));
        }

        let query = self.prepare(query, QueryUsageScene::Modify);
        self.warehouse.stage_modify(modify.clone(), &query);
        if let Err(e) = self.announcer.publish_modify(&modify, &query).await {
            tracing::warn!(entity_type = E::TYPE, error = %e, "publish_modify failed");
        }
        self.uow
            .register([ActivationRecord::modify(E::TYPE, modify, query)]);
        Ok(())
    }

    // ---------- 读取 ----------

    pub async fn get(&self, query: Option<Query>) -> Result<Option<E>> {
        let query = self.prepare(query, QueryUsageScene::Query);
        let found = self.warehouse.get(&query).await?;
        let Some(entity) = found else {
            return Ok(None);
        };
        let rewritten = self.rewrite(&query, vec![entity]).await;
        Ok(rewritten.into_iter().next())
    }

    pub async fn get_list(&self, query: Option<Query>) -> Result<Vec<E>> {
        let query = self.prepare(query, QueryUsageScene::Query);
        let items = self.warehouse.get_list(&query).await?;
        Ok(self.rewrite(&query, items).await)
    }

    pub async fn get_paging(&self, query: Option<Query>, filter: PagingFilter) -> Result<Paging<E>> {
        let mut query = self.prepare(query, QueryUsageScene::Query);
        query.set_paging(Some(filter));
        let mut page = self.warehouse.get_paging(&query).await?;
        let items = std::mem::take(&mut page.items);
        page.items = self.rewrite(&query, items).await;
        Ok(page)
    }

    pub async fn exists(&self, query: Option<Query>) -> Result<bool> {
        let query = self.prepare(query, QueryUsageScene::Exist);
        self.warehouse.exists(&query).await
    }

    pub async fn count(&self, query: Option<Query>) -> Result<u64> {
        let query = self.prepare(query, QueryUsageScene::Count);
        self.warehouse.count(&query).await
    }

    pub async fn max<N: Numeric>(&self, query: Option<Query>, field: &str) -> Result<Option<N>> {
        let query = self.prepare(query, QueryUsageScene::Max);
        self.warehouse.max(&query, field).await
    }

    pub async fn min<N: Numeric>(&self, query: Option<Query>, field: &str) -> Result<Option<N>> {
        let query = self.prepare(query, QueryUsageScene::Min);
        self.warehouse.min(&query, field).await
    }

    pub async fn sum<N: Numeric>(&self, query: Option<Query>, field: &str) -> Result<N> {
        let query = self.prepare(query, QueryUsageScene::Sum);
        self.warehouse.sum(&query, field).await
    }

    /// 没有数据时返回 `None`
    pub async fn avg<N: Numeric>(&self, query: Option<Query>, field: &str) -> Result<Option<f64>> {
        let query = self.prepare(query, QueryUsageScene::Avg);
        self.warehouse.avg::<N>(&query, field).await
    }

    async fn rewrite(&self, query: &Query, items: Vec<E>) -> Vec<E> {
        if !self.warehouse.config().announce_queries {
            return items;
        }
        match self.announcer.publish_query(query, &items).await {
            Ok(Some(rewritten)) => rewritten,
            Ok(None) => items,
            Err(e) => {
                tracing::warn!(entity_type = E::TYPE, error = %e, "publish_query failed");
                items
            }
        }
    }
}
