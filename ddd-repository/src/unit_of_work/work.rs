use super::record::ActivationRecord;
use crate::{
    config::WarehouseConfig,
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    persist::StorageDriver,
    warehouse::RepositoryWarehouse,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 单条叶子记录的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Executed,
    /// 已无待落库内容（被后续操作抵消或已执行过）
    Skipped,
}

/// 按实体类型执行叶子记录
#[async_trait]
pub trait RecordExecutor: Send + Sync {
    async fn execute(&self, record: &ActivationRecord) -> Result<RecordOutcome>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub executed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Active,
    Committing,
    Committed,
    /// 提交中途失败，只能丢弃
    Failed,
    Discarded,
}

impl fmt::Display for UnitOfWorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitOfWorkState::Active => "active",
            UnitOfWorkState::Committing => "committing",
            UnitOfWorkState::Committed => "committed",
            UnitOfWorkState::Failed => "failed",
            UnitOfWorkState::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

/// 工作单元
///
/// - 每种实体类型持有一个仓库（按 `TypeId` 存放，按类型名路由提交）；
/// - `register` 从不失败，非活动状态下的登记会被丢弃并告警；
/// - `commit` 按登记顺序深度优先执行叶子记录，首个失败即停止并进入 `Failed`。
pub struct UnitOfWork {
    id: Uuid,
    config: WarehouseConfig,
    state: Mutex<UnitOfWorkState>,
    records: Mutex<Vec<ActivationRecord>>,
    warehouses: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    /// 类型名 → 首个登记仓库的 Rust 类型
    types: DashMap<&'static str, TypeId>,
    executors: DashMap<String, Arc<dyn RecordExecutor>>,
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::with_config(WarehouseConfig::default())
    }

    pub fn with_config(config: WarehouseConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            state: Mutex::new(UnitOfWorkState::Active),
            records: Mutex::new(Vec::new()),
            warehouses: DashMap::new(),
            types: DashMap::new(),
            executors: DashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn state(&self) -> UnitOfWorkState {
        *lock(&self.state)
    }

    /// 获取（或首次创建）实体类型 `E` 的仓库
    ///
    /// 已存在时忽略 `storage`；两个不同的 Rust 类型共用同一 `Entity::TYPE` 时返回 `TypeMismatch`。
    /// 已通过 `bind_executor` 绑定的执行器保持不变。
    pub fn warehouse<E: Entity>(
        &self,
        storage: Arc<dyn StorageDriver<E>>,
    ) -> Result<Arc<RepositoryWarehouse<E>>> {
        let key = TypeId::of::<E>();
        if let Some(existing) = self.warehouses.get(&key) {
            return downcast::<E>(existing.value().clone());
        }
        let owner = *self.types.entry(E::TYPE).or_insert(key);
        if owner != key {
            return Err(DomainError::TypeMismatch {
                expected: format!("a single entity type named `{}`", E::TYPE),
                found: std::any::type_name::<E>().to_string(),
            });
        }

        let created: Arc<dyn Any + Send + Sync> =
            Arc::new(RepositoryWarehouse::new(storage, self.config.clone()));
        let stored = self
            .warehouses
            .entry(key)
            .or_insert_with(|| created)
            .value()
            .clone();
        let warehouse = downcast::<E>(stored)?;
        let executor: Arc<dyn RecordExecutor> = warehouse.clone();
        self.executors
            .entry(E::TYPE.to_string())
            .or_insert(executor);

        tracing::debug!(uow = %self.id, entity_type = E::TYPE, "warehouse created");
        Ok(warehouse)
    }

    /// 为实体类型绑定自定义执行器（覆盖已有绑定）
    pub fn bind_executor(&self, entity_type: impl Into<String>, executor: Arc<dyn RecordExecutor>) {
        self.executors.insert(entity_type.into(), executor);
    }

    /// 登记记录；空的 `Package` 被忽略
    pub fn register(&self, records: impl IntoIterator<Item = ActivationRecord>) {
        let state = self.state();
        let mut pending = lock(&self.records);
        for record in records {
            if record.is_empty_package() {
                continue;
            }
            if state != UnitOfWorkState::Active {
                tracing::warn!(
                    uow = %self.id,
                    %state,
                    record = %record,
                    "registration dropped, unit of work is not active"
                );
                continue;
            }
            pending.push(record);
        }
    }

    pub fn pending(&self) -> Vec<ActivationRecord> {
        lock(&self.records).clone()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.records).len()
    }

    /// 提交：按登记顺序深度优先执行所有叶子记录
    pub async fn commit(&self) -> Result<CommitSummary> {
        {
            let mut state = lock(&self.state);
            if *state != UnitOfWorkState::Active {
                return Err(DomainError::invalid_state(format!(
                    "unit of work {} cannot commit while {}",
                    self.id, *state
                )));
            }
            *state = UnitOfWorkState::Committing;
        }

        let records = std::mem::take(&mut *lock(&self.records));
        tracing::info!(uow = %self.id, records = records.len(), "commit started");

        let mut summary = CommitSummary::default();
        let leaves = records.iter().flat_map(|r| r.leaves());
        for (position, leaf) in leaves.enumerate() {
            match self.execute(leaf).await {
                Ok(RecordOutcome::Executed) => summary.executed += 1,
                Ok(RecordOutcome::Skipped) => summary.skipped += 1,
                Err(source) => {
                    *lock(&self.state) = UnitOfWorkState::Failed;
                    tracing::error!(
                        uow = %self.id,
                        position,
                        record = %leaf,
                        error = %source,
                        "commit halted"
                    );
                    return Err(DomainError::CommitFailed {
                        position,
                        record: leaf.describe(),
                        source: Box::new(source),
                    });
                }
            }
        }

        *lock(&self.state) = UnitOfWorkState::Committed;
        tracing::info!(
            uow = %self.id,
            executed = summary.executed,
            skipped = summary.skipped,
            "commit finished"
        );
        Ok(summary)
    }

    /// 丢弃：清空待提交记录，无其他副作用
    pub fn discard(&self) {
        let dropped = std::mem::take(&mut *lock(&self.records)).len();
        *lock(&self.state) = UnitOfWorkState::Discarded;
        tracing::debug!(uow = %self.id, dropped, "unit of work discarded");
    }

    async fn execute(&self, leaf: &ActivationRecord) -> Result<RecordOutcome> {
        let entity_type = leaf
            .entity_type()
            .ok_or_else(|| DomainError::invalid_state("package record reached the executor"))?;
        let executor = self
            .executors
            .get(entity_type)
            .map(|e| e.value().clone())
            .ok_or_else(|| {
                DomainError::invalid_state(format!(
                    "no executor bound for entity type `{entity_type}`"
                ))
            })?;
        executor.execute(leaf).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn downcast<E: Entity>(any: Arc<dyn Any + Send + Sync>) -> Result<Arc<RepositoryWarehouse<E>>> {
    any.downcast::<RepositoryWarehouse<E>>()
        .map_err(|_| DomainError::TypeMismatch {
            expected: std::any::type_name::<RepositoryWarehouse<E>>().to_string(),
            found: "another warehouse type".to_string(),
        })
}
