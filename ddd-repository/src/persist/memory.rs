//! 内存存储驱动（InMemoryStorage）
//!
//! 以 `Vec` 按插入顺序保存实体，在内存中对根节点条件求值（子查询与连接仅作投影提示，不参与过滤）。
//! 记录每个操作的调用次数，并支持按操作名注入失败，便于测试提交中断、存储滞后等场景。
//! `Detached` 模式下的仓库也以它作为本地落地存储。
//!
use crate::{
    entity::{DataLifeSource, Entity, Identity},
    error::{DomainError, DomainResult as Result},
    persist::StorageDriver,
    query::{ModifyExpression, Paging, PagingFilter, Query},
    value::Value,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard};

pub struct InMemoryStorage<E: Entity> {
    rows: Mutex<Vec<E>>,
    calls: DashMap<&'static str, usize>,
    failures: DashMap<&'static str, String>,
}

impl<E: Entity> Default for InMemoryStorage<E> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            calls: DashMap::new(),
            failures: DashMap::new(),
        }
    }
}

impl<E: Entity> InMemoryStorage<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = E>) -> Self {
        let storage = Self::new();
        for row in rows {
            storage.insert(row);
        }
        storage
    }

    /// 直接写入一行（按标识覆盖），不计入调用次数
    pub fn insert(&self, entity: E) {
        upsert(&mut self.lock(), entity);
    }

    pub fn rows(&self) -> Vec<E> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 指定操作（如 `"fetch_many"`、`"persist_save"`）被调用的次数
    pub fn calls(&self, operation: &str) -> usize {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| *c.value()).sum()
    }

    /// 之后对该操作的调用都返回 `DomainError::Storage`
    pub fn fail_on(&self, operation: &'static str, reason: impl Into<String>) {
        self.failures.insert(operation, reason.into());
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<E>> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, operation: &'static str, target: impl Display) -> Result<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        match self.failures.get(operation) {
            Some(reason) => Err(DomainError::storage(
                operation,
                target.to_string(),
                reason.value().clone(),
            )),
            None => Ok(()),
        }
    }

    fn matching(&self, query: &Query) -> Vec<E> {
        let mut rows: Vec<E> = self
            .lock()
            .iter()
            .filter(|row| query.is_satisfied_by(*row))
            .cloned()
            .collect();
        query.sort(&mut rows);
        rows
    }

    fn extreme(&self, query: &Query, field: &str, wanted: Ordering) -> Option<Value> {
        self.matching(query)
            .iter()
            .filter_map(|row| row.field(field))
            .filter(|v| !v.is_null())
            .fold(None, |best: Option<Value>, v| match best {
                Some(b) if v.compare(&b) != Some(wanted) => Some(b),
                _ => Some(v),
            })
    }
}

fn upsert<E: Entity>(rows: &mut Vec<E>, entity: E) {
    let identity = entity.identity();
    match rows.iter_mut().find(|row| row.identity() == identity) {
        Some(row) => *row = entity,
        None => rows.push(entity),
    }
}

#[async_trait]
impl<E: Entity> StorageDriver<E> for InMemoryStorage<E> {
    async fn fetch(&self, query: &Query) -> Result<Option<E>> {
        self.enter("fetch", query)?;
        Ok(self.matching(query).into_iter().next())
    }

    async fn fetch_many(&self, query: &Query) -> Result<Vec<E>> {
        self.enter("fetch_many", query)?;
        Ok(self.matching(query))
    }

    async fn fetch_paging(&self, query: &Query) -> Result<Paging<E>> {
        self.enter("fetch_paging", query)?;
        let rows = self.matching(query);
        let total = rows.len() as u64;
        let filter = query
            .paging()
            .unwrap_or_else(|| PagingFilter::new(1, total.max(1)));
        let items = rows
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.page_size).unwrap_or(usize::MAX))
            .collect();
        Ok(Paging::new(filter, total, items))
    }

    async fn exists(&self, query: &Query) -> Result<bool> {
        self.enter("exists", query)?;
        Ok(self.lock().iter().any(|row| query.is_satisfied_by(row)))
    }

    async fn count(&self, query: &Query) -> Result<u64> {
        self.enter("count", query)?;
        Ok(self.lock().iter().filter(|row| query.is_satisfied_by(*row)).count() as u64)
    }

    async fn max(&self, query: &Query, field: &str) -> Result<Option<Value>> {
        self.enter("max", query)?;
        Ok(self.extreme(query, field, Ordering::Greater))
    }

    async fn min(&self, query: &Query, field: &str) -> Result<Option<Value>> {
        self.enter("min", query)?;
        Ok(self.extreme(query, field, Ordering::Less))
    }

    async fn sum(&self, query: &Query, field: &str) -> Result<Option<Value>> {
        self.enter("sum", query)?;
        let mut total: Option<Value> = None;
        for value in self.matching(query).iter().filter_map(|row| row.field(field)) {
            if value.is_null() {
                continue;
            }
            total = Some(match total {
                Some(acc) => acc.checked_add(&value)?,
                None => value,
            });
        }
        Ok(total)
    }

    async fn persist_save(&self, entity: &E, source: DataLifeSource) -> Result<()> {
        let identity = entity.identity();
        self.enter("persist_save", &identity)?;
        if source == DataLifeSource::Removed {
            return Err(DomainError::storage(
                "persist_save",
                identity.to_string(),
                "cannot save a removed entity",
            ));
        }
        upsert(&mut self.lock(), entity.clone());
        Ok(())
    }

    async fn persist_remove(&self, identity: &Identity) -> Result<()> {
        self.enter("persist_remove", identity)?;
        self.lock().retain(|row| &row.identity() != identity);
        Ok(())
    }

    async fn persist_remove_by_condition(&self, query: &Query) -> Result<()> {
        self.enter("persist_remove_by_condition", query)?;
        self.lock().retain(|row| !query.is_satisfied_by(row));
        Ok(())
    }

    async fn persist_modify(&self, modify: &ModifyExpression, query: &Query) -> Result<()> {
        self.enter("persist_modify", query)?;
        let mut rows = self.lock();
        for row in rows.iter_mut().filter(|row| query.is_satisfied_by(&**row)) {
            modify.apply_to(row)?;
        }
        Ok(())
    }
}
