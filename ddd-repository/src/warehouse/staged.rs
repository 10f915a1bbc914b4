//! 单类型暂存状态与合并逻辑（同步、纯内存）
//!
//! 同一标识在任一时刻至多出现在新建集、更新集、删除集之一，并与其 `DataLifeSource` 一致。
//! 存储侧的读取先经 `store_query` 下推排除条件与全部暂存标识，
//! 再由 `merge_*` 在内存中二次过滤（兼容滞后的存储），并按暂存值补回匹配的新建与已更新实体。
//!
use crate::entity::{DataLifeSource, Entity, Identity};
use crate::error::{DomainError, DomainResult};
use crate::query::{Condition, ModifyExpression, Paging, PagingFilter, Query};
use crate::value::{Numeric, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

struct Staged<E> {
    value: E,
    staged_at: u64,
}

struct Updated<E> {
    /// 加载时的存储版本，未知时为 `None`
    original: Option<E>,
    current: E,
    staged_at: u64,
}

struct Removed<E> {
    snapshot: E,
    flushed: bool,
}

struct PendingModify {
    seq: u64,
    modify: ModifyExpression,
    condition: Option<Condition>,
}

pub struct Warehouse<E: Entity> {
    life: HashMap<Identity, DataLifeSource>,
    new_order: Vec<Identity>,
    new_set: HashMap<Identity, Staged<E>>,
    updated: HashMap<Identity, Updated<E>>,
    removed: HashMap<Identity, Removed<E>>,
    removed_conditions: Vec<Condition>,
    modifications: Vec<PendingModify>,
    loaded: HashMap<Identity, E>,
    seq: u64,
}

impl<E: Entity> Default for Warehouse<E> {
    fn default() -> Self {
        Self {
            life: HashMap::new(),
            new_order: Vec::new(),
            new_set: HashMap::new(),
            updated: HashMap::new(),
            removed: HashMap::new(),
            removed_conditions: Vec::new(),
            modifications: Vec::new(),
            loaded: HashMap::new(),
            seq: 0,
        }
    }
}

impl<E: Entity> Warehouse<E> {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------- 生命周期 ----------

    /// `None` 表示尚未暂存也未从存储加载（Absent）
    pub fn life_source(&self, identity: &Identity) -> Option<DataLifeSource> {
        self.life.get(identity).copied()
    }

    /// 直接设置生命周期标记，并同步调整所在集合
    pub fn set_life_source(&mut self, entity: &E, source: DataLifeSource) {
        let identity = entity.identity();
        let original = self.original_of(&identity);
        self.evict(&identity);
        match source {
            DataLifeSource::New => self.insert_new(identity.clone(), entity.clone()),
            DataLifeSource::Persistent => {
                self.loaded.insert(identity.clone(), entity.clone());
            }
            DataLifeSource::Update => {
                let staged_at = self.next_seq();
                self.updated.insert(
                    identity.clone(),
                    Updated {
                        original,
                        current: entity.clone(),
                        staged_at,
                    },
                );
            }
            DataLifeSource::Removed => {
                self.removed.insert(
                    identity.clone(),
                    Removed {
                        snapshot: original.unwrap_or_else(|| entity.clone()),
                        flushed: false,
                    },
                );
            }
        }
        self.life.insert(identity, source);
    }

    // ---------- 暂存 ----------

    /// 暂存保存：全部成功或全部不生效
    ///
    /// 返回去重后的标识（按首次出现顺序），用于生成保存记录。
    pub fn stage_save_all(&mut self, entities: &[E]) -> DomainResult<Vec<Identity>> {
        let identities: Vec<Identity> = entities.iter().map(|e| e.identity()).collect();
        if let Some(stale) = identities
            .iter()
            .find(|id| self.life_source(id) == Some(DataLifeSource::Removed))
        {
            return Err(DomainError::StaleEntity {
                identity: stale.clone(),
            });
        }

        let mut staged: Vec<Identity> = Vec::with_capacity(identities.len());
        for (entity, identity) in entities.iter().zip(identities) {
            match self.life_source(&identity) {
                None | Some(DataLifeSource::New) => {
                    self.insert_new(identity.clone(), entity.clone());
                    self.life.insert(identity.clone(), DataLifeSource::New);
                }
                Some(DataLifeSource::Persistent) | Some(DataLifeSource::Update) => {
                    let staged_at = self.next_seq();
                    let original = self.original_of(&identity);
                    self.updated.insert(
                        identity.clone(),
                        Updated {
                            original,
                            current: entity.clone(),
                            staged_at,
                        },
                    );
                    self.life.insert(identity.clone(), DataLifeSource::Update);
                }
                // 已在上方整体拒绝
                Some(DataLifeSource::Removed) => {}
            }
            if !staged.contains(&identity) {
                staged.push(identity);
            }
        }

        tracing::debug!(entity_type = E::TYPE, staged = staged.len(), "save staged");
        Ok(staged)
    }

    /// 暂存删除，返回仍需在存储侧执行删除的标识
    ///
    /// `New` 直接从新建集移除，不产生记录；已删除的实体忽略。
    pub fn stage_remove_all(&mut self, entities: &[E]) -> Vec<Identity> {
        let mut pending = Vec::new();
        for entity in entities {
            let identity = entity.identity();
            match self.life_source(&identity) {
                Some(DataLifeSource::Removed) => {}
                Some(DataLifeSource::New) => {
                    self.evict(&identity);
                    self.life.insert(identity, DataLifeSource::Removed);
                }
                _ => {
                    let snapshot = self
                        .original_of(&identity)
                        .unwrap_or_else(|| entity.clone());
                    self.mark_removed(identity.clone(), snapshot);
                    pending.push(identity);
                }
            }
        }

        tracing::debug!(
            entity_type = E::TYPE,
            pending = pending.len(),
            "remove staged"
        );
        pending
    }

    /// 暂存按条件删除（`None` 表示全部）
    ///
    /// 命中的新建实体直接移除；命中的已更新实体转入删除集并返回其标识，
    /// 由调用方为其生成按标识删除的记录。命中的已加载实体同样记为 `Removed`，
    /// 其落库由条件删除记录承担。
    pub fn stage_remove_by_condition(&mut self, condition: Option<&Condition>) -> Vec<Identity> {
        let condition = condition.cloned().unwrap_or_else(Condition::always);

        let new_hits: Vec<Identity> = self
            .new_order
            .iter()
            .filter(|id| {
                self.new_set.get(*id).is_some_and(|s| {
                    condition.is_satisfied_by(&self.visible(&s.value, Some(s.staged_at)))
                })
            })
            .cloned()
            .collect();
        for identity in new_hits {
            self.evict(&identity);
            self.life.insert(identity, DataLifeSource::Removed);
        }

        let mut updated_hits: Vec<Identity> = self
            .updated
            .iter()
            .filter(|(_, u)| condition.is_satisfied_by(&self.visible(&u.current, Some(u.staged_at))))
            .map(|(id, _)| id.clone())
            .collect();
        updated_hits.sort_by(|a, b| a.key().cmp(b.key()));
        for identity in &updated_hits {
            let snapshot = self
                .original_of(identity)
                .or_else(|| self.updated.get(identity).map(|u| u.current.clone()));
            if let Some(snapshot) = snapshot {
                self.mark_removed(identity.clone(), snapshot);
            }
        }

        let loaded_hits: Vec<(Identity, E)> = self
            .loaded
            .iter()
            .filter(|(id, _)| self.life_source(id) == Some(DataLifeSource::Persistent))
            .filter(|(_, row)| condition.is_satisfied_by(&self.visible(row, None)))
            .map(|(id, row)| (id.clone(), row.clone()))
            .collect();
        for (identity, snapshot) in loaded_hits {
            self.evict(&identity);
            self.removed.insert(
                identity.clone(),
                Removed {
                    snapshot,
                    flushed: true,
                },
            );
            self.life.insert(identity, DataLifeSource::Removed);
        }

        tracing::debug!(entity_type = E::TYPE, %condition, "conditional remove staged");
        self.removed_conditions.push(condition);
        updated_hits
    }

    /// 暂存按条件修改；读取时叠加到此前暂存的实体与存储行上
    pub fn stage_modify(&mut self, modify: ModifyExpression, condition: Option<Condition>) {
        let seq = self.next_seq();
        tracing::debug!(entity_type = E::TYPE, %modify, "modify staged");
        self.modifications.push(PendingModify {
            seq,
            modify,
            condition,
        });
    }

    // ---------- 存储下推 ----------

    /// 所有存储读取与聚合使用的查询：
    /// 排除按条件删除的行，以及已删除（含新建后删除）、新建、已更新的标识
    ///
    /// 已更新实体是否命中由其暂存值决定，合并时在内存中补回。
    pub fn store_query(&self, query: &Query) -> Query {
        let mut out = query.clone();
        for condition in &self.removed_conditions {
            out = out.and(condition.clone().negate());
        }
        let mut excluded: Vec<Identity> = self
            .life
            .iter()
            .filter(|(_, source)| **source == DataLifeSource::Removed)
            .map(|(id, _)| id)
            .chain(self.new_order.iter())
            .chain(self.updated.keys())
            .cloned()
            .collect();
        if !excluded.is_empty() {
            excluded.sort_by(|a, b| a.key().cmp(b.key()));
            out = out.and(Condition::identities(excluded).negate());
        }
        out
    }

    // ---------- 合并 ----------

    pub fn merge_one(&mut self, row: Option<E>, query: &Query) -> Option<E> {
        if let Some(found) = row.and_then(|r| self.overlay_row(r)) {
            return Some(found);
        }
        let mut candidates = self.visible_staged(query);
        query.sort(&mut candidates);
        candidates.into_iter().next()
    }

    /// 存储结果逐行合并后追加按暂存值匹配的已更新与新建实体，并按查询排序项整体排序
    pub fn merge_many(&mut self, rows: Vec<E>, query: &Query) -> Vec<E> {
        let fetched = rows.len();
        let mut merged: Vec<E> = rows
            .into_iter()
            .filter_map(|r| self.overlay_row(r))
            .collect();
        let kept = merged.len();
        merged.extend(self.visible_staged(query));
        query.sort(&mut merged);

        tracing::debug!(
            entity_type = E::TYPE,
            fetched,
            kept,
            staged = merged.len() - kept,
            "rows merged"
        );
        merged
    }

    /// 分页合并
    ///
    /// 匹配的已更新与新建实体只追加到包含存储结果末尾的那一页；
    /// 总数 = 存储总数 - 本页被过滤的行 + 匹配的暂存实体数。
    pub fn merge_paging(&mut self, page: Paging<E>, query: &Query) -> Paging<E> {
        let filter = query
            .paging()
            .unwrap_or_else(|| PagingFilter::new(page.page, page.page_size));
        let store_total = page.total_count;
        let fetched = page.items.len() as u64;

        let mut items: Vec<E> = page
            .items
            .into_iter()
            .filter_map(|r| self.overlay_row(r))
            .collect();
        let dropped = fetched - items.len() as u64;
        let fresh = self.visible_staged(query);
        let total = store_total.saturating_sub(dropped) + fresh.len() as u64;

        if filter.holds_end_of(store_total) {
            items.extend(fresh);
        }
        query.sort(&mut items);
        Paging::new(filter, total, items)
    }

    /// 单行合并：已删除（按标识或按条件）与已暂存的标识返回 `None`，
    /// 其余记为 `Persistent` 并叠加待生效的修改
    ///
    /// 已暂存的标识由 `visible_staged` 按暂存值补回，滞后存储返回的旧行在此丢弃。
    fn overlay_row(&mut self, row: E) -> Option<E> {
        let identity = row.identity();
        if self.new_set.contains_key(&identity)
            || self.updated.contains_key(&identity)
            || self.removed.contains_key(&identity)
            || self.life_source(&identity) == Some(DataLifeSource::Removed)
            || self.removed_conditions.iter().any(|c| c.is_satisfied_by(&row))
        {
            return None;
        }
        let visible = self.visible(&row, None);
        self.life
            .entry(identity.clone())
            .or_insert(DataLifeSource::Persistent);
        self.loaded.insert(identity, row);
        Some(visible)
    }

    /// 叠加在 `since` 之后暂存的修改（`None` 表示全部）
    fn visible(&self, entity: &E, since: Option<u64>) -> E {
        let mut value = entity.clone();
        for pending in self
            .modifications
            .iter()
            .filter(|m| since.is_none_or(|s| m.seq > s))
        {
            let hit = pending
                .condition
                .as_ref()
                .is_none_or(|c| c.is_satisfied_by(&value));
            if !hit {
                continue;
            }
            if let Err(err) = pending.modify.apply_to(&mut value) {
                tracing::warn!(
                    entity_type = E::TYPE,
                    error = %err,
                    "pending modification not applicable in memory"
                );
            }
        }
        value
    }

    /// 匹配查询的新建实体（插入顺序）
    fn visible_new(&self, query: &Query) -> Vec<E> {
        self.new_order
            .iter()
            .filter_map(|id| self.new_set.get(id))
            .map(|s| self.visible(&s.value, Some(s.staged_at)))
            .filter(|v| query.is_satisfied_by(v))
            .collect()
    }

    /// 当前可见值匹配查询的已更新实体（按标识排序）
    fn visible_updated(&self, query: &Query) -> Vec<E> {
        let mut members: Vec<(&Identity, E)> = self
            .updated
            .iter()
            .map(|(id, u)| (id, self.visible(&u.current, Some(u.staged_at))))
            .filter(|(_, v)| query.is_satisfied_by(v))
            .collect();
        members.sort_by(|a, b| a.0.key().cmp(b.0.key()));
        members.into_iter().map(|(_, v)| v).collect()
    }

    /// 已更新在前、新建在后
    fn visible_staged(&self, query: &Query) -> Vec<E> {
        let mut staged = self.visible_updated(query);
        staged.extend(self.visible_new(query));
        staged
    }

    // ---------- 聚合 ----------

    /// 是否有暂存实体（新建或已更新）按当前值匹配查询
    pub fn has_staged_matching(&self, query: &Query) -> bool {
        !self.visible_staged(query).is_empty()
    }

    /// `store_count` 需来自 `store_query`
    pub fn count(&self, store_count: u64, query: &Query) -> u64 {
        store_count + self.visible_staged(query).len() as u64
    }

    /// `store_sum` 需来自 `store_query`；暂存实体按当前值计入
    pub fn sum<N: Numeric>(
        &self,
        store_sum: Option<Value>,
        query: &Query,
        field: &str,
    ) -> DomainResult<N> {
        let mut total = match store_sum {
            Some(value) if !value.is_null() => numeric::<N>(&value, field)?,
            _ => N::zero(),
        };
        for entity in self.visible_staged(query) {
            if let Some(n) = numeric_field::<E, N>(&entity, field)? {
                total = total.plus(n);
            }
        }
        Ok(total)
    }

    /// `store_value` 需来自 `store_query`
    pub fn max<N: Numeric>(
        &self,
        store_value: Option<Value>,
        query: &Query,
        field: &str,
    ) -> DomainResult<Option<N>> {
        self.extreme(store_value, query, field, Ordering::Greater)
    }

    /// `store_value` 需来自 `store_query`
    pub fn min<N: Numeric>(
        &self,
        store_value: Option<Value>,
        query: &Query,
        field: &str,
    ) -> DomainResult<Option<N>> {
        self.extreme(store_value, query, field, Ordering::Less)
    }

    fn extreme<N: Numeric>(
        &self,
        store_value: Option<Value>,
        query: &Query,
        field: &str,
        wanted: Ordering,
    ) -> DomainResult<Option<N>> {
        let mut candidates: Vec<N> = Vec::new();
        if let Some(value) = store_value.filter(|v| !v.is_null()) {
            candidates.push(numeric::<N>(&value, field)?);
        }
        for entity in self.visible_staged(query) {
            candidates.extend(numeric_field::<E, N>(&entity, field)?);
        }
        Ok(candidates.into_iter().fold(None, |best, n| match best {
            Some(b) if n.partial_cmp(&b) != Some(wanted) => Some(b),
            _ => Some(n),
        }))
    }

    // ---------- 提交 ----------

    /// 待落库的最新暂存值
    pub fn pending_save(&self, identity: &Identity) -> Option<(E, DataLifeSource)> {
        if let Some(staged) = self.new_set.get(identity) {
            return Some((staged.value.clone(), DataLifeSource::New));
        }
        self.updated
            .get(identity)
            .map(|u| (u.current.clone(), DataLifeSource::Update))
    }

    pub fn mark_saved(&mut self, identity: &Identity, value: E) {
        self.evict(identity);
        self.loaded.insert(identity.clone(), value);
        self.life.insert(identity.clone(), DataLifeSource::Persistent);
    }

    pub fn has_pending_removal(&self, identity: &Identity) -> bool {
        self.removed.get(identity).is_some_and(|r| !r.flushed)
    }

    /// 已落库的删除仍保留在删除集中，以过滤滞后的存储
    pub fn mark_removal_flushed(&mut self, identity: &Identity) {
        if let Some(removed) = self.removed.get_mut(identity) {
            removed.flushed = true;
        }
    }

    pub fn forget_removed_condition(&mut self, condition: Option<&Condition>) {
        let target = condition.cloned().unwrap_or_else(Condition::always);
        if let Some(pos) = self.removed_conditions.iter().position(|c| *c == target) {
            self.removed_conditions.remove(pos);
        }
    }

    pub fn forget_modification(&mut self, modify: &ModifyExpression, condition: Option<&Condition>) {
        if let Some(pos) = self
            .modifications
            .iter()
            .position(|m| &m.modify == modify && m.condition.as_ref() == condition)
        {
            self.modifications.remove(pos);
        }
    }

    // ---------- 观察 ----------

    pub fn new_count(&self) -> usize {
        self.new_set.len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn removed_identities(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self.removed.keys().cloned().collect();
        ids.sort_by(|a, b| a.key().cmp(b.key()));
        ids
    }

    pub fn removed_condition_count(&self) -> usize {
        self.removed_conditions.len()
    }

    pub fn pending_modification_count(&self) -> usize {
        self.modifications.len()
    }

    // ---------- 内部 ----------

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn insert_new(&mut self, identity: Identity, value: E) {
        let staged_at = self.next_seq();
        if self
            .new_set
            .insert(identity.clone(), Staged { value, staged_at })
            .is_none()
        {
            self.new_order.push(identity);
        }
    }

    fn mark_removed(&mut self, identity: Identity, snapshot: E) {
        self.evict(&identity);
        self.removed.insert(
            identity.clone(),
            Removed {
                snapshot,
                flushed: false,
            },
        );
        self.life.insert(identity, DataLifeSource::Removed);
    }

    fn evict(&mut self, identity: &Identity) {
        if self.new_set.remove(identity).is_some() {
            self.new_order.retain(|id| id != identity);
        }
        self.updated.remove(identity);
        self.removed.remove(identity);
    }

    fn original_of(&self, identity: &Identity) -> Option<E> {
        self.updated
            .get(identity)
            .and_then(|u| u.original.clone())
            .or_else(|| self.removed.get(identity).map(|r| r.snapshot.clone()))
            .or_else(|| self.loaded.get(identity).cloned())
    }
}

fn numeric<N: Numeric>(value: &Value, field: &str) -> DomainResult<N> {
    N::try_from_value(value).ok_or_else(|| DomainError::TypeMismatch {
        expected: format!("numeric `{field}`"),
        found: value.kind().to_string(),
    })
}

fn numeric_field<E: Entity, N: Numeric>(entity: &E, field: &str) -> DomainResult<Option<N>> {
    match entity.field(field) {
        None => Err(DomainError::UnknownField {
            entity_type: E::TYPE,
            field: field.to_string(),
        }),
        Some(Value::Null) => Ok(None),
        Some(value) => numeric::<N>(&value, field).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Order;

    fn all() -> Query {
        Query::for_entity("order")
    }

    /// 模拟存储：对下推后的查询在内存中求值
    fn store_rows(rows: &[Order], query: &Query) -> Vec<Order> {
        rows.iter()
            .filter(|r| query.is_satisfied_by(*r))
            .cloned()
            .collect()
    }

    fn store_sum(rows: &[Order], query: &Query) -> Option<Value> {
        let matching = store_rows(rows, query);
        (!matching.is_empty()).then(|| Value::Int(matching.iter().map(|o| o.total).sum()))
    }

    #[test]
    fn order_totals_follow_staged_state() {
        let store = vec![Order::new(1, "a", 100)];
        let mut w = Warehouse::<Order>::new();
        let loaded = w.merge_many(store_rows(&store, &w.store_query(&all())), &all());
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            w.life_source(&Identity::new("order", 1)),
            Some(DataLifeSource::Persistent)
        );

        w.stage_save_all(&[Order::new(2, "b", 50)]).expect("stage");
        let sum: i64 = w
            .sum(store_sum(&store, &w.store_query(&all())), &all(), "total")
            .expect("sum");
        assert_eq!(sum, 150);

        let pending = w.stage_remove_all(&[Order::new(1, "a", 100)]);
        assert_eq!(pending, vec![Identity::new("order", 1)]);
        let q = w.store_query(&all());
        let sum: i64 = w.sum(store_sum(&store, &q), &all(), "total").expect("sum");
        assert_eq!(sum, 50);
        assert_eq!(w.count(store_rows(&store, &q).len() as u64, &all()), 1);
    }

    #[test]
    fn removed_entities_cannot_be_saved_again() {
        let mut w = Warehouse::<Order>::new();
        w.set_life_source(&Order::new(1, "a", 1), DataLifeSource::Persistent);
        w.stage_remove_all(&[Order::new(1, "a", 1)]);

        let err = w
            .stage_save_all(&[Order::new(9, "z", 1), Order::new(1, "a", 2)])
            .expect_err("stale");
        assert!(matches!(err, DomainError::StaleEntity { .. }));
        // 全部不生效
        assert_eq!(w.new_count(), 0);
        assert_eq!(w.life_source(&Identity::new("order", 9)), None);
    }

    #[test]
    fn saving_twice_keeps_one_entry() {
        let mut w = Warehouse::<Order>::new();
        w.stage_save_all(&[Order::new(1, "a", 1)]).expect("first");
        let ids = w
            .stage_save_all(&[Order::new(1, "a", 2), Order::new(1, "a", 3)])
            .expect("second");
        assert_eq!(ids.len(), 1);
        assert_eq!(w.new_count(), 1);

        let merged = w.merge_many(vec![], &all());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total, 3);

        w.set_life_source(&Order::new(5, "e", 1), DataLifeSource::Persistent);
        w.stage_save_all(&[Order::new(5, "e", 2)]).expect("update");
        w.stage_save_all(&[Order::new(5, "e", 4)]).expect("update again");
        assert_eq!(w.updated_count(), 1);
        assert_eq!(
            w.life_source(&Identity::new("order", 5)),
            Some(DataLifeSource::Update)
        );
    }

    #[test]
    fn removing_new_entity_never_reaches_store() {
        let mut w = Warehouse::<Order>::new();
        w.stage_save_all(&[Order::new(1, "a", 1)]).expect("stage");
        let pending = w.stage_remove_all(&[Order::new(1, "a", 1)]);
        assert!(pending.is_empty());
        assert_eq!(w.new_count(), 0);
        assert_eq!(
            w.life_source(&Identity::new("order", 1)),
            Some(DataLifeSource::Removed)
        );
    }

    #[test]
    fn lagging_store_rows_are_filtered() {
        let mut w = Warehouse::<Order>::new();
        w.set_life_source(&Order::new(1, "a", 10), DataLifeSource::Persistent);
        w.stage_remove_all(&[Order::new(1, "a", 10)]);
        w.stage_remove_by_condition(Some(&Condition::equal("customer", "b")));

        // 存储未执行下推，仍返回全部行
        let rows = vec![
            Order::new(1, "a", 10),
            Order::new(2, "b", 20),
            Order::new(3, "c", 30),
        ];
        let merged = w.merge_many(rows.clone(), &all());
        let ids: Vec<i64> = merged.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3]);

        assert!(w.merge_one(Some(rows[0].clone()), &all()).is_none());
    }

    #[test]
    fn merge_one_falls_back_to_new_entries() {
        let mut w = Warehouse::<Order>::new();
        w.stage_save_all(&[Order::new(7, "g", 70)]).expect("stage");
        let query = all().and(Condition::greater_than("total", 50));

        let found = w.merge_one(None, &query).map(|o| o.id);
        assert_eq!(found, Some(7));
        assert!(w.merge_one(None, &all().and(Condition::less_than("total", 5))).is_none());
    }

    #[test]
    fn conditional_remove_evicts_staged_entries() {
        let mut w = Warehouse::<Order>::new();
        w.stage_save_all(&[Order::new(1, "a", 10), Order::new(2, "b", 20)])
            .expect("new");
        w.set_life_source(&Order::new(3, "c", 30), DataLifeSource::Persistent);
        w.stage_save_all(&[Order::new(3, "c", 5)]).expect("update");

        let evicted = w.stage_remove_by_condition(Some(&Condition::less_than("total", 15)));
        assert_eq!(evicted, vec![Identity::new("order", 3)]);
        assert_eq!(w.new_count(), 1);
        assert_eq!(w.updated_count(), 0);
        assert_eq!(w.removed_identities(), vec![Identity::new("order", 3)]);
        assert_eq!(w.removed_condition_count(), 1);
    }

    #[test]
    fn pending_modifications_overlay_earlier_entries_only() {
        let mut w = Warehouse::<Order>::new();
        w.stage_save_all(&[Order::new(1, "a", 10)]).expect("before");
        w.stage_modify(
            ModifyExpression::new().add("total", 5),
            Some(Condition::equal("status", "new")),
        );
        w.stage_save_all(&[Order::new(2, "b", 10)]).expect("after");

        let merged = w.merge_many(vec![Order::new(3, "c", 10)], &all().order_by("id"));
        let totals: Vec<i64> = merged.iter().map(|o| o.total).collect();
        assert_eq!(totals, vec![15, 10, 15]);
    }

    #[test]
    fn extremes_combine_store_and_memory() {
        let mut w = Warehouse::<Order>::new();
        w.set_life_source(&Order::new(1, "a", 40), DataLifeSource::Persistent);
        w.stage_save_all(&[Order::new(1, "a", 90)]).expect("update");
        w.stage_save_all(&[Order::new(2, "b", 3)]).expect("new");

        let store = vec![Order::new(1, "a", 40), Order::new(4, "d", 60)];
        let q = w.store_query(&all());
        let store_max = store_rows(&store, &q).iter().map(|o| o.total).max().map(Value::Int);
        let store_min = store_rows(&store, &q).iter().map(|o| o.total).min().map(Value::Int);

        let max: Option<i64> = w.max(store_max, &all(), "total").expect("max");
        let min: Option<i64> = w.min(store_min, &all(), "total").expect("min");
        assert_eq!(max, Some(90));
        assert_eq!(min, Some(3));

        let none: Option<f64> = Warehouse::<Order>::new()
            .max(None, &all(), "total")
            .expect("empty");
        assert_eq!(none, None);
    }

    #[test]
    fn updated_rows_match_by_their_staged_values() {
        let store = vec![Order::new(1, "a", 10), Order::new(2, "b", 80)];
        let mut w = Warehouse::<Order>::new();
        w.merge_many(store.clone(), &all());
        w.stage_save_all(&[Order::new(1, "a", 60), Order::new(2, "b", 5)])
            .expect("update");

        let big = all().and(Condition::greater_or_equal("total", 50));
        let q = w.store_query(&big);
        let merged = w.merge_many(store_rows(&store, &q), &big);
        let rows: Vec<(i64, i64)> = merged.iter().map(|o| (o.id, o.total)).collect();
        assert_eq!(rows, vec![(1, 60)]);
        assert_eq!(w.count(store_rows(&store, &q).len() as u64, &big), 1);

        let exact = all().and(Condition::equal("total", 60));
        let q = w.store_query(&exact);
        let found = w.merge_one(store_rows(&store, &q).into_iter().next(), &exact);
        assert_eq!(found.map(|o| o.id), Some(1));
        assert!(w.has_staged_matching(&exact));
    }

    #[test]
    fn lagging_store_never_returns_stale_updated_rows() {
        let mut w = Warehouse::<Order>::new();
        w.set_life_source(&Order::new(1, "a", 80), DataLifeSource::Persistent);
        w.stage_save_all(&[Order::new(1, "a", 5)]).expect("update");

        let big = all().and(Condition::greater_than("total", 50));
        // 存储未执行下推，仍返回旧值
        let merged = w.merge_many(vec![Order::new(1, "a", 80)], &big);
        assert!(merged.is_empty());

        let merged = w.merge_many(vec![Order::new(1, "a", 80)], &all());
        let totals: Vec<i64> = merged.iter().map(|o| o.total).collect();
        assert_eq!(totals, vec![5]);
    }

    #[test]
    fn conditional_remove_retires_loaded_rows() {
        let mut w = Warehouse::<Order>::new();
        w.merge_many(vec![Order::new(1, "a", 10), Order::new(2, "b", 20)], &all());

        let evicted = w.stage_remove_by_condition(Some(&Condition::equal("customer", "a")));
        assert!(evicted.is_empty());
        let id = Identity::new("order", 1);
        assert_eq!(w.life_source(&id), Some(DataLifeSource::Removed));
        // 由条件删除记录落库，不再按标识删除
        assert!(!w.has_pending_removal(&id));

        let err = w
            .stage_save_all(&[Order::new(1, "a", 99)])
            .expect_err("stale");
        assert!(matches!(err, DomainError::StaleEntity { .. }));
        assert_eq!(
            w.life_source(&Identity::new("order", 2)),
            Some(DataLifeSource::Persistent)
        );
    }

    #[test]
    fn sum_counts_updated_rows_by_current_value() {
        let mut w = Warehouse::<Order>::new();
        let store = vec![Order::new(1, "a", 40), Order::new(2, "b", 60)];
        w.merge_many(store.clone(), &all());
        w.stage_save_all(&[Order::new(2, "b", 65)]).expect("update");

        let sum: u64 = w
            .sum(store_sum(&store, &w.store_query(&all())), &all(), "total")
            .expect("sum");
        assert_eq!(sum, 105);
    }

    #[test]
    fn paging_appends_new_entries_on_the_last_page_only() {
        let mut w = Warehouse::<Order>::new();
        w.stage_save_all(&[Order::new(9, "z", 1)]).expect("stage");

        let first = Paging::new(
            PagingFilter::new(1, 2),
            3,
            vec![Order::new(1, "a", 1), Order::new(2, "b", 1)],
        );
        let merged = w.merge_paging(first, &all().page(1, 2));
        assert_eq!(merged.items.len(), 2);
        assert_eq!(merged.total_count, 4);

        let last = Paging::new(PagingFilter::new(2, 2), 3, vec![Order::new(3, "c", 1)]);
        let merged = w.merge_paging(last, &all().page(2, 2));
        let ids: Vec<i64> = merged.items.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![3, 9]);
        assert_eq!(merged.total_count, 4);
    }

    #[test]
    fn commit_helpers_move_entries_to_persistent() {
        let mut w = Warehouse::<Order>::new();
        let id = Identity::new("order", 1);
        w.stage_save_all(&[Order::new(1, "a", 1)]).expect("stage");

        let (value, source) = w.pending_save(&id).expect("pending");
        assert_eq!(source, DataLifeSource::New);
        w.mark_saved(&id, value);
        assert!(w.pending_save(&id).is_none());
        assert_eq!(w.life_source(&id), Some(DataLifeSource::Persistent));

        w.stage_remove_all(&[Order::new(1, "a", 1)]);
        assert!(w.has_pending_removal(&id));
        w.mark_removal_flushed(&id);
        assert!(!w.has_pending_removal(&id));
        assert_eq!(w.removed_identities(), vec![id]);
    }
}
