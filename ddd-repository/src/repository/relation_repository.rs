//! 关系仓储
//!
//! 把一对关联 `(First, Second)` 映射为关系实体后交给 `Repository` 处理，
//! 因此关系同样经过暂存、全局条件与提交流程。空输入不做任何事或返回空结果。
//!
use super::Repository;
use crate::{
    entity::Entity,
    error::{DomainError, DomainResult as Result},
    query::{Condition, Paging, PagingFilter, Query},
};

/// 关联对与关系实体之间的映射
pub trait RelationMapping: Send + Sync {
    type First: Clone + Send + Sync;
    type Second: Clone + Send + Sync;
    type Relation: Entity;

    fn to_relation(&self, first: &Self::First, second: &Self::Second) -> Self::Relation;

    fn from_relation(&self, relation: &Self::Relation) -> (Self::First, Self::Second);

    /// 命中给定 `First` 的关系条件
    fn first_condition(&self, first: &[Self::First]) -> Condition;

    /// 命中给定 `Second` 的关系条件
    fn second_condition(&self, second: &[Self::Second]) -> Condition;

    /// 由 `First` 一侧的查询得到关系条件
    ///
    /// 返回的条件会在暂存的关系实体上求值，只能引用关系实体的字段。
    fn first_condition_by_query(&self, query: &Query) -> Condition;

    /// 由 `Second` 一侧的查询得到关系条件
    fn second_condition_by_query(&self, query: &Query) -> Condition;

    /// 仅由 `First` 构造关系实体（`First` 自身携带关联信息时）
    fn relation_by_first(&self, _first: &Self::First) -> Result<Self::Relation> {
        Err(unsupported_side::<Self::Relation>("first"))
    }

    /// 仅由 `Second` 构造关系实体
    fn relation_by_second(&self, _second: &Self::Second) -> Result<Self::Relation> {
        Err(unsupported_side::<Self::Relation>("second"))
    }
}

pub(super) fn unsupported_side<R: Entity>(side: &str) -> DomainError {
    DomainError::invalid_state(format!(
        "relation `{}` cannot be built from the {side} side alone",
        R::TYPE
    ))
}

pub struct RelationRepository<M: RelationMapping> {
    mapping: M,
    inner: Repository<M::Relation>,
}

type Pair<M> = (<M as RelationMapping>::First, <M as RelationMapping>::Second);

impl<M: RelationMapping> RelationRepository<M> {
    pub fn new(inner: Repository<M::Relation>, mapping: M) -> Self {
        Self { mapping, inner }
    }

    pub fn inner(&self) -> &Repository<M::Relation> {
        &self.inner
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    fn relations(&self, pairs: &[Pair<M>]) -> Vec<M::Relation> {
        pairs
            .iter()
            .map(|(first, second)| self.mapping.to_relation(first, second))
            .collect()
    }

    fn pairs(&self, relations: &[M::Relation]) -> Vec<Pair<M>> {
        relations
            .iter()
            .map(|r| self.mapping.from_relation(r))
            .collect()
    }

    fn query_for(condition: Condition) -> Query {
        Query::of::<M::Relation>().and(condition)
    }

    pub async fn save(&self, pairs: &[Pair<M>]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        self.inner.save(&self.relations(pairs)).await
    }

    /// 由 `First` 单侧构造关系后保存
    pub async fn save_by_first(&self, first: &[M::First]) -> Result<()> {
        if first.is_empty() {
            return Ok(());
        }
        let relations = first
            .iter()
            .map(|f| self.mapping.relation_by_first(f))
            .collect::<Result<Vec<_>>>()?;
        self.inner.save(&relations).await
    }

    /// 由 `Second` 单侧构造关系后保存
    pub async fn save_by_second(&self, second: &[M::Second]) -> Result<()> {
        if second.is_empty() {
            return Ok(());
        }
        let relations = second
            .iter()
            .map(|s| self.mapping.relation_by_second(s))
            .collect::<Result<Vec<_>>>()?;
        self.inner.save(&relations).await
    }

    pub async fn remove(&self, pairs: &[Pair<M>]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        self.inner.remove(&self.relations(pairs)).await
    }

    pub async fn remove_by(&self, query: Option<Query>) -> Result<()> {
        self.inner.remove_by(query).await
    }

    pub async fn remove_by_first(&self, first: &[M::First]) -> Result<()> {
        if first.is_empty() {
            return Ok(());
        }
        let query = Self::query_for(self.mapping.first_condition(first));
        self.inner.remove_by(Some(query)).await
    }

    /// 删除 `First` 一侧命中查询的全部关系
    pub async fn remove_by_first_query(&self, query: &Query) -> Result<()> {
        let query = Self::query_for(self.mapping.first_condition_by_query(query));
        self.inner.remove_by(Some(query)).await
    }

    pub async fn remove_by_second(&self, second: &[M::Second]) -> Result<()> {
        if second.is_empty() {
            return Ok(());
        }
        let query = Self::query_for(self.mapping.second_condition(second));
        self.inner.remove_by(Some(query)).await
    }

    pub async fn remove_by_second_query(&self, query: &Query) -> Result<()> {
        let query = Self::query_for(self.mapping.second_condition_by_query(query));
        self.inner.remove_by(Some(query)).await
    }

    pub async fn get(&self, query: Option<Query>) -> Result<Option<Pair<M>>> {
        let relation = self.inner.get(query).await?;
        Ok(relation.map(|r| self.mapping.from_relation(&r)))
    }

    pub async fn get_list(&self, query: Option<Query>) -> Result<Vec<Pair<M>>> {
        let relations = self.inner.get_list(query).await?;
        Ok(self.pairs(&relations))
    }

    pub async fn get_paging(
        &self,
        query: Option<Query>,
        filter: PagingFilter,
    ) -> Result<Paging<Pair<M>>> {
        let page = self.inner.get_paging(query, filter).await?;
        Ok(page.map(|r| self.mapping.from_relation(&r)))
    }

    pub async fn second_list_by_first(&self, first: &[M::First]) -> Result<Vec<M::Second>> {
        if first.is_empty() {
            return Ok(Vec::new());
        }
        let query = Self::query_for(self.mapping.first_condition(first));
        let pairs = self.get_list(Some(query)).await?;
        Ok(pairs.into_iter().map(|(_, second)| second).collect())
    }

    pub async fn first_list_by_second(&self, second: &[M::Second]) -> Result<Vec<M::First>> {
        if second.is_empty() {
            return Ok(Vec::new());
        }
        let query = Self::query_for(self.mapping.second_condition(second));
        let pairs = self.get_list(Some(query)).await?;
        Ok(pairs.into_iter().map(|(first, _)| first).collect())
    }
}
