//! 三元关系仓储
//!
//! 与 `RelationRepository` 相同的做法：三元组 `(First, Second, Third)` 经映射成为关系实体，
//! 再交给 `Repository` 暂存与提交。任意一侧都可用于删除与反查另外两侧。
//!
use super::{Repository, relation_repository::unsupported_side};
use crate::{
    entity::Entity,
    error::DomainResult as Result,
    query::{Condition, Paging, PagingFilter, Query},
};

/// 三元组与关系实体之间的映射
pub trait ThreeRelationMapping: Send + Sync {
    type First: Clone + Send + Sync;
    type Second: Clone + Send + Sync;
    type Third: Clone + Send + Sync;
    type Relation: Entity;

    fn to_relation(
        &self,
        first: &Self::First,
        second: &Self::Second,
        third: &Self::Third,
    ) -> Self::Relation;

    fn from_relation(&self, relation: &Self::Relation) -> (Self::First, Self::Second, Self::Third);

    fn first_condition(&self, first: &[Self::First]) -> Condition;

    fn second_condition(&self, second: &[Self::Second]) -> Condition;

    fn third_condition(&self, third: &[Self::Third]) -> Condition;

    /// 由某一侧的查询得到关系条件，只能引用关系实体的字段
    fn first_condition_by_query(&self, query: &Query) -> Condition;

    fn second_condition_by_query(&self, query: &Query) -> Condition;

    fn third_condition_by_query(&self, query: &Query) -> Condition;

    fn relation_by_first(&self, _first: &Self::First) -> Result<Self::Relation> {
        Err(unsupported_side::<Self::Relation>("first"))
    }

    fn relation_by_second(&self, _second: &Self::Second) -> Result<Self::Relation> {
        Err(unsupported_side::<Self::Relation>("second"))
    }

    fn relation_by_third(&self, _third: &Self::Third) -> Result<Self::Relation> {
        Err(unsupported_side::<Self::Relation>("third"))
    }
}

type Triple<M> = (
    <M as ThreeRelationMapping>::First,
    <M as ThreeRelationMapping>::Second,
    <M as ThreeRelationMapping>::Third,
);

pub struct ThreeRelationRepository<M: ThreeRelationMapping> {
    mapping: M,
    inner: Repository<M::Relation>,
}

impl<M: ThreeRelationMapping> ThreeRelationRepository<M> {
    pub fn new(inner: Repository<M::Relation>, mapping: M) -> Self {
        Self { mapping, inner }
    }

    pub fn inner(&self) -> &Repository<M::Relation> {
        &self.inner
    }

    pub fn mapping(&self) -> &M {
        &self.mapping
    }

    fn relations(&self, triples: &[Triple<M>]) -> Vec<M::Relation> {
        triples
            .iter()
            .map(|(first, second, third)| self.mapping.to_relation(first, second, third))
            .collect()
    }

    fn query_for(condition: Condition) -> Query {
        Query::of::<M::Relation>().and(condition)
    }

    /// 按关系条件读取三元组（条件为空时跳过读取）
    async fn triples_where(&self, condition: Option<Condition>) -> Result<Vec<Triple<M>>> {
        match condition {
            Some(condition) => self.get_list(Some(Self::query_for(condition))).await,
            None => Ok(Vec::new()),
        }
    }

    async fn remove_where(&self, condition: Condition) -> Result<()> {
        self.inner.remove_by(Some(Self::query_for(condition))).await
    }

    async fn save_relations(&self, relations: Vec<M::Relation>) -> Result<()> {
        if relations.is_empty() {
            return Ok(());
        }
        self.inner.save(&relations).await
    }

    // ---------- 写入 ----------

    pub async fn save(&self, triples: &[Triple<M>]) -> Result<()> {
        self.save_relations(self.relations(triples)).await
    }

    pub async fn save_by_first(&self, first: &[M::First]) -> Result<()> {
        let relations = first
            .iter()
            .map(|f| self.mapping.relation_by_first(f))
            .collect::<Result<Vec<_>>>()?;
        self.save_relations(relations).await
    }

    pub async fn save_by_second(&self, second: &[M::Second]) -> Result<()> {
        let relations = second
            .iter()
            .map(|s| self.mapping.relation_by_second(s))
            .collect::<Result<Vec<_>>>()?;
        self.save_relations(relations).await
    }

    pub async fn save_by_third(&self, third: &[M::Third]) -> Result<()> {
        let relations = third
            .iter()
            .map(|t| self.mapping.relation_by_third(t))
            .collect::<Result<Vec<_>>>()?;
        self.save_relations(relations).await
    }

    pub async fn remove(&self, triples: &[Triple<M>]) -> Result<()> {
        if triples.is_empty() {
            return Ok(());
        }
        self.inner.remove(&self.relations(triples)).await
    }

    pub async fn remove_by(&self, query: Option<Query>) -> Result<()> {
        self.inner.remove_by(query).await
    }

    pub async fn remove_by_first(&self, first: &[M::First]) -> Result<()> {
        if first.is_empty() {
            return Ok(());
        }
        self.remove_where(self.mapping.first_condition(first)).await
    }

    pub async fn remove_by_first_query(&self, query: &Query) -> Result<()> {
        self.remove_where(self.mapping.first_condition_by_query(query))
            .await
    }

    pub async fn remove_by_second(&self, second: &[M::Second]) -> Result<()> {
        if second.is_empty() {
            return Ok(());
        }
        self.remove_where(self.mapping.second_condition(second)).await
    }

    pub async fn remove_by_second_query(&self, query: &Query) -> Result<()> {
        self.remove_where(self.mapping.second_condition_by_query(query))
            .await
    }

    pub async fn remove_by_third(&self, third: &[M::Third]) -> Result<()> {
        if third.is_empty() {
            return Ok(());
        }
        self.remove_where(self.mapping.third_condition(third)).await
    }

    pub async fn remove_by_third_query(&self, query: &Query) -> Result<()> {
        self.remove_where(self.mapping.third_condition_by_query(query))
            .await
    }

    // ---------- 读取 ----------

    pub async fn get(&self, query: Option<Query>) -> Result<Option<Triple<M>>> {
        let relation = self.inner.get(query).await?;
        Ok(relation.map(|r| self.mapping.from_relation(&r)))
    }

    pub async fn get_list(&self, query: Option<Query>) -> Result<Vec<Triple<M>>> {
        let relations = self.inner.get_list(query).await?;
        Ok(relations
            .iter()
            .map(|r| self.mapping.from_relation(r))
            .collect())
    }

    pub async fn get_paging(
        &self,
        query: Option<Query>,
        filter: PagingFilter,
    ) -> Result<Paging<Triple<M>>> {
        let page = self.inner.get_paging(query, filter).await?;
        Ok(page.map(|r| self.mapping.from_relation(&r)))
    }

    pub async fn first_list_by_second(&self, second: &[M::Second]) -> Result<Vec<M::First>> {
        let condition = (!second.is_empty()).then(|| self.mapping.second_condition(second));
        let triples = self.triples_where(condition).await?;
        Ok(triples.into_iter().map(|(first, _, _)| first).collect())
    }

    pub async fn first_list_by_third(&self, third: &[M::Third]) -> Result<Vec<M::First>> {
        let condition = (!third.is_empty()).then(|| self.mapping.third_condition(third));
        let triples = self.triples_where(condition).await?;
        Ok(triples.into_iter().map(|(first, _, _)| first).collect())
    }

    pub async fn second_list_by_first(&self, first: &[M::First]) -> Result<Vec<M::Second>> {
        let condition = (!first.is_empty()).then(|| self.mapping.first_condition(first));
        let triples = self.triples_where(condition).await?;
        Ok(triples.into_iter().map(|(_, second, _)| second).collect())
    }

    pub async fn second_list_by_third(&self, third: &[M::Third]) -> Result<Vec<M::Second>> {
        let condition = (!third.is_empty()).then(|| self.mapping.third_condition(third));
        let triples = self.triples_where(condition).await?;
        Ok(triples.into_iter().map(|(_, second, _)| second).collect())
    }

    pub async fn third_list_by_first(&self, first: &[M::First]) -> Result<Vec<M::Third>> {
        let condition = (!first.is_empty()).then(|| self.mapping.first_condition(first));
        let triples = self.triples_where(condition).await?;
        Ok(triples.into_iter().map(|(_, _, third)| third).collect())
    }

    pub async fn third_list_by_second(&self, second: &[M::Second]) -> Result<Vec<M::Third>> {
        let condition = (!second.is_empty()).then(|| self.mapping.second_condition(second));
        let triples = self.triples_where(condition).await?;
        Ok(triples.into_iter().map(|(_, _, third)| third).collect())
    }
}
