use super::condition::{Condition, QueryOperator};
use super::paging::PagingFilter;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::value::{ToValue, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 查询图中节点的下标，`NodeId::ROOT` 为根节点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// 连接字段 `source = target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinField {
    pub source: String,
    pub target: String,
}

impl JoinField {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subquery {
    pub name: String,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinItem {
    pub kind: JoinType,
    pub on: Vec<JoinField>,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub field: String,
    pub descending: bool,
}

/// 查询图中的单个节点
///
/// 未设置实体类型的节点在全局条件传播时会被跳过（但其子节点仍会遍历）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    entity_type: Option<String>,
    condition: Option<Condition>,
    subqueries: Vec<Subquery>,
    joins: Vec<JoinItem>,
    load_properties: Vec<String>,
}

impl QueryNode {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: Some(entity_type.into()),
            ..Default::default()
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.combine(condition, QueryOperator::And);
        self
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity_type.as_deref()
    }

    pub fn set_entity_type(&mut self, entity_type: impl Into<String>) {
        self.entity_type = Some(entity_type.into());
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn subqueries(&self) -> &[Subquery] {
        &self.subqueries
    }

    pub fn joins(&self) -> &[JoinItem] {
        &self.joins
    }

    pub fn load_properties(&self) -> &[String] {
        &self.load_properties
    }

    /// 合并条件
    ///
    /// 节点原本无条件时：`And` 直接安装新条件；`Or` 保持不受限（无条件 OR 任意条件仍为全集）。
    pub fn combine(&mut self, condition: Condition, operator: QueryOperator) {
        self.condition = match (self.condition.take(), operator) {
            (None, QueryOperator::And) => Some(condition),
            (None, QueryOperator::Or) => None,
            (Some(existing), op) => Some(existing.combine(condition, op)),
        };
    }

    /// 全局条件附加入口
    pub fn set_global_condition(&mut self, condition: Condition, operator: QueryOperator) {
        self.combine(condition, operator);
    }

    /// 子节点（先子查询后连接）
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.subqueries
            .iter()
            .map(|s| s.node)
            .chain(self.joins.iter().map(|j| j.node))
    }

    fn shift(&mut self, offset: usize) {
        for sub in &mut self.subqueries {
            sub.node = NodeId(sub.node.0 + offset);
        }
        for join in &mut self.joins {
            join.node = NodeId(join.node.0 + offset);
        }
    }
}

/// 查询对象：以数组承载的节点图（允许共享节点与环），外加排序与分页
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    nodes: Vec<QueryNode>,
    sorts: Vec<SortEntry>,
    paging: Option<PagingFilter>,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    /// 无实体类型、无条件的空查询
    pub fn new() -> Self {
        Self {
            nodes: vec![QueryNode::default()],
            sorts: Vec::new(),
            paging: None,
        }
    }

    pub fn for_entity(entity_type: impl Into<String>) -> Self {
        Self {
            nodes: vec![QueryNode::new(entity_type)],
            sorts: Vec::new(),
            paging: None,
        }
    }

    pub fn of<E: Entity>() -> Self {
        Self::for_entity(E::TYPE)
    }

    pub fn root(&self) -> &QueryNode {
        &self.nodes[NodeId::ROOT.0]
    }

    pub fn root_mut(&mut self) -> &mut QueryNode {
        &mut self.nodes[NodeId::ROOT.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&QueryNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut QueryNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.root().entity_type()
    }

    pub fn set_entity_type(&mut self, entity_type: impl Into<String>) {
        self.root_mut().set_entity_type(entity_type);
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.root().condition()
    }

    pub fn sorts(&self) -> &[SortEntry] {
        &self.sorts
    }

    pub fn paging(&self) -> Option<PagingFilter> {
        self.paging
    }

    pub fn set_paging(&mut self, paging: Option<PagingFilter>) {
        self.paging = paging;
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.root_mut().combine(condition, QueryOperator::And);
        self
    }

    pub fn or(mut self, condition: Condition) -> Self {
        self.root_mut().combine(condition, QueryOperator::Or);
        self
    }

    pub fn equal(self, field: impl Into<String>, value: impl ToValue) -> Self {
        self.and(Condition::equal(field, value))
    }

    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.sorts.push(SortEntry {
            field: field.into(),
            descending: false,
        });
        self
    }

    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.sorts.push(SortEntry {
            field: field.into(),
            descending: true,
        });
        self
    }

    pub fn page(mut self, page: u64, page_size: u64) -> Self {
        self.paging = Some(PagingFilter::new(page, page_size));
        self
    }

    pub fn load<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_mut()
            .load_properties
            .extend(properties.into_iter().map(Into::into));
        self
    }

    /// 以子查询方式挂载另一个查询（其节点整体并入本图）
    pub fn subquery(mut self, name: impl Into<String>, sub: Query) -> Self {
        let node = self.graft(sub);
        self.root_mut().subqueries.push(Subquery {
            name: name.into(),
            node,
        });
        self
    }

    /// 以连接方式挂载另一个查询
    pub fn join(mut self, kind: JoinType, on: Vec<JoinField>, target: Query) -> Self {
        let node = self.graft(target);
        self.root_mut().joins.push(JoinItem { kind, on, node });
        self
    }

    /// 直接向图中加入节点，返回其下标
    pub fn add_node(&mut self, node: QueryNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// 在已有节点之间建立子查询边（可形成共享或环）
    pub fn link_subquery(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        child: NodeId,
    ) -> DomainResult<()> {
        self.ensure_node(child)?;
        let parent = self.nodes.get_mut(parent.0).ok_or_else(|| missing(parent))?;
        parent.subqueries.push(Subquery {
            name: name.into(),
            node: child,
        });
        Ok(())
    }

    /// 在已有节点之间建立连接边（可形成共享或环）
    pub fn link_join(
        &mut self,
        parent: NodeId,
        kind: JoinType,
        on: Vec<JoinField>,
        target: NodeId,
    ) -> DomainResult<()> {
        self.ensure_node(target)?;
        let parent = self.nodes.get_mut(parent.0).ok_or_else(|| missing(parent))?;
        parent.joins.push(JoinItem {
            kind,
            on,
            node: target,
        });
        Ok(())
    }

    /// 根节点条件是否被实体满足（无条件视为满足）
    pub fn is_satisfied_by<E: Entity>(&self, entity: &E) -> bool {
        self.condition()
            .is_none_or(|condition| condition.is_satisfied_by(entity))
    }

    /// 按排序项稳定排序，空值排在最前
    pub fn sort<E: Entity>(&self, items: &mut [E]) {
        if self.sorts.is_empty() {
            return;
        }
        items.sort_by(|a, b| {
            for entry in &self.sorts {
                let ordering = compare_field(a.field(&entry.field), b.field(&entry.field));
                let ordering = if entry.descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    fn ensure_node(&self, id: NodeId) -> DomainResult<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(missing(id))
        }
    }

    fn graft(&mut self, other: Query) -> NodeId {
        let offset = self.nodes.len();
        for mut node in other.nodes {
            node.shift(offset);
            self.nodes.push(node);
        }
        NodeId(offset)
    }
}

fn missing(id: NodeId) -> DomainError {
    DomainError::invalid_state(format!("query graph has no {id}"))
}

fn compare_field(a: Option<Value>, b: Option<Value>) -> Ordering {
    let a = a.unwrap_or(Value::Null);
    let b = b.unwrap_or(Value::Null);
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.compare(&b).unwrap_or(Ordering::Equal),
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_type().unwrap_or("*"))?;
        if let Some(condition) = self.condition() {
            write!(f, " where {condition}")?;
        }
        Ok(())
    }
}
