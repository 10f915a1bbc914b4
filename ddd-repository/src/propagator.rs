//! 全局条件传播
//!
//! 对查询图的每个节点（根、子查询、连接目标）恰好访问一次，
//! 按节点自身的实体类型向解析器请求全局条件并合并到节点上。
//! 以节点下标记录已访问集合，因此共享节点只过滤一次，连接环也能正常结束。
//!
use crate::filter::{
    GlobalConditionFilter, GlobalConditionFilterResolver, NoGlobalCondition, QuerySourceKind,
    QueryUsageScene,
};
use crate::query::{NodeId, Query};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct ConditionPropagator {
    resolver: Arc<dyn GlobalConditionFilterResolver>,
}

impl Default for ConditionPropagator {
    fn default() -> Self {
        Self::new(Arc::new(NoGlobalCondition))
    }
}

impl ConditionPropagator {
    pub fn new(resolver: Arc<dyn GlobalConditionFilterResolver>) -> Self {
        Self { resolver }
    }

    /// 传播全局条件
    ///
    /// `query` 为空时按 `entity_type` 合成一个空查询；根节点未设置实体类型时补齐。
    pub fn propagate(
        &self,
        query: Option<Query>,
        entity_type: &str,
        scene: QueryUsageScene,
    ) -> Query {
        let mut query = query.unwrap_or_else(|| Query::for_entity(entity_type));
        if query.entity_type().is_none() {
            query.set_entity_type(entity_type);
        }

        let mut visited = HashSet::new();
        let mut pending = vec![(NodeId::ROOT, QuerySourceKind::Root)];
        let mut filtered = 0usize;

        while let Some((id, source)) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = query.node_mut(id) else {
                continue;
            };

            if let Some(node_type) = node.entity_type() {
                let filter = GlobalConditionFilter {
                    entity_type: node_type,
                    usage_scene_entity_type: entity_type,
                    scene,
                    source,
                };
                if let Some(result) = self.resolver.resolve(&filter) {
                    result.append_to(node);
                    filtered += 1;
                }
            }

            // 逆序入栈以保持先序：子查询在前，连接在后
            let joins = node.joins().iter().map(|j| (j.node, QuerySourceKind::Join));
            let subs = node
                .subqueries()
                .iter()
                .map(|s| (s.node, QuerySourceKind::Subquery));
            let children: Vec<_> = subs.chain(joins).collect();
            pending.extend(children.into_iter().rev());
        }

        tracing::debug!(
            entity_type,
            %scene,
            visited = visited.len(),
            filtered,
            "global conditions propagated"
        );
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{GlobalConditionFilterResult, GlobalConditionRegistry};
    use crate::query::{Condition, JoinType, QueryNode};
    use std::sync::Mutex;

    fn tenant() -> Condition {
        Condition::equal("tenant", 1)
    }

    #[test]
    fn synthesizes_missing_query() {
        let mut registry = GlobalConditionRegistry::new();
        registry.register("order", GlobalConditionFilterResult::and(tenant()));
        let propagator = ConditionPropagator::new(Arc::new(registry));

        let query = propagator.propagate(None, "order", QueryUsageScene::Remove);
        assert_eq!(query.entity_type(), Some("order"));
        assert_eq!(query.condition(), Some(&tenant()));
    }

    #[test]
    fn visits_in_preorder_with_source_kinds() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let resolver = move |f: &GlobalConditionFilter<'_>| -> Option<GlobalConditionFilterResult> {
            log.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push((f.entity_type.to_string(), f.source));
            None
        };

        let query = Query::for_entity("order")
            .subquery("lines", Query::for_entity("line"))
            .join(JoinType::Left, vec![], Query::for_entity("customer"));
        ConditionPropagator::new(Arc::new(resolver)).propagate(
            Some(query),
            "order",
            QueryUsageScene::Query,
        );

        let seen = seen.lock().unwrap_or_else(|e| e.into_inner()).clone();
        assert_eq!(
            seen,
            vec![
                ("order".to_string(), QuerySourceKind::Root),
                ("line".to_string(), QuerySourceKind::Subquery),
                ("customer".to_string(), QuerySourceKind::Join),
            ]
        );
    }

    #[test]
    fn untyped_nodes_are_traversed_but_not_filtered() {
        let mut registry = GlobalConditionRegistry::new();
        registry.register("line", GlobalConditionFilterResult::and(tenant()));

        let mut query = Query::for_entity("order");
        let untyped = query.add_node(QueryNode::default());
        let line = query.add_node(QueryNode::new("line"));
        query
            .link_join(NodeId::ROOT, JoinType::Inner, vec![], untyped)
            .and_then(|_| query.link_subquery(untyped, "lines", line))
            .expect("link");

        let query = ConditionPropagator::new(Arc::new(registry)).propagate(
            Some(query),
            "order",
            QueryUsageScene::Count,
        );
        assert!(query.node(untyped).and_then(|n| n.condition()).is_none());
        assert_eq!(query.node(line).and_then(|n| n.condition()), Some(&tenant()));
    }
}
