//! 全局条件过滤（Global Condition Filter）
//!
//! 根据实体类型与使用场景，为查询图中的节点返回需要强制附加的条件，
//! 例如多租户隔离、软删除可见性等。
//!
use crate::query::{Condition, QueryNode, QueryOperator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 触发查询的使用场景
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryUsageScene {
    Query,
    Remove,
    Modify,
    Exist,
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl fmt::Display for QueryUsageScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryUsageScene::Query => "query",
            QueryUsageScene::Remove => "remove",
            QueryUsageScene::Modify => "modify",
            QueryUsageScene::Exist => "exist",
            QueryUsageScene::Count => "count",
            QueryUsageScene::Max => "max",
            QueryUsageScene::Min => "min",
            QueryUsageScene::Sum => "sum",
            QueryUsageScene::Avg => "avg",
        };
        f.write_str(s)
    }
}

/// 节点在查询图中的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuerySourceKind {
    Root,
    Subquery,
    Join,
}

/// 过滤请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConditionFilter<'a> {
    /// 当前节点的实体类型
    pub entity_type: &'a str,
    /// 发起操作的根实体类型
    pub usage_scene_entity_type: &'a str,
    pub scene: QueryUsageScene,
    pub source: QuerySourceKind,
}

/// 过滤结果：条件与合并方式
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalConditionFilterResult {
    pub condition: Condition,
    pub append_method: QueryOperator,
}

impl GlobalConditionFilterResult {
    pub fn and(condition: Condition) -> Self {
        Self {
            condition,
            append_method: QueryOperator::And,
        }
    }

    pub fn or(condition: Condition) -> Self {
        Self {
            condition,
            append_method: QueryOperator::Or,
        }
    }

    pub fn append_to(self, node: &mut QueryNode) {
        node.set_global_condition(self.condition, self.append_method);
    }
}

/// 全局条件解析器
pub trait GlobalConditionFilterResolver: Send + Sync {
    fn resolve(&self, filter: &GlobalConditionFilter<'_>) -> Option<GlobalConditionFilterResult>;
}

impl<F> GlobalConditionFilterResolver for F
where
    F: Fn(&GlobalConditionFilter<'_>) -> Option<GlobalConditionFilterResult> + Send + Sync,
{
    fn resolve(&self, filter: &GlobalConditionFilter<'_>) -> Option<GlobalConditionFilterResult> {
        self(filter)
    }
}

/// 不附加任何条件
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGlobalCondition;

impl GlobalConditionFilterResolver for NoGlobalCondition {
    fn resolve(&self, _filter: &GlobalConditionFilter<'_>) -> Option<GlobalConditionFilterResult> {
        None
    }
}

#[derive(Debug, Clone)]
struct Rule {
    scene: Option<QueryUsageScene>,
    source: Option<QuerySourceKind>,
    result: GlobalConditionFilterResult,
}

impl Rule {
    fn matches(&self, filter: &GlobalConditionFilter<'_>) -> bool {
        self.scene.is_none_or(|s| s == filter.scene)
            && self.source.is_none_or(|s| s == filter.source)
    }
}

/// 按实体类型登记规则的解析器，同一类型内按登记顺序取第一条命中的规则
#[derive(Debug, Clone, Default)]
pub struct GlobalConditionRegistry {
    rules: HashMap<String, Vec<Rule>>,
}

impl GlobalConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 对所有场景与来源生效
    pub fn register(
        &mut self,
        entity_type: impl Into<String>,
        result: GlobalConditionFilterResult,
    ) -> &mut Self {
        self.push(entity_type.into(), None, None, result)
    }

    /// 仅对指定场景生效
    pub fn register_for_scene(
        &mut self,
        entity_type: impl Into<String>,
        scene: QueryUsageScene,
        result: GlobalConditionFilterResult,
    ) -> &mut Self {
        self.push(entity_type.into(), Some(scene), None, result)
    }

    /// 仅对指定来源的节点生效
    pub fn register_for_source(
        &mut self,
        entity_type: impl Into<String>,
        source: QuerySourceKind,
        result: GlobalConditionFilterResult,
    ) -> &mut Self {
        self.push(entity_type.into(), None, Some(source), result)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn push(
        &mut self,
        entity_type: String,
        scene: Option<QueryUsageScene>,
        source: Option<QuerySourceKind>,
        result: GlobalConditionFilterResult,
    ) -> &mut Self {
        self.rules.entry(entity_type).or_default().push(Rule {
            scene,
            source,
            result,
        });
        self
    }
}

impl GlobalConditionFilterResolver for GlobalConditionRegistry {
    fn resolve(&self, filter: &GlobalConditionFilter<'_>) -> Option<GlobalConditionFilterResult> {
        self.rules
            .get(filter.entity_type)?
            .iter()
            .find(|rule| rule.matches(filter))
            .map(|rule| rule.result.clone())
    }
}
