use crate::entity::Identity;
use crate::error::{DomainError, DomainResult};
use crate::query::{ModifyExpression, Query};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationRecordKind {
    Save,
    RemoveByIdentity,
    RemoveByCondition,
    ModifyByCondition,
    Package,
}

/// 尚未提交的变更记录
///
/// 非 `Package` 记录没有子节点；`Package` 只承载子节点，自身无载荷。
/// 提交时按深度优先顺序消费叶子记录。
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationRecord {
    Save {
        identity: Identity,
    },
    RemoveByIdentity {
        identity: Identity,
    },
    RemoveByCondition {
        entity_type: String,
        condition: Query,
    },
    ModifyByCondition {
        entity_type: String,
        modify: ModifyExpression,
        condition: Query,
    },
    Package {
        children: Vec<ActivationRecord>,
    },
}

impl ActivationRecord {
    pub fn save(identity: Identity) -> Self {
        ActivationRecord::Save { identity }
    }

    pub fn remove_by_identity(identity: Identity) -> Self {
        ActivationRecord::RemoveByIdentity { identity }
    }

    pub fn remove_by_condition(entity_type: impl Into<String>, condition: Query) -> Self {
        ActivationRecord::RemoveByCondition {
            entity_type: entity_type.into(),
            condition,
        }
    }

    pub fn modify(
        entity_type: impl Into<String>,
        modify: ModifyExpression,
        condition: Query,
    ) -> Self {
        ActivationRecord::ModifyByCondition {
            entity_type: entity_type.into(),
            modify,
            condition,
        }
    }

    pub fn package() -> Self {
        ActivationRecord::Package {
            children: Vec::new(),
        }
    }

    pub fn package_of(children: impl IntoIterator<Item = ActivationRecord>) -> Self {
        ActivationRecord::Package {
            children: children.into_iter().collect(),
        }
    }

    /// 仅 `Package` 可以添加子记录
    pub fn add_child(&mut self, child: ActivationRecord) -> DomainResult<()> {
        match self {
            ActivationRecord::Package { children } => {
                children.push(child);
                Ok(())
            }
            other => Err(DomainError::invalid_state(format!(
                "cannot add a child to non-package record `{}`",
                other.describe()
            ))),
        }
    }

    pub fn kind(&self) -> ActivationRecordKind {
        match self {
            ActivationRecord::Save { .. } => ActivationRecordKind::Save,
            ActivationRecord::RemoveByIdentity { .. } => ActivationRecordKind::RemoveByIdentity,
            ActivationRecord::RemoveByCondition { .. } => ActivationRecordKind::RemoveByCondition,
            ActivationRecord::ModifyByCondition { .. } => ActivationRecordKind::ModifyByCondition,
            ActivationRecord::Package { .. } => ActivationRecordKind::Package,
        }
    }

    /// 叶子记录的实体类型；`Package` 返回 `None`
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            ActivationRecord::Save { identity } | ActivationRecord::RemoveByIdentity { identity } => {
                Some(identity.entity_type())
            }
            ActivationRecord::RemoveByCondition { entity_type, .. }
            | ActivationRecord::ModifyByCondition { entity_type, .. } => Some(entity_type),
            ActivationRecord::Package { .. } => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            ActivationRecord::Save { identity } | ActivationRecord::RemoveByIdentity { identity } => {
                Some(identity)
            }
            _ => None,
        }
    }

    pub fn children(&self) -> &[ActivationRecord] {
        match self {
            ActivationRecord::Package { children } => children,
            _ => &[],
        }
    }

    pub fn is_empty_package(&self) -> bool {
        matches!(self, ActivationRecord::Package { children } if children.is_empty())
    }

    /// 深度优先展开叶子记录（子记录按登记顺序）
    pub fn leaves(&self) -> Vec<&ActivationRecord> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(record) = stack.pop() {
            match record {
                ActivationRecord::Package { children } => stack.extend(children.iter().rev()),
                leaf => out.push(leaf),
            }
        }
        out
    }

    /// 用于日志与提交错误的简短描述
    pub fn describe(&self) -> String {
        match self {
            ActivationRecord::Save { identity } => format!("save {identity}"),
            ActivationRecord::RemoveByIdentity { identity } => format!("remove {identity}"),
            ActivationRecord::RemoveByCondition {
                entity_type,
                condition,
            } => match condition.condition() {
                Some(c) => format!("remove {entity_type} where {c}"),
                None => format!("remove all {entity_type}"),
            },
            ActivationRecord::ModifyByCondition {
                entity_type,
                modify,
                condition,
            } => match condition.condition() {
                Some(c) => format!("modify {entity_type} set {modify} where {c}"),
                None => format!("modify all {entity_type} set {modify}"),
            },
            ActivationRecord::Package { children } => format!("package of {}", children.len()),
        }
    }
}

impl fmt::Display for ActivationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
