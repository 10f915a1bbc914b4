//! 实体（Entity）基础抽象
//!
//! 为仓储中的实体提供统一的标识（Identity）、字段读写与生命周期标记能力。
//! 通常由 `#[entity]` 宏生成实现。
//!
use crate::error::DomainResult;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// 具备唯一标识、可按字段名读写的实体抽象
pub trait Entity: Clone + Send + Sync + 'static {
    /// 实体类型名（全局条件、记录路由与事件中使用）
    const TYPE: &'static str;

    /// 实体标识类型，`Display` 形式需在同一类型内唯一
    type Id: Clone + Display + Send + Sync;

    /// 获取实体标识
    fn id(&self) -> &Self::Id;

    /// 按字段名读取值，未知字段返回 `None`
    fn field(&self, name: &str) -> Option<Value>;

    /// 按字段名写入值（修改表达式在内存中生效时使用）
    fn set_field(&mut self, name: &str, value: Value) -> DomainResult<()>;

    /// 是否允许保存
    fn can_be_save(&self) -> bool {
        true
    }

    /// 是否允许删除
    fn can_be_remove(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        Identity::new(Self::TYPE, self.id())
    }
}

/// 类型限定的实体标识，按值相等
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    entity_type: String,
    key: String,
}

impl Identity {
    pub fn new(entity_type: impl Into<String>, id: impl Display) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: id.to_string(),
        }
    }

    pub fn of<E: Entity>(id: &E::Id) -> Self {
        Self::new(E::TYPE, id)
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.key)
    }
}

/// 实体相对于后端存储的生命周期标记
///
/// 合法迁移：`New → Removed`、`Persistent → Update`、`Persistent → Removed`、
/// `Update → Removed`。`Removed` 需重新加载后才能再次保存。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataLifeSource {
    /// 本工作单元内新建，尚未写入存储
    New,
    /// 已确认存在于存储，未修改
    Persistent,
    /// 已确认存在于存储，存在待提交修改
    Update,
    /// 已确认存在于存储，待删除
    Removed,
}

impl Display for DataLifeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataLifeSource::New => "new",
            DataLifeSource::Persistent => "persistent",
            DataLifeSource::Update => "update",
            DataLifeSource::Removed => "removed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_equality_is_by_value() {
        let a = Identity::new("order", 7);
        let b = Identity::new("order", "7");
        let c = Identity::new("invoice", 7);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "order#7");
        assert_eq!(a.key(), "7");
    }
}
