use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::value::{ToValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModifyOperation {
    Set(Value),
    Add(Value),
    Subtract(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyEntry {
    pub field: String,
    pub operation: ModifyOperation,
}

/// 按条件批量修改时的字段变更表达式
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModifyExpression {
    entries: Vec<ModifyEntry>,
}

impl ModifyExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(self, field: impl Into<String>, value: impl ToValue) -> Self {
        self.push(field, ModifyOperation::Set(value.to_value()))
    }

    pub fn add(self, field: impl Into<String>, value: impl ToValue) -> Self {
        self.push(field, ModifyOperation::Add(value.to_value()))
    }

    pub fn subtract(self, field: impl Into<String>, value: impl ToValue) -> Self {
        self.push(field, ModifyOperation::Subtract(value.to_value()))
    }

    pub fn entries(&self) -> &[ModifyEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 在内存实体上生效；任一字段失败时实体保持原样
    pub fn apply_to<E: Entity>(&self, entity: &mut E) -> DomainResult<()> {
        let mut next = entity.clone();
        for entry in &self.entries {
            let value = match &entry.operation {
                ModifyOperation::Set(value) => value.clone(),
                ModifyOperation::Add(delta) => current(&next, &entry.field)?.checked_add(delta)?,
                ModifyOperation::Subtract(delta) => {
                    current(&next, &entry.field)?.checked_sub(delta)?
                }
            };
            next.set_field(&entry.field, value)?;
        }
        *entity = next;
        Ok(())
    }

    fn push(mut self, field: impl Into<String>, operation: ModifyOperation) -> Self {
        self.entries.push(ModifyEntry {
            field: field.into(),
            operation,
        });
        self
    }
}

fn current<E: Entity>(entity: &E, field: &str) -> DomainResult<Value> {
    entity.field(field).ok_or_else(|| DomainError::UnknownField {
        entity_type: E::TYPE,
        field: field.to_string(),
    })
}

impl fmt::Display for ModifyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let field = &entry.field;
            match &entry.operation {
                ModifyOperation::Set(v) => write!(f, "{field} = {v}")?,
                ModifyOperation::Add(v) => write!(f, "{field} = {field} + {v}")?,
                ModifyOperation::Subtract(v) => write!(f, "{field} = {field} - {v}")?,
            }
        }
        Ok(())
    }
}
