//! 单元测试共用的手写实体
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::value::{FromValue, ToValue, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub customer: String,
    pub total: i64,
    pub status: String,
    pub note: Option<String>,
    pub discount: Option<i64>,
}

impl Order {
    pub fn new(id: i64, customer: &str, total: i64) -> Self {
        Self {
            id,
            customer: customer.to_string(),
            total,
            status: "new".to_string(),
            note: None,
            discount: None,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_discount(mut self, discount: i64) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }
}

impl Entity for Order {
    const TYPE: &'static str = "order";
    type Id = i64;

    fn id(&self) -> &i64 {
        &self.id
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(self.id.to_value()),
            "customer" => Some(self.customer.to_value()),
            "total" => Some(self.total.to_value()),
            "status" => Some(self.status.to_value()),
            "note" => Some(self.note.to_value()),
            "discount" => Some(self.discount.to_value()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> DomainResult<()> {
        match name {
            "id" => self.id = FromValue::from_value(&value)?,
            "customer" => self.customer = FromValue::from_value(&value)?,
            "total" => self.total = FromValue::from_value(&value)?,
            "status" => self.status = FromValue::from_value(&value)?,
            "note" => self.note = FromValue::from_value(&value)?,
            "discount" => self.discount = FromValue::from_value(&value)?,
            _ => {
                return Err(DomainError::UnknownField {
                    entity_type: Self::TYPE,
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
