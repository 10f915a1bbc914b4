use crate::entity::{Entity, Identity};
use crate::value::{ToValue, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    NotNull,
}

/// 条件组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryOperator {
    #[default]
    And,
    Or,
}

/// 条件树
///
/// `And(vec![])` 恒为真，`Or(vec![])` 恒为假。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        field: String,
        operator: CompareOperator,
        value: Value,
    },
    /// 按实体标识匹配
    Identity(Vec<Identity>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(field: impl Into<String>, operator: CompareOperator, value: impl ToValue) -> Self {
        Condition::Compare {
            field: field.into(),
            operator,
            value: value.to_value(),
        }
    }

    pub fn equal(field: impl Into<String>, value: impl ToValue) -> Self {
        Self::compare(field, CompareOperator::Equal, value)
    }

    pub fn not_equal(field: impl Into<String>, value: impl ToValue) -> Self {
        Self::compare(field, CompareOperator::NotEqual, value)
    }

    pub fn greater_than(field: impl Into<String>, value: impl ToValue) -> Self {
        Self::compare(field, CompareOperator::GreaterThan, value)
    }

    pub fn greater_or_equal(field: impl Into<String>, value: impl ToValue) -> Self {
        Self::compare(field, CompareOperator::GreaterOrEqual, value)
    }

    pub fn less_than(field: impl Into<String>, value: impl ToValue) -> Self {
        Self::compare(field, CompareOperator::LessThan, value)
    }

    pub fn less_or_equal(field: impl Into<String>, value: impl ToValue) -> Self {
        Self::compare(field, CompareOperator::LessOrEqual, value)
    }

    pub fn in_list<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToValue,
    {
        let values = values.into_iter().map(|v| v.to_value()).collect();
        Self::compare(field, CompareOperator::In, Value::List(values))
    }

    pub fn contains(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::compare(field, CompareOperator::Contains, Value::Text(text.into()))
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::compare(field, CompareOperator::IsNull, Value::Null)
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Self::compare(field, CompareOperator::NotNull, Value::Null)
    }

    pub fn identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        Condition::Identity(identities.into_iter().collect())
    }

    pub fn always() -> Self {
        Condition::And(Vec::new())
    }

    pub fn negate(self) -> Self {
        match self {
            Condition::Not(inner) => *inner,
            other => Condition::Not(Box::new(other)),
        }
    }

    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut items) => {
                items.push(other);
                Condition::And(items)
            }
            this => Condition::And(vec![this, other]),
        }
    }

    pub fn or(self, other: Condition) -> Self {
        match self {
            Condition::Or(mut items) if !items.is_empty() => {
                items.push(other);
                Condition::Or(items)
            }
            this => Condition::Or(vec![this, other]),
        }
    }

    /// 按给定映射改写字段名（例如把聚合查询转换为关系实体上的条件），标识条件保持不变
    pub fn rename_fields<F: Fn(&str) -> String>(self, rename: &F) -> Self {
        match self {
            Condition::Compare {
                field,
                operator,
                value,
            } => Condition::Compare {
                field: rename(&field),
                operator,
                value,
            },
            Condition::Identity(identities) => Condition::Identity(identities),
            Condition::And(items) => {
                Condition::And(items.into_iter().map(|c| c.rename_fields(rename)).collect())
            }
            Condition::Or(items) => {
                Condition::Or(items.into_iter().map(|c| c.rename_fields(rename)).collect())
            }
            Condition::Not(inner) => Condition::Not(Box::new(inner.rename_fields(rename))),
        }
    }

    pub fn combine(self, other: Condition, operator: QueryOperator) -> Self {
        match operator {
            QueryOperator::And => self.and(other),
            QueryOperator::Or => self.or(other),
        }
    }

    /// 在内存中对实体求值
    pub fn is_satisfied_by<E: Entity>(&self, entity: &E) -> bool {
        match self {
            Condition::Compare {
                field,
                operator,
                value,
            } => match entity.field(field) {
                Some(actual) => compare(&actual, *operator, value),
                None => false,
            },
            Condition::Identity(identities) => {
                let identity = entity.identity();
                identities.contains(&identity)
            }
            Condition::And(items) => items.iter().all(|c| c.is_satisfied_by(entity)),
            Condition::Or(items) => items.iter().any(|c| c.is_satisfied_by(entity)),
            Condition::Not(inner) => !inner.is_satisfied_by(entity),
        }
    }
}

fn compare(actual: &Value, operator: CompareOperator, expected: &Value) -> bool {
    match operator {
        CompareOperator::IsNull => actual.is_null(),
        CompareOperator::NotNull => !actual.is_null(),
        CompareOperator::Equal => actual.loosely_equals(expected),
        CompareOperator::NotEqual => !actual.is_null() && !actual.loosely_equals(expected),
        CompareOperator::GreaterThan => actual.compare(expected) == Some(Ordering::Greater),
        CompareOperator::GreaterOrEqual => matches!(
            actual.compare(expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOperator::LessThan => actual.compare(expected) == Some(Ordering::Less),
        CompareOperator::LessOrEqual => matches!(
            actual.compare(expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOperator::In => in_list(actual, expected),
        CompareOperator::NotIn => !actual.is_null() && !in_list(actual, expected),
        CompareOperator::Contains => text_pair(actual, expected).is_some_and(|(a, e)| a.contains(e)),
        CompareOperator::StartsWith => {
            text_pair(actual, expected).is_some_and(|(a, e)| a.starts_with(e))
        }
        CompareOperator::EndsWith => text_pair(actual, expected).is_some_and(|(a, e)| a.ends_with(e)),
    }
}

fn in_list(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::List(items) => items.iter().any(|item| actual.loosely_equals(item)),
        single => actual.loosely_equals(single),
    }
}

fn text_pair<'a>(actual: &'a Value, expected: &'a Value) -> Option<(&'a str, &'a str)> {
    match (actual, expected) {
        (Value::Text(a), Value::Text(e)) => Some((a.as_str(), e.as_str())),
        _ => None,
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare {
                field,
                operator,
                value,
            } => match operator {
                CompareOperator::IsNull => write!(f, "{field} IS NULL"),
                CompareOperator::NotNull => write!(f, "{field} IS NOT NULL"),
                op => write!(f, "{field} {} {value}", symbol(*op)),
            },
            Condition::Identity(ids) => {
                write!(f, "identity IN (")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}")?;
                }
                write!(f, ")")
            }
            Condition::And(items) if items.is_empty() => write!(f, "TRUE"),
            Condition::Or(items) if items.is_empty() => write!(f, "FALSE"),
            Condition::And(items) => join(f, items, " AND "),
            Condition::Or(items) => join(f, items, " OR "),
            Condition::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[Condition], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

fn symbol(op: CompareOperator) -> &'static str {
    match op {
        CompareOperator::Equal => "=",
        CompareOperator::NotEqual => "<>",
        CompareOperator::GreaterThan => ">",
        CompareOperator::GreaterOrEqual => ">=",
        CompareOperator::LessThan => "<",
        CompareOperator::LessOrEqual => "<=",
        CompareOperator::In => "IN",
        CompareOperator::NotIn => "NOT IN",
        CompareOperator::Contains => "LIKE",
        CompareOperator::StartsWith => "BEGIN LIKE",
        CompareOperator::EndsWith => "END LIKE",
        CompareOperator::IsNull | CompareOperator::NotNull => "IS",
    }
}
