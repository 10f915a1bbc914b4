//! 字段值（Value）与数值聚合类型
//!
//! `Value` 是条件比较、字段读写与修改表达式的统一载体；
//! `Numeric` 将 max/min/sum/avg 的结果类型约束在封闭的数值集合内。
//!
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// 字段值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// 同类值比较；整数与浮点数可互相比较，其余跨类型比较返回 `None`
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn checked_add(&self, rhs: &Value) -> DomainResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| DomainError::invalid_value(format!("{a} + {b} overflows"))),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                Ok(Value::Float(self.float_operand()? + rhs.float_operand()?))
            }
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
            _ => Err(DomainError::invalid_value(format!(
                "cannot add {rhs} to {self}"
            ))),
        }
    }

    pub fn checked_sub(&self, rhs: &Value) -> DomainResult<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_sub(*b)
                .map(Value::Int)
                .ok_or_else(|| DomainError::invalid_value(format!("{a} - {b} overflows"))),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                Ok(Value::Float(self.float_operand()? - rhs.float_operand()?))
            }
            _ => Err(DomainError::invalid_value(format!(
                "cannot subtract {rhs} from {self}"
            ))),
        }
    }

    fn float_operand(&self) -> DomainResult<f64> {
        self.as_f64()
            .ok_or_else(|| DomainError::invalid_value(format!("{self} is not numeric")))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> DomainError {
    DomainError::TypeMismatch {
        expected: expected.to_string(),
        found: found.kind().to_string(),
    }
}

/// 转换为字段值
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// 从字段值还原
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> DomainResult<Self>;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> DomainResult<Self> {
        Ok(value.clone())
    }
}

macro_rules! integer_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(v) => Value::Int(v),
                        Err(_) => Value::Float(*self as f64),
                    }
                }
            }

            impl FromValue for $t {
                fn from_value(value: &Value) -> DomainResult<Self> {
                    let wide = match value {
                        Value::Int(v) => *v,
                        Value::Float(v) if v.fract() == 0.0 => *v as i64,
                        other => return Err(mismatch(stringify!($t), other)),
                    };
                    <$t>::try_from(wide).map_err(|e| {
                        DomainError::invalid_value(format!(
                            "{wide} out of range for {}: {e}",
                            stringify!($t)
                        ))
                    })
                }
            }
        )*
    };
}

integer_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

macro_rules! float_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Float(*self as f64)
                }
            }

            impl FromValue for $t {
                fn from_value(value: &Value) -> DomainResult<Self> {
                    value
                        .as_f64()
                        .map(|v| v as $t)
                        .ok_or_else(|| mismatch(stringify!($t), value))
                }
            }
        )*
    };
}

float_value!(f32, f64);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> DomainResult<Self> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> DomainResult<Self> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> DomainResult<Self> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            Value::Text(v) => DateTime::parse_from_rfc3339(v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| DomainError::invalid_value(e.to_string())),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl FromValue for Uuid {
    fn from_value(value: &Value) -> DomainResult<Self> {
        match value {
            Value::Text(v) => {
                Uuid::parse_str(v).map_err(|e| DomainError::invalid_value(e.to_string()))
            }
            other => Err(mismatch("uuid", other)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> DomainResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> DomainResult<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(mismatch("list", other)),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// 聚合计算允许的数值类型（封闭集合：i32/i64/u32/u64/f32/f64）
///
/// 整数类型的加减采用饱和运算；平均值统一以 `f64` 计算。
pub trait Numeric: sealed::Sealed + Copy + PartialOrd + Send + Sync + 'static {
    fn zero() -> Self;
    fn plus(self, rhs: Self) -> Self;
    fn minus(self, rhs: Self) -> Self;
    fn to_f64(self) -> f64;
    fn try_from_value(value: &Value) -> Option<Self>;
}

macro_rules! integer_numeric {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Numeric for $t {
                fn zero() -> Self {
                    0
                }
                fn plus(self, rhs: Self) -> Self {
                    self.saturating_add(rhs)
                }
                fn minus(self, rhs: Self) -> Self {
                    self.saturating_sub(rhs)
                }
                fn to_f64(self) -> f64 {
                    self as f64
                }
                fn try_from_value(value: &Value) -> Option<Self> {
                    <$t as FromValue>::from_value(value).ok()
                }
            }
        )*
    };
}

macro_rules! float_numeric {
    ($($t:ty),*) => {
        $(
            impl sealed::Sealed for $t {}

            impl Numeric for $t {
                fn zero() -> Self {
                    0.0
                }
                fn plus(self, rhs: Self) -> Self {
                    self + rhs
                }
                fn minus(self, rhs: Self) -> Self {
                    self - rhs
                }
                fn to_f64(self) -> f64 {
                    self as f64
                }
                fn try_from_value(value: &Value) -> Option<Self> {
                    <$t as FromValue>::from_value(value).ok()
                }
            }
        )*
    };
}

integer_numeric!(i32, i64, u32, u64);
float_numeric!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_kinds_compare_across_int_and_float() {
        assert_eq!(
            Value::Int(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert!(Value::Float(3.0).loosely_equals(&Value::Int(3)));
        assert_eq!(Value::Text("a".into()).compare(&Value::Int(1)), None);
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(
            Value::Int(40).checked_add(&Value::Int(2)).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            Value::Int(1).checked_sub(&Value::Float(0.5)).unwrap(),
            Value::Float(0.5)
        );
        assert!(Value::Int(i64::MAX).checked_add(&Value::Int(1)).is_err());
        assert!(Value::Bool(true).checked_add(&Value::Int(1)).is_err());
    }

    #[test]
    fn conversions_roundtrip_through_value() {
        assert_eq!(i32::from_value(&7i32.to_value()).unwrap(), 7);
        assert_eq!(
            Option::<String>::from_value(&Value::Null).unwrap(),
            None::<String>
        );
        assert_eq!(u8::from_value(&Value::Float(4.0)).unwrap(), 4);
        assert!(u8::from_value(&Value::Int(300)).is_err());
        assert!(bool::from_value(&Value::Int(1)).is_err());

        let id = Uuid::new_v4();
        assert_eq!(Uuid::from_value(&id.to_value()).unwrap(), id);
    }

    #[test]
    fn integer_numeric_saturates() {
        assert_eq!(3u32.minus(5), 0);
        assert_eq!(i64::MAX.plus(1), i64::MAX);
        assert_eq!(u64::try_from_value(&Value::Int(9)), Some(9));
        assert_eq!(f64::try_from_value(&Value::Int(9)), Some(9.0));
        assert_eq!(i32::try_from_value(&Value::Text("9".into())), None);
    }
}
